//! Common fixtures for boxing pass tests.

use carrier_ir::{
    ClassBuilder, Decl, FuncRef, FunctionBuilder, IrContext, Location, TypeRef,
    UnitRef, print_function,
};
use carrier_passes::{
    BoxingConfig, BoxingEnv, BoxingResult, ErasedInlineClasses, Intrinsics, PassResult,
    insert_boxing_with_config,
};
use tracing_subscriber::EnvFilter;

/// Route pass logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A context with one compilation unit, the conversion intrinsics and an
/// inline class `Meters(value: Int)`.
pub struct Fixture {
    pub ctx: IrContext,
    pub loc: Location,
    pub unit: UnitRef,
    pub box_fn: FuncRef,
    pub unbox_fn: FuncRef,
    pub meters_ty: TypeRef,
    pub meters_n: TypeRef,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("boxing.kt");
        let loc = Location::file(path);
        let b = *ctx.builtins();
        let unit = ctx.create_unit("boxing");

        let from = ctx.param_type("T", b.any_n, false);
        let to = ctx.param_type("R", b.any_n, false);
        let box_fn = FunctionBuilder::new(loc, "box", to)
            .type_param("T")
            .type_param("R")
            .param("value", from)
            .build(&mut ctx);
        let unbox_fn = FunctionBuilder::new(loc, "unbox", to)
            .type_param("T")
            .type_param("R")
            .param("value", from)
            .build(&mut ctx);

        let meters = ClassBuilder::new(loc, "Meters").inline(b.int).build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);
        let meters_n = ctx.class_type(meters, true);

        Self {
            ctx,
            loc,
            unit,
            box_fn,
            unbox_fn,
            meters_ty,
            meters_n,
        }
    }

    /// Build a top-level function and add it to the unit.
    pub fn function(&mut self, builder: FunctionBuilder) -> FuncRef {
        let func = builder.build(&mut self.ctx);
        self.ctx.add_decl(self.unit, Decl::Function(func));
        func
    }

    /// Build a body-less top-level function outside the unit.
    pub fn external(&mut self, builder: FunctionBuilder) -> FuncRef {
        builder.build(&mut self.ctx)
    }

    pub fn run(&mut self) -> PassResult<BoxingResult> {
        self.run_with(BoxingConfig::default())
    }

    pub fn run_with(&mut self, config: BoxingConfig) -> PassResult<BoxingResult> {
        let intrinsics = Intrinsics::new(&self.ctx, self.box_fn, self.unbox_fn)?;
        let env = BoxingEnv {
            intrinsics,
            oracle: &ErasedInlineClasses,
        };
        insert_boxing_with_config(&mut self.ctx, self.unit, &env, config)
    }

    pub fn print(&self, func: FuncRef) -> String {
        print_function(&self.ctx, func)
    }
}
