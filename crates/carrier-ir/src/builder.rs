//! Fluent builders for declarations and expression constructors.
//!
//! Declarations are built in two steps: the builder creates the declaration
//! and its parameter variables, then bodies and initializers (which usually
//! refer to those variables) are attached afterwards.

use smallvec::SmallVec;

use crate::context::*;
use crate::location::Location;
use crate::refs::*;
use crate::symbol::{self, Symbol};

// ============================================================================
// Classes
// ============================================================================

pub struct ClassBuilder {
    location: Location,
    name: Symbol,
    flags: ClassFlags,
    underlying: Option<TypeRef>,
    supertypes: SmallVec<[TypeRef; 2]>,
    parent: Option<ClassRef>,
}

impl ClassBuilder {
    pub fn new(location: Location, name: impl Into<Symbol>) -> Self {
        Self {
            location,
            name: name.into(),
            flags: ClassFlags::default(),
            underlying: None,
            supertypes: SmallVec::new(),
            parent: None,
        }
    }

    /// Inline value class erased to `underlying`. Inline classes are final.
    pub fn inline(mut self, underlying: TypeRef) -> Self {
        self.flags.is_inline = true;
        self.flags.is_final = true;
        self.underlying = Some(underlying);
        self
    }

    pub fn final_class(mut self) -> Self {
        self.flags.is_final = true;
        self
    }

    pub fn interface(mut self) -> Self {
        self.flags.is_interface = true;
        self
    }

    pub fn primitive_array(mut self) -> Self {
        self.flags.is_primitive_array = true;
        self.flags.is_final = true;
        self
    }

    pub fn supertype(mut self, ty: TypeRef) -> Self {
        self.supertypes.push(ty);
        self
    }

    pub fn nested_in(mut self, parent: ClassRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self, ctx: &mut IrContext) -> ClassRef {
        let class = ctx.create_class(ClassData {
            name: self.name,
            location: self.location,
            flags: self.flags,
            underlying: self.underlying,
            supertypes: self.supertypes,
            this_receiver: None,
            parent: self.parent,
            functions: Vec::new(),
            fields: Vec::new(),
            classes: Vec::new(),
        });
        ctx.attach_this_receiver(class);
        class
    }
}

// ============================================================================
// Functions
// ============================================================================

struct ParamSpec {
    name: Symbol,
    ty: TypeRef,
    default_value: Option<ExprRef>,
}

pub struct FunctionBuilder {
    location: Location,
    name: Symbol,
    kind: FunctionKind,
    owner: Option<ClassRef>,
    modality: Modality,
    is_fake_override: bool,
    overridden: SmallVec<[FuncRef; 2]>,
    type_params: SmallVec<[Symbol; 2]>,
    dispatch_receiver: Option<TypeRef>,
    extension_receiver: Option<TypeRef>,
    params: Vec<ParamSpec>,
    return_type: TypeRef,
}

impl FunctionBuilder {
    pub fn new(location: Location, name: impl Into<Symbol>, return_type: TypeRef) -> Self {
        Self {
            location,
            name: name.into(),
            kind: FunctionKind::Simple,
            owner: None,
            modality: Modality::Final,
            is_fake_override: false,
            overridden: SmallVec::new(),
            type_params: SmallVec::new(),
            dispatch_receiver: None,
            extension_receiver: None,
            params: Vec::new(),
            return_type,
        }
    }

    /// A constructor of `class`, returning the class type.
    pub fn constructor(ctx: &mut IrContext, location: Location, class: ClassRef) -> Self {
        let return_type = ctx.class_type(class, false);
        let mut builder = Self::new(location, symbol::INIT(), return_type);
        builder.kind = FunctionKind::Constructor;
        builder.owner = Some(class);
        builder
    }

    pub fn owner(mut self, class: ClassRef) -> Self {
        self.owner = Some(class);
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn overrides(mut self, func: FuncRef) -> Self {
        self.overridden.push(func);
        self
    }

    pub fn fake_override(mut self) -> Self {
        self.is_fake_override = true;
        self
    }

    pub fn type_param(mut self, name: impl Into<Symbol>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn dispatch_receiver(mut self, ty: TypeRef) -> Self {
        self.dispatch_receiver = Some(ty);
        self
    }

    pub fn extension_receiver(mut self, ty: TypeRef) -> Self {
        self.extension_receiver = Some(ty);
        self
    }

    pub fn param(mut self, name: impl Into<Symbol>, ty: TypeRef) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            ty,
            default_value: None,
        });
        self
    }

    pub fn param_with_default(
        mut self,
        name: impl Into<Symbol>,
        ty: TypeRef,
        default_value: ExprRef,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            ty,
            default_value: Some(default_value),
        });
        self
    }

    pub fn build(self, ctx: &mut IrContext) -> FuncRef {
        let func = ctx.create_function(FunctionData {
            name: self.name,
            location: self.location,
            kind: self.kind,
            owner: self.owner,
            modality: self.modality,
            is_fake_override: self.is_fake_override,
            overridden: self.overridden,
            type_params: self.type_params,
            dispatch_receiver: None,
            extension_receiver: None,
            params: SmallVec::new(),
            return_type: self.return_type,
            body: None,
        });
        let parent = Some(DeclParent::Function(func));
        let location = self.location;

        let dispatch_receiver = self.dispatch_receiver.map(|ty| {
            ctx.create_var(VarData {
                name: symbol::THIS(),
                location,
                ty,
                kind: VarKind::DispatchReceiver,
                parent,
                default_value: None,
            })
        });
        let extension_receiver = self.extension_receiver.map(|ty| {
            ctx.create_var(VarData {
                name: symbol::RECEIVER(),
                location,
                ty,
                kind: VarKind::ExtensionReceiver,
                parent,
                default_value: None,
            })
        });
        let params: SmallVec<[VarRef; 4]> = self
            .params
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                ctx.create_var(VarData {
                    name: spec.name,
                    location,
                    ty: spec.ty,
                    kind: VarKind::ValueParameter(index as u32),
                    parent,
                    default_value: spec.default_value,
                })
            })
            .collect();

        let data = ctx.func_mut(func);
        data.dispatch_receiver = dispatch_receiver;
        data.extension_receiver = extension_receiver;
        data.params = params;
        func
    }
}

impl IrContext {
    /// The `index`-th value parameter of `func`.
    ///
    /// # Panics
    ///
    /// Panics if `func` has fewer parameters.
    pub fn param(&self, func: FuncRef, index: usize) -> VarRef {
        self.func(func).params[index]
    }

    pub fn set_body(&mut self, func: FuncRef, body: ExprRef) {
        self.func_mut(func).body = Some(body);
    }

    pub fn add_field(
        &mut self,
        location: Location,
        owner: Option<ClassRef>,
        name: impl Into<Symbol>,
        ty: TypeRef,
        initializer: Option<ExprRef>,
    ) -> FieldRef {
        self.create_field(FieldData {
            name: name.into(),
            location,
            ty,
            owner,
            initializer,
        })
    }

    /// A local variable, unattached until declared by a `Let`.
    pub fn local_var(&mut self, location: Location, name: impl Into<Symbol>, ty: TypeRef) -> VarRef {
        self.create_var(VarData {
            name: name.into(),
            location,
            ty,
            kind: VarKind::Local,
            parent: None,
            default_value: None,
        })
    }

    /// A pass-synthesized temporary, unattached until parents are patched.
    pub fn temporary_var(
        &mut self,
        location: Location,
        name: impl Into<Symbol>,
        ty: TypeRef,
    ) -> VarRef {
        self.create_var(VarData {
            name: name.into(),
            location,
            ty,
            kind: VarKind::Temporary,
            parent: None,
            default_value: None,
        })
    }
}

// ============================================================================
// Expressions
// ============================================================================

impl IrContext {
    fn expr_of(&mut self, location: Location, kind: ExprKind, ty: TypeRef) -> ExprRef {
        self.create_expr(ExprData { kind, ty, location })
    }

    pub fn const_int(&mut self, location: Location, value: i64) -> ExprRef {
        let ty = self.builtins().int;
        self.expr_of(location, ExprKind::Const(Const::Int(value)), ty)
    }

    pub fn const_bool(&mut self, location: Location, value: bool) -> ExprRef {
        let ty = self.builtins().boolean;
        self.expr_of(location, ExprKind::Const(Const::Bool(value)), ty)
    }

    pub fn const_char(&mut self, location: Location, value: char) -> ExprRef {
        let ty = self.builtins().char;
        self.expr_of(location, ExprKind::Const(Const::Char(value)), ty)
    }

    pub fn const_string(&mut self, location: Location, value: impl Into<String>) -> ExprRef {
        let ty = self.builtins().string;
        self.expr_of(location, ExprKind::Const(Const::String(value.into())), ty)
    }

    pub fn null(&mut self, location: Location, ty: TypeRef) -> ExprRef {
        self.expr_of(location, ExprKind::Null, ty)
    }

    pub fn get_value(&mut self, location: Location, var: VarRef) -> ExprRef {
        let ty = self.var(var).ty;
        self.expr_of(location, ExprKind::GetValue(var), ty)
    }

    pub fn set_value(&mut self, location: Location, var: VarRef, value: ExprRef) -> ExprRef {
        let ty = self.builtins().unit;
        self.expr_of(location, ExprKind::SetValue { var, value }, ty)
    }

    pub fn let_var(&mut self, location: Location, var: VarRef, init: Option<ExprRef>) -> ExprRef {
        let ty = self.builtins().unit;
        self.expr_of(location, ExprKind::Let { var, init }, ty)
    }

    pub fn get_field(
        &mut self,
        location: Location,
        field: FieldRef,
        receiver: Option<ExprRef>,
    ) -> ExprRef {
        let ty = self.field(field).ty;
        self.expr_of(location, ExprKind::GetField { field, receiver }, ty)
    }

    pub fn set_field(
        &mut self,
        location: Location,
        field: FieldRef,
        receiver: Option<ExprRef>,
        value: ExprRef,
    ) -> ExprRef {
        let ty = self.builtins().unit;
        self.expr_of(
            location,
            ExprKind::SetField {
                field,
                receiver,
                value,
            },
            ty,
        )
    }

    /// Call typed by the target's declared return type.
    pub fn call(&mut self, location: Location, access: Access) -> ExprRef {
        let ty = self.func(access.target).return_type;
        self.call_typed(location, access, ty)
    }

    /// Call with an explicit result type (e.g. a substituted generic return).
    pub fn call_typed(&mut self, location: Location, access: Access, ty: TypeRef) -> ExprRef {
        self.expr_of(location, ExprKind::Call(access), ty)
    }

    pub fn constructor_call(&mut self, location: Location, access: Access, ty: TypeRef) -> ExprRef {
        self.expr_of(location, ExprKind::ConstructorCall(access), ty)
    }

    pub fn delegating_constructor_call(&mut self, location: Location, access: Access) -> ExprRef {
        let ty = self.builtins().unit;
        self.expr_of(location, ExprKind::DelegatingConstructorCall(access), ty)
    }

    pub fn vararg(
        &mut self,
        location: Location,
        ty: TypeRef,
        element_type: TypeRef,
        elements: impl IntoIterator<Item = VarargElement>,
    ) -> ExprRef {
        let kind = ExprKind::Vararg {
            element_type,
            elements: elements.into_iter().collect(),
        };
        self.expr_of(location, kind, ty)
    }

    pub fn block(
        &mut self,
        location: Location,
        ty: TypeRef,
        statements: impl IntoIterator<Item = ExprRef>,
    ) -> ExprRef {
        let statements = statements.into_iter().collect();
        self.expr_of(location, ExprKind::Block(statements), ty)
    }

    pub fn when_expr(
        &mut self,
        location: Location,
        ty: TypeRef,
        branches: impl IntoIterator<Item = (ExprRef, ExprRef)>,
    ) -> ExprRef {
        let branches = branches
            .into_iter()
            .map(|(condition, result)| Branch { condition, result })
            .collect();
        self.expr_of(location, ExprKind::When(branches), ty)
    }

    pub fn while_loop(&mut self, location: Location, condition: ExprRef, body: ExprRef) -> ExprRef {
        let ty = self.builtins().unit;
        self.expr_of(location, ExprKind::While { condition, body }, ty)
    }

    pub fn ret(&mut self, location: Location, target: FuncRef, value: ExprRef) -> ExprRef {
        let ty = self.builtins().nothing;
        self.expr_of(location, ExprKind::Return { target, value }, ty)
    }

    pub fn type_op(
        &mut self,
        location: Location,
        op: TypeOperator,
        operand: TypeRef,
        arg: ExprRef,
        ty: TypeRef,
    ) -> ExprRef {
        self.expr_of(location, ExprKind::TypeOp { op, operand, arg }, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    #[test]
    fn function_builder_creates_parameters() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let default = ctx.const_int(loc, 1);
        let class = ClassBuilder::new(loc, "Host").build(&mut ctx);
        let class_ty = ctx.class_type(class, false);
        let func = FunctionBuilder::new(loc, "f", b.unit)
            .owner(class)
            .dispatch_receiver(class_ty)
            .extension_receiver(b.string)
            .param("x", b.int)
            .param_with_default("y", b.int, default)
            .build(&mut ctx);

        let data = ctx.func(func);
        assert_eq!(data.params.len(), 2);
        let y = ctx.param(func, 1);
        assert_eq!(ctx.var(y).kind, VarKind::ValueParameter(1));
        assert_eq!(ctx.var(y).default_value, Some(default));
        assert_eq!(ctx.var(y).parent, Some(DeclParent::Function(func)));
        let ext = data.extension_receiver.unwrap();
        assert_eq!(ctx.var(ext).kind, VarKind::ExtensionReceiver);
        assert_eq!(ctx.class(class).functions, vec![func]);
    }

    #[test]
    fn inline_class_builder_sets_underlying() {
        let (mut ctx, loc) = test_ctx();
        let int = ctx.builtins().int;
        let class = ClassBuilder::new(loc, "Meters").inline(int).build(&mut ctx);
        let data = ctx.class(class);
        assert!(data.flags.is_inline && data.flags.is_final);
        assert_eq!(data.underlying, Some(int));
        assert!(data.this_receiver.is_some());
    }

    #[test]
    fn call_uses_declared_return_type() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let f = FunctionBuilder::new(loc, "f", b.string)
            .param("x", b.int)
            .build(&mut ctx);
        let arg = ctx.const_int(loc, 3);
        let call = ctx.call(loc, Access::new(f).arg(arg));
        assert_eq!(ctx.expr_ty(call), b.string);
        let ExprKind::Call(access) = &ctx.expr(call).kind else {
            panic!("expected a call");
        };
        assert_eq!(access.args.as_slice(), &[Some(arg)]);
    }
}
