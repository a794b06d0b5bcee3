//! Real override target resolution.
//!
//! The real override target of a function is the least-derived declaration
//! of its override chain. Its signature is the erased, pre-covariance one
//! that virtual dispatch actually honors.

use cranelift_entity::SecondaryMap;
use cranelift_entity::packed_option::PackedOption;
use derive_more::Display;

use crate::context::IrContext;
use crate::refs::FuncRef;
use crate::symbol::Symbol;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum OverrideError {
    #[display("override chain of `{function}` is cyclic")]
    Cycle { function: Symbol },
}

impl std::error::Error for OverrideError {}

/// Follow the first overridden declaration until one that overrides nothing.
pub fn real_override_target(ctx: &IrContext, func: FuncRef) -> Result<FuncRef, OverrideError> {
    let limit = ctx.functions().count();
    let mut current = func;
    let mut steps = 0usize;
    while let Some(&next) = ctx.func(current).overridden.first() {
        steps += 1;
        // A chain longer than the number of functions must revisit one.
        if steps > limit {
            return Err(OverrideError::Cycle {
                function: ctx.func(func).name,
            });
        }
        current = next;
    }
    Ok(current)
}

/// Per-function memo of [`real_override_target`].
#[derive(Default)]
pub struct OverrideCache {
    resolved: SecondaryMap<FuncRef, PackedOption<FuncRef>>,
}

impl OverrideCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, ctx: &IrContext, func: FuncRef) -> Result<FuncRef, OverrideError> {
        if let Some(target) = self.resolved[func].expand() {
            return Ok(target);
        }
        let target = real_override_target(ctx, func)?;
        self.resolved[func] = target.into();
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ClassBuilder, FunctionBuilder};
    use crate::context::Modality;
    use crate::location::Location;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    #[test]
    fn resolves_to_least_derived_declaration() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let base = ClassBuilder::new(loc, "Base").build(&mut ctx);
        let mid = ClassBuilder::new(loc, "Mid").build(&mut ctx);
        let leaf = ClassBuilder::new(loc, "Leaf").final_class().build(&mut ctx);

        let root = FunctionBuilder::new(loc, "get", b.any_n)
            .owner(base)
            .modality(Modality::Open)
            .build(&mut ctx);
        let middle = FunctionBuilder::new(loc, "get", b.any)
            .owner(mid)
            .modality(Modality::Open)
            .overrides(root)
            .build(&mut ctx);
        let last = FunctionBuilder::new(loc, "get", b.int)
            .owner(leaf)
            .overrides(middle)
            .fake_override()
            .build(&mut ctx);

        assert_eq!(real_override_target(&ctx, last), Ok(root));
        assert_eq!(real_override_target(&ctx, root), Ok(root));

        let mut cache = OverrideCache::new();
        assert_eq!(cache.resolve(&ctx, last), Ok(root));
        assert_eq!(cache.resolve(&ctx, last), Ok(root));
    }

    #[test]
    fn cyclic_chain_is_an_error() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let a = FunctionBuilder::new(loc, "a", b.unit).build(&mut ctx);
        let c = FunctionBuilder::new(loc, "c", b.unit).overrides(a).build(&mut ctx);
        ctx.func_mut(a).overridden.push(c);

        let err = real_override_target(&ctx, c).unwrap_err();
        assert_eq!(err.to_string(), "override chain of `c` is cyclic");
    }
}
