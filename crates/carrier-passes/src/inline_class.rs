//! Boxing eligibility.
//!
//! An inline value class is erased to its underlying representation, so a
//! value of such a type has no uniform reference shape until it is boxed.
//! [`InlineClassOracle`] answers, per type, which inline class (if any) a
//! value of that type is carried as.

use carrier_ir::{ClassRef, IrContext, TypeRef};
use smallvec::SmallVec;

/// Classifies types by their runtime carrier.
pub trait InlineClassOracle {
    /// The inline class values of `ty` are carried as, or `None` when they
    /// already have the uniform reference representation.
    fn inlined_class(&self, ctx: &IrContext, ty: TypeRef) -> Option<ClassRef>;

    fn is_type_inlined(&self, ctx: &IrContext, ty: TypeRef) -> bool {
        self.inlined_class(ctx, ty).is_some()
    }
}

/// Classification by erasure and the inline flag of the erased class.
///
/// A nullable reference to an inline class stays boxed when any type along
/// its underlying chain is nullable: null would be ambiguous otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErasedInlineClasses;

impl InlineClassOracle for ErasedInlineClasses {
    fn inlined_class(&self, ctx: &IrContext, ty: TypeRef) -> Option<ClassRef> {
        let class = ctx.erase(ty)?;
        if !ctx.class(class).flags.is_inline {
            return None;
        }
        if ctx.types.get(ty).is_marked_nullable() && has_nullable_payload(ctx, class) {
            return None;
        }
        Some(class)
    }
}

fn has_nullable_payload(ctx: &IrContext, class: ClassRef) -> bool {
    let mut seen: SmallVec<[ClassRef; 4]> = SmallVec::new();
    let mut current = class;
    loop {
        seen.push(current);
        let Some(underlying) = ctx.class(current).underlying else {
            return false;
        };
        if ctx.types.get(underlying).is_marked_nullable() {
            return true;
        }
        match ctx.erase(underlying) {
            Some(next) if ctx.class(next).flags.is_inline && !seen.contains(&next) => {
                current = next;
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_ir::{ClassBuilder, Location};

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    #[test]
    fn plain_classes_are_uniform() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let point = ClassBuilder::new(loc, "Point").build(&mut ctx);
        let point_ty = ctx.class_type(point, false);
        let oracle = ErasedInlineClasses;

        for ty in [b.any, b.any_n, b.int, b.string, b.unit, b.nothing, b.dynamic, point_ty] {
            assert_eq!(oracle.inlined_class(&ctx, ty), None);
        }
    }

    #[test]
    fn inline_classes_and_char_are_inlined() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let meters = ClassBuilder::new(loc, "Meters").inline(b.int).build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);
        let meters_n = ctx.class_type(meters, true);
        let char_n = ctx.make_nullable(b.char);
        let oracle = ErasedInlineClasses;

        assert_eq!(oracle.inlined_class(&ctx, meters_ty), Some(meters));
        assert_eq!(oracle.inlined_class(&ctx, meters_n), Some(meters));
        assert_eq!(oracle.inlined_class(&ctx, b.char), Some(b.char_class));
        assert_eq!(oracle.inlined_class(&ctx, char_n), Some(b.char_class));
    }

    #[test]
    fn nullable_payload_keeps_nullable_reference_boxed() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let name = ClassBuilder::new(loc, "Name").inline(b.string).build(&mut ctx);
        let maybe = ctx.make_nullable(b.string);
        let label = ClassBuilder::new(loc, "Label").inline(maybe).build(&mut ctx);
        let label_ty = ctx.class_type(label, false);
        let tag = ClassBuilder::new(loc, "Tag").inline(label_ty).build(&mut ctx);
        let oracle = ErasedInlineClasses;

        let name_n = ctx.class_type(name, true);
        let label_plain = ctx.class_type(label, false);
        let label_n = ctx.class_type(label, true);
        let tag_n = ctx.class_type(tag, true);

        assert_eq!(oracle.inlined_class(&ctx, name_n), Some(name));
        assert_eq!(oracle.inlined_class(&ctx, label_plain), Some(label));
        assert_eq!(oracle.inlined_class(&ctx, label_n), None);
        // The nullable payload is found through the underlying chain.
        assert_eq!(oracle.inlined_class(&ctx, tag_n), None);
    }

    #[test]
    fn type_parameters_erase_to_their_bound() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let meters = ClassBuilder::new(loc, "Meters").inline(b.int).build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);
        let bounded = ctx.param_type("T", meters_ty, false);
        let unbounded = ctx.param_type("U", b.any_n, false);
        let oracle = ErasedInlineClasses;

        assert!(oracle.is_type_inlined(&ctx, bounded));
        assert!(!oracle.is_type_inlined(&ctx, unbounded));
    }
}
