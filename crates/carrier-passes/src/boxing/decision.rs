//! Conversion policy for one value flow edge.

use carrier_ir::{ClassRef, IrContext, TypeRef};

use super::BoxingConfig;
use crate::inline_class::InlineClassOracle;

/// Why an edge is left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepReason {
    /// The producer never completes normally.
    NeverCompletes,
    /// The slot expects the bottom type.
    ExpectsNothing,
    /// One side is `Unit`.
    Unit,
    /// Dynamic and character values interoperate unboxed.
    DynamicCharCompat,
    /// Neither side has an inline carrier.
    BothUniform,
    /// Both sides have an inline carrier. Distinct carriers are a policy gap
    /// this pass does not adapt.
    BothSpecialized { actual: ClassRef, expected: ClassRef },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Keep(KeepReason),
    Box,
    Unbox,
}

/// Decide how a value of type `actual` must be adapted to a slot of type
/// `expected`. The first matching rule wins.
pub fn decide(
    ctx: &IrContext,
    oracle: &dyn InlineClassOracle,
    actual: TypeRef,
    expected: TypeRef,
    config: &BoxingConfig,
) -> Decision {
    if ctx.is_nothing(actual) || ctx.is_nullable_nothing(actual) {
        return Decision::Keep(KeepReason::NeverCompletes);
    }
    if ctx.is_nothing(expected) {
        return Decision::Keep(KeepReason::ExpectsNothing);
    }
    if ctx.is_unit(actual) || ctx.is_unit(expected) {
        return Decision::Keep(KeepReason::Unit);
    }
    if config.dynamic_char_compat && is_dynamic_char_compat(ctx, actual, expected) {
        return Decision::Keep(KeepReason::DynamicCharCompat);
    }

    match (
        oracle.inlined_class(ctx, actual),
        oracle.inlined_class(ctx, expected),
    ) {
        (None, None) => Decision::Keep(KeepReason::BothUniform),
        (Some(_), None) => Decision::Box,
        (None, Some(_)) => Decision::Unbox,
        (Some(actual), Some(expected)) => {
            Decision::Keep(KeepReason::BothSpecialized { actual, expected })
        }
    }
}

/// Dynamic values and (possibly nullable) characters pass between each
/// other without boxing, for interop with the sibling backend.
pub fn is_dynamic_char_compat(ctx: &IrContext, actual: TypeRef, expected: TypeRef) -> bool {
    let is_char_like = |ty: TypeRef| ctx.class_of(ty) == Some(ctx.builtins().char_class);
    (ctx.is_dynamic(actual) && is_char_like(expected))
        || (is_char_like(actual) && ctx.is_dynamic(expected))
}
