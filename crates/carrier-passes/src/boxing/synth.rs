//! Conversion synthesis.
//!
//! A conversion on a possibly-null value is wrapped in a guard:
//!
//! ```text
//! block: E {
//!   let tmp_0: A = <value>
//!   when: E {
//!     identity_eq(tmp_0, null) -> null
//!     true -> box<A, E>(tmp_0)
//!   }
//! }
//! ```
//!
//! The value is evaluated once and null never reaches the intrinsic.

use carrier_ir::{Access, ExprRef, FuncRef, IrContext, Symbol, TypeRef};

use super::Intrinsics;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    Box,
    Unbox,
}

impl Conversion {
    fn intrinsic(self, intrinsics: &Intrinsics) -> FuncRef {
        match self {
            Conversion::Box => intrinsics.box_fn,
            Conversion::Unbox => intrinsics.unbox_fn,
        }
    }
}

/// `<box|unbox><actual, expected>(value)`, typed `expected`.
pub(crate) fn conversion_call(
    ctx: &mut IrContext,
    intrinsics: &Intrinsics,
    conversion: Conversion,
    value: ExprRef,
    actual: TypeRef,
    expected: TypeRef,
) -> ExprRef {
    let location = ctx.expr(value).location;
    let access = Access::new(conversion.intrinsic(intrinsics))
        .type_arg(actual)
        .type_arg(expected)
        .arg(value);
    ctx.call_typed(location, access, expected)
}

/// Null-guarded conversion of `value` through a fresh temporary.
pub(crate) fn guarded_conversion(
    ctx: &mut IrContext,
    intrinsics: &Intrinsics,
    conversion: Conversion,
    value: ExprRef,
    actual: TypeRef,
    expected: TypeRef,
    temporary: Symbol,
) -> ExprRef {
    let location = ctx.expr(value).location;
    let b = *ctx.builtins();

    let tmp = ctx.temporary_var(location, temporary, actual);
    let declare = ctx.let_var(location, tmp, Some(value));

    let read = ctx.get_value(location, tmp);
    let null = ctx.null(location, b.nothing_n);
    let is_null = ctx.call(
        location,
        Access::new(intrinsics.identity_eq).arg(read).arg(null),
    );
    let null_result = ctx.null(location, expected);

    let read = ctx.get_value(location, tmp);
    let converted = conversion_call(ctx, intrinsics, conversion, read, actual, expected);
    let otherwise = ctx.const_bool(location, true);

    let choice = ctx.when_expr(
        location,
        expected,
        [(is_null, null_result), (otherwise, converted)],
    );
    ctx.block(location, expected, [declare, choice])
}
