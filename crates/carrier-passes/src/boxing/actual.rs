//! Runtime type of an expression.
//!
//! The declared type of a call or receiver read can be narrower than what
//! actually arrives at runtime: override covariance narrows call results,
//! and receivers of virtual members of inline classes are passed boxed.

use carrier_ir::{
    DeclParent, ExprKind, ExprRef, FuncRef, IrContext, OverrideCache, TypeOperator, TypeRef,
    VarRef,
};

use crate::errors::PassResult;

/// The type `expr` produces at runtime.
pub fn actual_type(
    ctx: &IrContext,
    overrides: &mut OverrideCache,
    expr: ExprRef,
) -> PassResult<TypeRef> {
    let data = ctx.expr(expr);
    let ty = match &data.kind {
        ExprKind::ConstructorCall(access) => ctx.func(access.target).return_type,
        ExprKind::Call(access) => {
            let target = overrides.resolve(ctx, access.target)?;
            ctx.func(target).return_type
        }
        ExprKind::GetField { field, .. } => ctx.field(*field).ty,
        ExprKind::GetValue(var) if is_boxed_receiver(ctx, *var) => ctx.builtins().any,
        ExprKind::GetValue(var) => ctx.var(*var).ty,
        ExprKind::TypeOp {
            op: TypeOperator::ReinterpretCast,
            operand,
            ..
        } => *operand,
        _ => data.ty,
    };
    Ok(ty)
}

fn is_boxed_receiver(ctx: &IrContext, var: VarRef) -> bool {
    match ctx.var(var).parent {
        Some(DeclParent::Function(func)) => {
            ctx.func(func).dispatch_receiver == Some(var) && passes_receiver_boxed(ctx, func)
        }
        _ => false,
    }
}

/// Whether calls to `func` pass their dispatch receiver boxed: `func` is a
/// virtual member of an inline class.
pub fn passes_receiver_boxed(ctx: &IrContext, func: FuncRef) -> bool {
    let data = ctx.func(func);
    data.dispatch_receiver.is_some()
        && ctx.is_overridable_or_overrides(func)
        && data
            .owner
            .is_some_and(|owner| ctx.class(owner).flags.is_inline)
}
