//! Recursive traversal utilities.
//!
//! Walks are pre-order: a node is visited before its children, and children
//! are visited in evaluation order.

use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::context::{Decl, ExprKind, IrContext};
use crate::refs::{ClassRef, ExprRef, FieldRef, FuncRef, UnitRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into children.
    Advance,
    /// Skip the children of the current node.
    Skip,
}

/// Child expressions of `expr`, in evaluation order.
pub fn children(ctx: &IrContext, expr: ExprRef) -> SmallVec<[ExprRef; 4]> {
    let mut out = SmallVec::new();
    match &ctx.expr(expr).kind {
        ExprKind::Call(access)
        | ExprKind::ConstructorCall(access)
        | ExprKind::DelegatingConstructorCall(access) => {
            out.extend(access.dispatch_receiver);
            out.extend(access.extension_receiver);
            out.extend(access.args.iter().flatten().copied());
        }
        ExprKind::GetField { receiver, .. } => out.extend(*receiver),
        ExprKind::SetField {
            receiver, value, ..
        } => {
            out.extend(*receiver);
            out.push(*value);
        }
        ExprKind::SetValue { value, .. } => out.push(*value),
        ExprKind::Let { init, .. } => out.extend(*init),
        ExprKind::Vararg { elements, .. } => out.extend(elements.iter().map(|e| e.expr())),
        ExprKind::Block(statements) => out.extend(statements.iter().copied()),
        ExprKind::When(branches) => {
            for branch in branches {
                out.push(branch.condition);
                out.push(branch.result);
            }
        }
        ExprKind::While { condition, body } => {
            out.push(*condition);
            out.push(*body);
        }
        ExprKind::Return { value, .. } => out.push(*value),
        ExprKind::TypeOp { arg, .. } => out.push(*arg),
        ExprKind::GetValue(_) | ExprKind::Const(_) | ExprKind::Null => {}
    }
    out
}

/// Walk an expression and its children recursively.
pub fn walk_expr<B>(
    ctx: &IrContext,
    expr: ExprRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(expr) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for child in children(ctx, expr) {
        walk_expr(ctx, child, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk the parameter default values and the body of a function.
pub fn walk_function<B>(
    ctx: &IrContext,
    func: FuncRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    let data = ctx.func(func);
    for &param in &data.params {
        if let Some(default) = ctx.var(param).default_value {
            walk_expr(ctx, default, f)?;
        }
    }
    if let Some(body) = data.body {
        walk_expr(ctx, body, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk the initializer of a field.
pub fn walk_field<B>(
    ctx: &IrContext,
    field: FieldRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    if let Some(init) = ctx.field(field).initializer {
        walk_expr(ctx, init, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk every member of a class, nested classes included.
pub fn walk_class<B>(
    ctx: &IrContext,
    class: ClassRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    let data = ctx.class(class);
    for &field in &data.fields {
        walk_field(ctx, field, f)?;
    }
    for &func in &data.functions {
        walk_function(ctx, func, f)?;
    }
    for &nested in &data.classes {
        walk_class(ctx, nested, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk every expression of a compilation unit.
pub fn walk_unit<B>(
    ctx: &IrContext,
    unit: UnitRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &decl in &ctx.unit(unit).decls {
        match decl {
            Decl::Function(func) => walk_function(ctx, func, f)?,
            Decl::Class(class) => walk_class(ctx, class, f)?,
            Decl::Field(field) => walk_field(ctx, field, f)?,
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::context::Access;
    use crate::location::Location;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    /// `fun f(x: Int) { g(x, 1) }`
    fn sample(ctx: &mut IrContext, loc: Location) -> (FuncRef, ExprRef) {
        let b = *ctx.builtins();
        let g = FunctionBuilder::new(loc, "g", b.unit)
            .param("a", b.int)
            .param("b", b.int)
            .build(ctx);
        let f = FunctionBuilder::new(loc, "f", b.unit)
            .param("x", b.int)
            .build(ctx);
        let x = ctx.param(f, 0);
        let get_x = ctx.get_value(loc, x);
        let one = ctx.const_int(loc, 1);
        let call = ctx.call(loc, Access::new(g).arg(get_x).arg(one));
        let body = ctx.block(loc, b.unit, [call]);
        ctx.set_body(f, body);
        (f, call)
    }

    #[test]
    fn walk_visits_in_preorder() {
        let (mut ctx, loc) = test_ctx();
        let (f, call) = sample(&mut ctx, loc);

        let mut seen = Vec::new();
        let ControlFlow::Continue(()) = walk_function::<Infallible>(&ctx, f, &mut |expr| {
            seen.push(expr);
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1], call);
        assert_eq!(&seen[2..], children(&ctx, call).as_slice());
    }

    #[test]
    fn walk_skip_children() {
        let (mut ctx, loc) = test_ctx();
        let (f, call) = sample(&mut ctx, loc);

        let mut count = 0;
        let ControlFlow::Continue(()) = walk_function::<Infallible>(&ctx, f, &mut |expr| {
            count += 1;
            if expr == call {
                ControlFlow::Continue(WalkAction::Skip)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn walk_with_early_exit() {
        let (mut ctx, loc) = test_ctx();
        let (f, call) = sample(&mut ctx, loc);

        let found = walk_function(&ctx, f, &mut |expr| {
            if expr == call {
                ControlFlow::Break(expr)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert_eq!(found, ControlFlow::Break(call));
    }
}
