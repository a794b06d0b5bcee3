//! Declaration-parent fix-up.
//!
//! Passes that synthesize local declarations leave them unattached. This
//! fix-up runs once per unit afterwards and points every variable declared by
//! a `Let` at the function or field whose code declares it.

use std::convert::Infallible;
use std::ops::ControlFlow;

use crate::context::{Decl, DeclParent, ExprKind, IrContext};
use crate::refs::{ClassRef, ExprRef, UnitRef, VarRef};
use crate::walk::{WalkAction, walk_field, walk_function};

/// Attach every `Let`-declared variable of `unit` to its enclosing declaration.
///
/// Returns the number of variables whose parent changed.
pub fn patch_declaration_parents(ctx: &mut IrContext, unit: UnitRef) -> usize {
    let mut pending: Vec<(VarRef, DeclParent)> = Vec::new();
    for &decl in &ctx.unit(unit).decls {
        match decl {
            Decl::Function(func) => collect(ctx, DeclParent::Function(func), &mut pending),
            Decl::Field(field) => collect(ctx, DeclParent::Field(field), &mut pending),
            Decl::Class(class) => collect_class(ctx, class, &mut pending),
        }
    }

    let mut patched = 0;
    for (var, parent) in pending {
        let data = ctx.var_mut(var);
        if data.parent != Some(parent) {
            data.parent = Some(parent);
            patched += 1;
        }
    }
    patched
}

fn collect_class(ctx: &IrContext, class: ClassRef, out: &mut Vec<(VarRef, DeclParent)>) {
    let data = ctx.class(class);
    for &field in &data.fields {
        collect(ctx, DeclParent::Field(field), out);
    }
    for &func in &data.functions {
        collect(ctx, DeclParent::Function(func), out);
    }
    for &nested in &data.classes {
        collect_class(ctx, nested, out);
    }
}

fn collect(ctx: &IrContext, parent: DeclParent, out: &mut Vec<(VarRef, DeclParent)>) {
    let mut visit = |expr: ExprRef| -> ControlFlow<Infallible, WalkAction> {
        if let ExprKind::Let { var, .. } = ctx.expr(expr).kind {
            out.push((var, parent));
        }
        ControlFlow::Continue(WalkAction::Advance)
    };
    let ControlFlow::Continue(()) = match parent {
        DeclParent::Function(func) => walk_function(ctx, func, &mut visit),
        DeclParent::Field(field) => walk_field(ctx, field, &mut visit),
        DeclParent::Class(_) => ControlFlow::Continue(()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ClassBuilder, FunctionBuilder};
    use crate::location::Location;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    #[test]
    fn attaches_locals_of_functions_and_fields() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let unit = ctx.create_unit("main");

        let f = FunctionBuilder::new(loc, "f", b.unit).build(&mut ctx);
        let local = ctx.temporary_var(loc, "tmp_0", b.int);
        let one = ctx.const_int(loc, 1);
        let decl = ctx.let_var(loc, local, Some(one));
        let body = ctx.block(loc, b.unit, [decl]);
        ctx.set_body(f, body);
        ctx.add_decl(unit, Decl::Function(f));

        let holder = ClassBuilder::new(loc, "Holder").build(&mut ctx);
        let field_local = ctx.temporary_var(loc, "tmp_1", b.int);
        let two = ctx.const_int(loc, 2);
        let field_decl = ctx.let_var(loc, field_local, Some(two));
        let read = ctx.get_value(loc, field_local);
        let init = ctx.block(loc, b.int, [field_decl, read]);
        let field = ctx.add_field(loc, Some(holder), "value", b.int, Some(init));
        ctx.add_decl(unit, Decl::Class(holder));

        assert_eq!(patch_declaration_parents(&mut ctx, unit), 2);
        assert_eq!(ctx.var(local).parent, Some(DeclParent::Function(f)));
        assert_eq!(ctx.var(field_local).parent, Some(DeclParent::Field(field)));

        // Already attached: nothing left to do.
        assert_eq!(patch_declaration_parents(&mut ctx, unit), 0);
    }
}
