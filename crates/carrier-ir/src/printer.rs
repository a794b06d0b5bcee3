//! Text format printer.
//!
//! Prints declarations and expressions in a compact, Kotlin-flavoured form:
//!
//! ```text
//! fun describe(x: Meters?): Any? {
//!   return@describe block: Any? {
//!     let tmp_0: Meters? = x
//!     when: Any? {
//!       identity_eq(tmp_0, null) -> null
//!       true -> box<Meters?, Any?>(tmp_0)
//!     }
//!   }
//! }
//! ```
//!
//! Output never carries trailing whitespace, so it can be snapshotted as is.

use std::fmt::{self, Write};

use crate::context::*;
use crate::refs::*;
use crate::types::TypeData;

// ============================================================================
// Public API
// ============================================================================

/// Print a type, e.g. `Array<Int>?`.
pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

/// Print a single expression (multi-line for blocks and conditionals).
pub fn print_expr(ctx: &IrContext, expr: ExprRef) -> String {
    let mut printer = Printer::new(ctx);
    printer.expr(expr).expect("fmt::Write to String never fails");
    printer.out
}

pub fn print_function(ctx: &IrContext, func: FuncRef) -> String {
    let mut printer = Printer::new(ctx);
    printer.function(func).expect("fmt::Write to String never fails");
    printer.out
}

pub fn print_class(ctx: &IrContext, class: ClassRef) -> String {
    let mut printer = Printer::new(ctx);
    printer.class(class).expect("fmt::Write to String never fails");
    printer.out
}

/// Print a compilation unit: a header line, then one declaration per line.
pub fn print_unit(ctx: &IrContext, unit: UnitRef) -> String {
    let mut printer = Printer::new(ctx);
    printer.unit(unit).expect("fmt::Write to String never fails");
    printer.out
}

// ============================================================================
// Type printing
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    match data {
        TypeData::Dynamic => return f.write_str("dynamic"),
        TypeData::Nothing { .. } => f.write_str("Nothing")?,
        TypeData::Unit { .. } => f.write_str("Unit")?,
        TypeData::Class { class, args, .. } => {
            write!(f, "{}", ctx.class(*class).name)?;
            if !args.is_empty() {
                f.write_char('<')?;
                for (i, &arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_type(ctx, f, arg)?;
                }
                f.write_char('>')?;
            }
        }
        TypeData::Param { name, .. } => write!(f, "{name}")?,
    }
    if data.is_marked_nullable() {
        f.write_char('?')?;
    }
    Ok(())
}

// ============================================================================
// Declarations and expressions
// ============================================================================

struct Printer<'a> {
    ctx: &'a IrContext,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            out: String::new(),
            indent: 0,
        }
    }

    fn line_break(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        for _ in 0..self.indent {
            self.out.write_str("  ")?;
        }
        Ok(())
    }

    fn ty(&mut self, ty: TypeRef) -> fmt::Result {
        write_type(self.ctx, &mut self.out, ty)
    }

    fn unit(&mut self, unit: UnitRef) -> fmt::Result {
        let data = self.ctx.unit(unit);
        write!(self.out, "unit {}", data.name)?;
        for &decl in &data.decls {
            self.line_break()?;
            match decl {
                Decl::Function(func) => self.function(func)?,
                Decl::Class(class) => self.class(class)?,
                Decl::Field(field) => self.field(field)?,
            }
        }
        Ok(())
    }

    fn class(&mut self, class: ClassRef) -> fmt::Result {
        let data = self.ctx.class(class);
        if data.flags.is_inline {
            self.out.write_str("inline ")?;
        }
        let keyword = if data.flags.is_interface {
            "interface"
        } else {
            "class"
        };
        write!(self.out, "{} {}", keyword, data.name)?;
        if let Some(underlying) = data.underlying {
            self.out.write_str("(value: ")?;
            self.ty(underlying)?;
            self.out.write_char(')')?;
        }
        for (i, &supertype) in data.supertypes.iter().enumerate() {
            self.out.write_str(if i == 0 { " : " } else { ", " })?;
            self.ty(supertype)?;
        }
        self.out.write_str(" {")?;
        self.indent += 1;
        for &field in &data.fields {
            self.line_break()?;
            self.field(field)?;
        }
        for &func in &data.functions {
            self.line_break()?;
            self.function(func)?;
        }
        for &nested in &data.classes {
            self.line_break()?;
            self.class(nested)?;
        }
        self.indent -= 1;
        self.line_break()?;
        self.out.write_char('}')
    }

    fn field(&mut self, field: FieldRef) -> fmt::Result {
        let data = self.ctx.field(field);
        write!(self.out, "val {}: ", data.name)?;
        self.ty(data.ty)?;
        if let Some(init) = data.initializer {
            self.out.write_str(" = ")?;
            self.expr(init)?;
        }
        Ok(())
    }

    fn function(&mut self, func: FuncRef) -> fmt::Result {
        let ctx = self.ctx;
        let data = ctx.func(func);
        write!(self.out, "fun {}", data.name)?;
        if !data.type_params.is_empty() {
            let names: Vec<String> = data.type_params.iter().map(|p| p.to_string()).collect();
            write!(self.out, "<{}>", names.join(", "))?;
        }
        self.out.write_char('(')?;
        let params = data
            .dispatch_receiver
            .iter()
            .chain(data.extension_receiver.iter())
            .chain(data.params.iter());
        for (i, &param) in params.enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            let var = ctx.var(param);
            write!(self.out, "{}: ", var.name)?;
            self.ty(var.ty)?;
            if let Some(default) = var.default_value {
                self.out.write_str(" = ")?;
                self.expr(default)?;
            }
        }
        self.out.write_str("): ")?;
        self.ty(data.return_type)?;
        if let Some(body) = data.body {
            self.out.write_char(' ')?;
            match &ctx.expr(body).kind {
                ExprKind::Block(statements) => self.statements(statements)?,
                _ => {
                    self.out.write_str("= ")?;
                    self.expr(body)?;
                }
            }
        }
        Ok(())
    }

    fn statements(&mut self, statements: &[ExprRef]) -> fmt::Result {
        self.out.write_char('{')?;
        self.indent += 1;
        for &statement in statements {
            self.line_break()?;
            self.expr(statement)?;
        }
        self.indent -= 1;
        self.line_break()?;
        self.out.write_char('}')
    }

    fn expr(&mut self, expr: ExprRef) -> fmt::Result {
        let ctx = self.ctx;
        let data = ctx.expr(expr);
        match &data.kind {
            ExprKind::Const(Const::Int(v)) => write!(self.out, "{v}"),
            ExprKind::Const(Const::Bool(v)) => write!(self.out, "{v}"),
            ExprKind::Const(Const::Char(v)) => write!(self.out, "'{v}'"),
            ExprKind::Const(Const::String(v)) => write!(self.out, "{v:?}"),
            ExprKind::Null => self.out.write_str("null"),
            ExprKind::GetValue(var) => write!(self.out, "{}", ctx.var(*var).name),
            ExprKind::SetValue { var, value } => {
                write!(self.out, "{} = ", ctx.var(*var).name)?;
                self.expr(*value)
            }
            ExprKind::Let { var, init } => {
                let var = ctx.var(*var);
                write!(self.out, "let {}: ", var.name)?;
                self.ty(var.ty)?;
                if let Some(init) = init {
                    self.out.write_str(" = ")?;
                    self.expr(*init)?;
                }
                Ok(())
            }
            ExprKind::GetField { field, receiver } => self.field_ref(*field, *receiver),
            ExprKind::SetField {
                field,
                receiver,
                value,
            } => {
                self.field_ref(*field, *receiver)?;
                self.out.write_str(" = ")?;
                self.expr(*value)
            }
            ExprKind::Call(access) => {
                let name = ctx.func(access.target).name.to_string();
                self.access(&name, access)
            }
            ExprKind::ConstructorCall(access) => {
                self.out.write_str("new ")?;
                self.access(&self.owner_name(access.target), access)
            }
            ExprKind::DelegatingConstructorCall(access) => {
                self.out.write_str("delegate ")?;
                self.access(&self.owner_name(access.target), access)
            }
            ExprKind::Vararg {
                element_type,
                elements,
            } => {
                self.out.write_str("vararg<")?;
                self.ty(*element_type)?;
                self.out.write_str(">[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    if let VarargElement::Spread(_) = element {
                        self.out.write_char('*')?;
                    }
                    self.expr(element.expr())?;
                }
                self.out.write_char(']')
            }
            ExprKind::Block(statements) => {
                self.out.write_str("block: ")?;
                self.ty(data.ty)?;
                self.out.write_char(' ')?;
                self.statements(statements)
            }
            ExprKind::When(branches) => {
                self.out.write_str("when: ")?;
                self.ty(data.ty)?;
                self.out.write_str(" {")?;
                self.indent += 1;
                for branch in branches {
                    self.line_break()?;
                    self.expr(branch.condition)?;
                    self.out.write_str(" -> ")?;
                    self.expr(branch.result)?;
                }
                self.indent -= 1;
                self.line_break()?;
                self.out.write_char('}')
            }
            ExprKind::While { condition, body } => {
                self.out.write_str("while (")?;
                self.expr(*condition)?;
                self.out.write_str(") ")?;
                self.expr(*body)
            }
            ExprKind::Return { target, value } => {
                write!(self.out, "return@{} ", ctx.func(*target).name)?;
                self.expr(*value)
            }
            ExprKind::TypeOp { op, operand, arg } => {
                let name = match op {
                    TypeOperator::Cast => "cast",
                    TypeOperator::SafeCast => "safe_cast",
                    TypeOperator::InstanceOf => "instance_of",
                    TypeOperator::NotInstanceOf => "not_instance_of",
                    TypeOperator::ImplicitCast => "implicit_cast",
                    TypeOperator::CoerceToUnit => "coerce_to_unit",
                    TypeOperator::ReinterpretCast => "reinterpret_cast",
                };
                write!(self.out, "{name}<")?;
                self.ty(*operand)?;
                self.out.write_str(">(")?;
                self.expr(*arg)?;
                self.out.write_char(')')
            }
        }
    }

    /// Constructors print as their class name.
    fn owner_name(&self, func: FuncRef) -> String {
        let data = self.ctx.func(func);
        match data.owner {
            Some(class) => self.ctx.class(class).name.to_string(),
            None => data.name.to_string(),
        }
    }

    fn field_ref(&mut self, field: FieldRef, receiver: Option<ExprRef>) -> fmt::Result {
        match receiver {
            Some(receiver) => {
                self.expr(receiver)?;
                self.out.write_char('.')?;
            }
            None => self.out.write_str("::")?,
        }
        write!(self.out, "{}", self.ctx.field(field).name)
    }

    fn access(&mut self, name: &str, access: &Access) -> fmt::Result {
        if let Some(receiver) = access.dispatch_receiver {
            self.expr(receiver)?;
            self.out.write_char('.')?;
        }
        self.out.write_str(name)?;
        if !access.type_args.is_empty() {
            self.out.write_char('<')?;
            for (i, &ty) in access.type_args.iter().enumerate() {
                if i > 0 {
                    self.out.write_str(", ")?;
                }
                self.ty(ty)?;
            }
            self.out.write_char('>')?;
        }
        self.out.write_char('(')?;
        let mut first = true;
        if let Some(receiver) = access.extension_receiver {
            self.out.write_str("receiver = ")?;
            self.expr(receiver)?;
            first = false;
        }
        for arg in &access.args {
            if !first {
                self.out.write_str(", ")?;
            }
            first = false;
            match arg {
                Some(arg) => self.expr(*arg)?,
                None => self.out.write_char('_')?,
            }
        }
        self.out.write_char(')')
    }
}
