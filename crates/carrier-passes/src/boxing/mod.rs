//! Boxing insertion pass.
//!
//! Inline value classes (and `Char`) are erased to their underlying
//! representation. Wherever such a value flows into a slot that expects the
//! uniform reference representation it must be boxed, and a uniform value
//! flowing into a specialized slot must be unboxed. This pass makes every
//! such conversion explicit as a call to the box/unbox intrinsic.
//!
//! ## Example
//!
//! Before:
//! ```text
//! fun show(d: Meters?): Unit {
//!   println(d)
//! }
//! ```
//!
//! After:
//! ```text
//! fun show(d: Meters?): Unit {
//!   println(block: Any? {
//!     let tmp_0: Meters? = d
//!     when: Any? {
//!       identity_eq(tmp_0, null) -> null
//!       true -> box<Meters?, Any?>(tmp_0)
//!     }
//!   })
//! }
//! ```
//!
//! Each node's slots are typed by the node itself. A child subtree is
//! rewritten first and the rewritten child is then adapted to its slot, so
//! synthesized conversions are never visited again.
//!
//! The pass must run at most once per unit: running it on its own output
//! boxes already boxed values again.

mod actual;
mod decision;
mod slots;
mod synth;

pub use actual::{actual_type, passes_receiver_boxed};
pub use decision::{Decision, KeepReason, decide, is_dynamic_char_compat};
pub use slots::{
    dispatch_receiver_slot, extension_receiver_slot, value_argument_slot, vararg_element_slot,
};
pub use synth::Conversion;

use carrier_ir::{
    Access, Branch, Decl, ExprKind, ExprRef, FieldRef, FuncRef, FunctionKind, IrContext,
    OverrideCache, Symbol, TypeOperator, TypeRef, UnitRef, VarargElement,
    patch_declaration_parents, print_type,
};
use tracing::{debug, trace};

use crate::errors::{BoxingError, BoxingErrorKind, PassResult};
use crate::inline_class::InlineClassOracle;

/// Configuration for boxing insertion.
#[derive(Clone, Copy, Debug)]
pub struct BoxingConfig {
    /// Also guard conversions whose expected type is nullable while the
    /// actual type is not. Default: false.
    pub guard_nullable_expected: bool,
    /// Fail on a flow between two distinct inline carriers instead of
    /// leaving it alone. Default: false.
    pub strict_specialized_mismatch: bool,
    /// Let dynamic and character values flow into each other unconverted.
    /// Default: true.
    pub dynamic_char_compat: bool,
}

impl Default for BoxingConfig {
    fn default() -> Self {
        Self {
            guard_nullable_expected: false,
            strict_specialized_mismatch: false,
            dynamic_char_compat: true,
        }
    }
}

/// Result of running boxing insertion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoxingResult {
    /// Number of box conversions inserted.
    pub boxed: usize,
    /// Number of unbox conversions inserted.
    pub unboxed: usize,
    /// Number of conversions wrapped in a null guard.
    pub guarded: usize,
}

/// The conversion intrinsics.
#[derive(Clone, Copy, Debug)]
pub struct Intrinsics {
    pub box_fn: FuncRef,
    pub unbox_fn: FuncRef,
    /// Reference identity, used by null guards.
    pub identity_eq: FuncRef,
}

impl Intrinsics {
    /// Validate `box_fn` and `unbox_fn` as `fun <From, To> f(value): To`.
    pub fn new(ctx: &IrContext, box_fn: FuncRef, unbox_fn: FuncRef) -> PassResult<Self> {
        check_intrinsic_shape(ctx, box_fn)?;
        check_intrinsic_shape(ctx, unbox_fn)?;
        Ok(Self {
            box_fn,
            unbox_fn,
            identity_eq: ctx.builtins().identity_eq,
        })
    }
}

fn check_intrinsic_shape(ctx: &IrContext, func: FuncRef) -> PassResult<()> {
    let data = ctx.func(func);
    if data.type_params.len() != 2 {
        return Err(BoxingError::intrinsic_shape(
            data.name,
            "expected two type parameters",
        ));
    }
    if data.params.len() != 1 {
        return Err(BoxingError::intrinsic_shape(
            data.name,
            "expected one value parameter",
        ));
    }
    if data.dispatch_receiver.is_some() || data.extension_receiver.is_some() {
        return Err(BoxingError::intrinsic_shape(
            data.name,
            "receivers are not allowed",
        ));
    }
    Ok(())
}

/// Everything the pass consumes besides the tree itself.
pub struct BoxingEnv<'a> {
    pub intrinsics: Intrinsics,
    pub oracle: &'a dyn InlineClassOracle,
}

/// Insert box/unbox conversions into every declaration of `unit`.
pub fn insert_boxing(
    ctx: &mut IrContext,
    unit: UnitRef,
    env: &BoxingEnv<'_>,
) -> PassResult<BoxingResult> {
    insert_boxing_with_config(ctx, unit, env, BoxingConfig::default())
}

/// Insert box/unbox conversions with custom configuration.
///
/// Declaration parents of synthesized temporaries are patched once, after
/// the whole unit is rewritten.
pub fn insert_boxing_with_config(
    ctx: &mut IrContext,
    unit: UnitRef,
    env: &BoxingEnv<'_>,
    config: BoxingConfig,
) -> PassResult<BoxingResult> {
    let unit_name = ctx.unit(unit).name;
    let decls = ctx.unit(unit).decls.clone();

    let mut rewriter = Rewriter {
        ctx,
        env,
        config,
        overrides: OverrideCache::new(),
        result: BoxingResult::default(),
        next_temporary: 0,
    };
    for decl in decls {
        rewriter.declaration(decl)?;
    }
    let result = rewriter.result;

    let patched = patch_declaration_parents(ctx, unit);
    debug!(
        "boxing: unit {}: {} boxed, {} unboxed, {} guarded, {} parents patched",
        unit_name, result.boxed, result.unboxed, result.guarded, patched
    );
    Ok(result)
}

struct Rewriter<'a, 'env> {
    ctx: &'a mut IrContext,
    env: &'a BoxingEnv<'env>,
    config: BoxingConfig,
    overrides: OverrideCache,
    result: BoxingResult,
    next_temporary: usize,
}

impl Rewriter<'_, '_> {
    // ========================================================================
    // Declarations
    // ========================================================================

    fn declaration(&mut self, decl: Decl) -> PassResult<()> {
        match decl {
            Decl::Function(func) => self.function(func),
            Decl::Field(field) => self.field(field),
            Decl::Class(class) => {
                let data = self.ctx.class(class);
                let fields = data.fields.clone();
                let functions = data.functions.clone();
                let classes = data.classes.clone();
                for field in fields {
                    self.field(field)?;
                }
                for func in functions {
                    self.function(func)?;
                }
                for nested in classes {
                    self.declaration(Decl::Class(nested))?;
                }
                Ok(())
            }
        }
    }

    fn function(&mut self, func: FuncRef) -> PassResult<()> {
        let params = self.ctx.func(func).params.clone();
        for param in params {
            let var = self.ctx.var(param);
            if let Some(default) = var.default_value {
                let expected = var.ty;
                let default = self.slot(default, Some(expected))?;
                self.ctx.var_mut(param).default_value = Some(default);
            }
        }

        let Some(body) = self.ctx.func(func).body else {
            return Ok(());
        };
        // Expression bodies are the function's result; block bodies
        // return explicitly.
        let expected = match self.ctx.expr(body).kind {
            ExprKind::Block(_) => None,
            _ => Some(self.return_slot(func)),
        };
        let body = self.slot(body, expected)?;
        self.ctx.func_mut(func).body = Some(body);
        Ok(())
    }

    fn field(&mut self, field: FieldRef) -> PassResult<()> {
        let data = self.ctx.field(field);
        if let Some(init) = data.initializer {
            let expected = data.ty;
            let init = self.slot(init, Some(expected))?;
            self.ctx.field_mut(field).initializer = Some(init);
        }
        Ok(())
    }

    fn return_slot(&self, func: FuncRef) -> TypeRef {
        let data = self.ctx.func(func);
        match data.kind {
            FunctionKind::Constructor => self.ctx.builtins().unit,
            FunctionKind::Simple => data.return_type,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Rewrite the subtree of `expr`, then adapt it to a slot of type
    /// `expected` (no adaptation for `None`). Returns the slot's new value.
    fn slot(&mut self, expr: ExprRef, expected: Option<TypeRef>) -> PassResult<ExprRef> {
        self.expr(expr)?;
        match expected {
            Some(expected) => self.use_as(expr, expected),
            None => Ok(expr),
        }
    }

    /// Rewrite every child slot of `expr` in place.
    fn expr(&mut self, expr: ExprRef) -> PassResult<()> {
        let b = *self.ctx.builtins();
        let ty = self.ctx.expr_ty(expr);
        let kind = match self.ctx.expr(expr).kind.clone() {
            ExprKind::GetValue(_) | ExprKind::Const(_) | ExprKind::Null => return Ok(()),
            ExprKind::Call(access) => ExprKind::Call(self.access(access)?),
            ExprKind::ConstructorCall(access) => ExprKind::ConstructorCall(self.access(access)?),
            ExprKind::DelegatingConstructorCall(access) => {
                ExprKind::DelegatingConstructorCall(self.access(access)?)
            }
            ExprKind::GetField { field, receiver } => ExprKind::GetField {
                field,
                receiver: self.optional_slot(receiver)?,
            },
            ExprKind::SetField {
                field,
                receiver,
                value,
            } => {
                let receiver = self.optional_slot(receiver)?;
                let expected = self.ctx.field(field).ty;
                ExprKind::SetField {
                    field,
                    receiver,
                    value: self.slot(value, Some(expected))?,
                }
            }
            ExprKind::SetValue { var, value } => {
                let expected = self.ctx.var(var).ty;
                ExprKind::SetValue {
                    var,
                    value: self.slot(value, Some(expected))?,
                }
            }
            ExprKind::Let { var, init } => {
                let expected = self.ctx.var(var).ty;
                let init = match init {
                    Some(init) => Some(self.slot(init, Some(expected))?),
                    None => None,
                };
                ExprKind::Let { var, init }
            }
            ExprKind::Vararg {
                element_type,
                mut elements,
            } => {
                for element in elements.iter_mut() {
                    *element = match *element {
                        VarargElement::Element(value) => {
                            self.expr(value)?;
                            let actual = actual_type(self.ctx, &mut self.overrides, value)?;
                            let expected = vararg_element_slot(
                                self.ctx,
                                self.env.oracle,
                                ty,
                                element_type,
                                actual,
                            );
                            VarargElement::Element(self.use_as(value, expected)?)
                        }
                        VarargElement::Spread(value) => {
                            VarargElement::Spread(self.slot(value, Some(ty))?)
                        }
                    };
                }
                ExprKind::Vararg {
                    element_type,
                    elements,
                }
            }
            ExprKind::Block(statements) => {
                let last = statements.len().saturating_sub(1);
                let mut rewritten = Vec::with_capacity(statements.len());
                for (index, statement) in statements.into_iter().enumerate() {
                    let expected = (index == last).then_some(ty);
                    rewritten.push(self.slot(statement, expected)?);
                }
                ExprKind::Block(rewritten)
            }
            ExprKind::When(branches) => {
                let mut rewritten = Vec::with_capacity(branches.len());
                for branch in branches {
                    rewritten.push(Branch {
                        condition: self.slot(branch.condition, Some(b.boolean))?,
                        result: self.slot(branch.result, Some(ty))?,
                    });
                }
                ExprKind::When(rewritten)
            }
            ExprKind::While { condition, body } => ExprKind::While {
                condition: self.slot(condition, Some(b.boolean))?,
                body: self.slot(body, None)?,
            },
            ExprKind::Return { target, value } => {
                let expected = self.return_slot(target);
                ExprKind::Return {
                    target,
                    value: self.slot(value, Some(expected))?,
                }
            }
            ExprKind::TypeOp { op, operand, arg } => {
                let expected = match op {
                    TypeOperator::CoerceToUnit | TypeOperator::ReinterpretCast => None,
                    _ => Some(b.any_n),
                };
                ExprKind::TypeOp {
                    op,
                    operand,
                    arg: self.slot(arg, expected)?,
                }
            }
        };
        self.ctx.expr_mut(expr).kind = kind;
        Ok(())
    }

    /// Field receivers are rewritten but never adapted.
    fn optional_slot(&mut self, expr: Option<ExprRef>) -> PassResult<Option<ExprRef>> {
        match expr {
            Some(expr) => Ok(Some(self.slot(expr, None)?)),
            None => Ok(None),
        }
    }

    fn access(&mut self, mut access: Access) -> PassResult<Access> {
        let target = access.target;
        if let Some(receiver) = access.dispatch_receiver {
            self.expr(receiver)?;
            let expected = dispatch_receiver_slot(self.ctx, &mut self.overrides, target)?;
            access.dispatch_receiver = Some(self.use_as(receiver, expected)?);
        }
        if let Some(receiver) = access.extension_receiver {
            self.expr(receiver)?;
            let expected = extension_receiver_slot(self.ctx, &mut self.overrides, target)?;
            access.extension_receiver = Some(self.use_as(receiver, expected)?);
        }
        for (index, arg) in access.args.iter_mut().enumerate() {
            // Absent arguments take the callee's default value.
            let Some(value) = *arg else {
                continue;
            };
            self.expr(value)?;
            let expected = value_argument_slot(self.ctx, &mut self.overrides, target, index)?;
            *arg = Some(self.use_as(value, expected)?);
        }
        Ok(access)
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Adapt an already rewritten `expr` to a slot of type `expected`.
    fn use_as(&mut self, expr: ExprRef, expected: TypeRef) -> PassResult<ExprRef> {
        let actual = actual_type(self.ctx, &mut self.overrides, expr)?;
        let conversion = match decide(self.ctx, self.env.oracle, actual, expected, &self.config) {
            Decision::Box => Conversion::Box,
            Decision::Unbox => Conversion::Unbox,
            Decision::Keep(KeepReason::BothSpecialized {
                actual: from,
                expected: to,
            }) if self.config.strict_specialized_mismatch && from != to => {
                return Err(BoxingErrorKind::SpecializedMismatch {
                    actual: print_type(self.ctx, actual),
                    expected: print_type(self.ctx, expected),
                }
                .into());
            }
            Decision::Keep(reason) => {
                trace!("boxing: keep {} ({:?})", expr, reason);
                return Ok(expr);
            }
        };

        let guard = self.ctx.is_nullable(actual)
            || (self.config.guard_nullable_expected && self.ctx.is_nullable(expected));
        debug!(
            "boxing: {:?} {} from {} to {}{}",
            conversion,
            expr,
            print_type(self.ctx, actual),
            print_type(self.ctx, expected),
            if guard { " (guarded)" } else { "" }
        );

        let intrinsics = self.env.intrinsics;
        let converted = if guard {
            let temporary = self.fresh_temporary();
            self.result.guarded += 1;
            synth::guarded_conversion(
                self.ctx,
                &intrinsics,
                conversion,
                expr,
                actual,
                expected,
                temporary,
            )
        } else {
            synth::conversion_call(self.ctx, &intrinsics, conversion, expr, actual, expected)
        };
        match conversion {
            Conversion::Box => self.result.boxed += 1,
            Conversion::Unbox => self.result.unboxed += 1,
        }
        Ok(converted)
    }

    fn fresh_temporary(&mut self) -> Symbol {
        let name = format!("tmp_{}", self.next_temporary);
        self.next_temporary += 1;
        Symbol::from_dynamic(&name)
    }
}
