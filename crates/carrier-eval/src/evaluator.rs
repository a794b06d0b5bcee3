//! Tree-walking evaluator.
//!
//! Calls are bound statically to their target. Functions without a body are
//! served by registered host handlers; every host call is recorded, so tests
//! can observe how often a side effect ran and which intrinsics were reached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use carrier_ir::{
    Access, ClassRef, Const, ExprKind, ExprRef, FieldRef, FuncRef, FunctionKind, IrContext,
    TypeOperator, VarRef, VarargElement,
};
use tracing::{debug, trace};

use crate::errors::{EvalError, EvalErrorKind, EvalResult};
use crate::value::{Object, Value};

/// Handler for a body-less function. Receives receivers first, then
/// arguments, in declaration order.
pub type HostFn = fn(&[Value]) -> EvalResult<Value>;

/// A recorded host call.
#[derive(Clone, Debug)]
pub struct HostCall {
    pub function: FuncRef,
    pub args: Vec<Value>,
}

/// Receiver values of a call.
#[derive(Clone, Debug, Default)]
pub struct Receivers {
    pub dispatch: Option<Value>,
    pub extension: Option<Value>,
}

/// Non-local exit from an expression.
enum Interrupt {
    Return { target: FuncRef, value: Value },
    Fault(EvalError),
}

impl From<EvalError> for Interrupt {
    fn from(error: EvalError) -> Self {
        Interrupt::Fault(error)
    }
}

type Step = Result<Value, Interrupt>;

#[derive(Default)]
struct Frame {
    locals: HashMap<VarRef, Value>,
    /// The object under construction, for delegating constructor calls.
    this: Option<Value>,
}

pub struct Evaluator<'ctx> {
    ctx: &'ctx IrContext,
    hosts: HashMap<FuncRef, HostFn>,
    globals: HashMap<FieldRef, Value>,
    trace: Vec<HostCall>,
    frame: Frame,
}

impl<'ctx> Evaluator<'ctx> {
    pub fn new(ctx: &'ctx IrContext) -> Self {
        Self {
            ctx,
            hosts: HashMap::new(),
            globals: HashMap::new(),
            trace: Vec::new(),
            frame: Frame::default(),
        }
    }

    pub fn register_host(&mut self, func: FuncRef, handler: HostFn) {
        self.hosts.insert(func, handler);
    }

    /// Install handlers for the box and unbox intrinsics. Both fault on null.
    pub fn register_conversions(&mut self, box_fn: FuncRef, unbox_fn: FuncRef) {
        self.register_host(box_fn, box_value);
        self.register_host(unbox_fn, unbox_value);
    }

    /// Host calls made so far, in order.
    pub fn host_calls(&self) -> &[HostCall] {
        &self.trace
    }

    /// Number of recorded calls to `func`.
    pub fn calls_to(&self, func: FuncRef) -> usize {
        self.trace.iter().filter(|c| c.function == func).count()
    }

    pub fn call(
        &mut self,
        func: FuncRef,
        receivers: Receivers,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        let args = args.into_iter().map(Some).collect();
        match self.invoke(func, receivers, args, None) {
            Ok(value) => Ok(value),
            Err(interrupt) => Err(self.escaped(interrupt)),
        }
    }

    /// Evaluate a free-standing expression in the top-level frame.
    pub fn eval(&mut self, expr: ExprRef) -> EvalResult<Value> {
        match self.expr(expr) {
            Ok(value) => Ok(value),
            Err(interrupt) => Err(self.escaped(interrupt)),
        }
    }

    fn escaped(&self, interrupt: Interrupt) -> EvalError {
        match interrupt {
            Interrupt::Fault(error) => error,
            Interrupt::Return { target, .. } => {
                EvalErrorKind::StrayReturn(self.ctx.func(target).name).into()
            }
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn invoke(
        &mut self,
        func: FuncRef,
        receivers: Receivers,
        args: Vec<Option<Value>>,
        this: Option<Value>,
    ) -> Step {
        let ctx = self.ctx;
        let data = ctx.func(func);

        if let Some(handler) = self.hosts.get(&func).copied() {
            let mut values: Vec<Value> = receivers
                .dispatch
                .into_iter()
                .chain(receivers.extension)
                .collect();
            values.extend(args.into_iter().map(|arg| arg.unwrap_or(Value::Unit)));
            debug!("eval: host call {} with {} values", data.name, values.len());
            self.trace.push(HostCall {
                function: func,
                args: values.clone(),
            });
            return handler(&values).map_err(Interrupt::from);
        }
        if func == ctx.builtins().identity_eq {
            let [Some(a), Some(b)] = args.as_slice() else {
                return Err(EvalError::type_mismatch("two arguments", args.len()).into());
            };
            return Ok(Value::Bool(a.identical(b)));
        }

        let mut frame = Frame::default();
        if let (Some(var), Some(value)) = (data.dispatch_receiver, receivers.dispatch) {
            frame.locals.insert(var, value);
        }
        if let (Some(var), Some(value)) = (data.extension_receiver, receivers.extension) {
            frame.locals.insert(var, value);
        }
        if data.kind == FunctionKind::Constructor {
            let class = data.owner.ok_or_else(|| EvalError::missing_body(data.name))?;
            let object = match this {
                Some(object) => object,
                None => Value::Object(Rc::new(RefCell::new(Object {
                    class,
                    fields: HashMap::new(),
                }))),
            };
            if let Some(receiver) = ctx.class(class).this_receiver {
                frame.locals.insert(receiver, object.clone());
            }
            frame.this = Some(object);
        }
        let caller = std::mem::replace(&mut self.frame, frame);
        let result = self.run(func, args);
        let frame = std::mem::replace(&mut self.frame, caller);

        let value = result?;
        match frame.this {
            Some(object) => Ok(object),
            None => Ok(value),
        }
    }

    /// Bind arguments in the current frame, then evaluate the body.
    fn run(&mut self, func: FuncRef, args: Vec<Option<Value>>) -> Step {
        let ctx = self.ctx;
        let data = ctx.func(func);
        for (index, &param) in data.params.iter().enumerate() {
            let value = match args.get(index).cloned().flatten() {
                Some(value) => value,
                None => match ctx.var(param).default_value {
                    Some(default) => self.expr(default)?,
                    None => return Err(EvalError::unbound_variable(ctx.var(param).name).into()),
                },
            };
            self.frame.locals.insert(param, value);
        }

        if data.kind == FunctionKind::Constructor {
            self.initialize_fields(data.owner)?;
        }
        let body = data.body.ok_or_else(|| EvalError::missing_body(data.name))?;
        match self.expr(body) {
            Err(Interrupt::Return { target, value }) if target == func => Ok(value),
            other => other,
        }
    }

    fn initialize_fields(&mut self, class: Option<ClassRef>) -> Result<(), Interrupt> {
        let Some(class) = class else {
            return Ok(());
        };
        let Some(Value::Object(object)) = self.frame.this.clone() else {
            return Ok(());
        };
        let ctx = self.ctx;
        for &field in &ctx.class(class).fields {
            if let Some(init) = ctx.field(field).initializer {
                let value = self.expr(init)?;
                object.borrow_mut().fields.insert(field, value);
            }
        }
        Ok(())
    }

    fn operands(&mut self, access: &Access) -> Result<(Receivers, Vec<Option<Value>>), Interrupt> {
        let dispatch = match access.dispatch_receiver {
            Some(receiver) => Some(self.expr(receiver)?),
            None => None,
        };
        let extension = match access.extension_receiver {
            Some(receiver) => Some(self.expr(receiver)?),
            None => None,
        };
        let mut args = Vec::with_capacity(access.args.len());
        for arg in &access.args {
            args.push(match arg {
                Some(arg) => Some(self.expr(*arg)?),
                None => None,
            });
        }
        Ok((
            Receivers {
                dispatch,
                extension,
            },
            args,
        ))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: ExprRef) -> Step {
        let ctx = self.ctx;
        trace!("eval: {}", expr);
        match &ctx.expr(expr).kind {
            ExprKind::Const(Const::Int(n)) => Ok(Value::Int(*n)),
            ExprKind::Const(Const::Bool(b)) => Ok(Value::Bool(*b)),
            ExprKind::Const(Const::Char(c)) => Ok(Value::Char(*c)),
            ExprKind::Const(Const::String(s)) => Ok(Value::string(s)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::GetValue(var) => self
                .frame
                .locals
                .get(var)
                .cloned()
                .ok_or_else(|| EvalError::unbound_variable(ctx.var(*var).name).into()),
            ExprKind::SetValue { var, value } | ExprKind::Let {
                var,
                init: Some(value),
            } => {
                let value = self.expr(*value)?;
                self.frame.locals.insert(*var, value);
                Ok(Value::Unit)
            }
            ExprKind::Let { init: None, .. } => Ok(Value::Unit),
            ExprKind::GetField { field, receiver } => match receiver {
                Some(receiver) => {
                    let object = self.object(*receiver)?;
                    let value = object.borrow().fields.get(field).cloned();
                    Ok(value.unwrap_or(Value::Null))
                }
                None => self.global(*field),
            },
            ExprKind::SetField {
                field,
                receiver,
                value,
            } => {
                let object = match receiver {
                    Some(receiver) => Some(self.object(*receiver)?),
                    None => None,
                };
                let value = self.expr(*value)?;
                match object {
                    Some(object) => {
                        object.borrow_mut().fields.insert(*field, value);
                    }
                    None => {
                        self.globals.insert(*field, value);
                    }
                }
                Ok(Value::Unit)
            }
            ExprKind::Call(access) => {
                let (receivers, args) = self.operands(access)?;
                self.invoke(access.target, receivers, args, None)
            }
            ExprKind::ConstructorCall(access) => {
                let (receivers, args) = self.operands(access)?;
                self.invoke(access.target, receivers, args, None)
            }
            ExprKind::DelegatingConstructorCall(access) => {
                let (receivers, args) = self.operands(access)?;
                let this = self.frame.this.clone();
                self.invoke(access.target, receivers, args, this)?;
                Ok(Value::Unit)
            }
            ExprKind::Vararg { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        VarargElement::Element(e) => values.push(self.expr(*e)?),
                        VarargElement::Spread(e) => match self.expr(*e)? {
                            Value::Array(array) => values.extend(array.borrow().iter().cloned()),
                            other => return Err(EvalError::type_mismatch("array", other).into()),
                        },
                    }
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
            ExprKind::Block(statements) => {
                let mut result = Value::Unit;
                for &statement in statements {
                    result = self.expr(statement)?;
                }
                Ok(result)
            }
            ExprKind::When(branches) => {
                for branch in branches {
                    if self.condition(branch.condition)? {
                        return self.expr(branch.result);
                    }
                }
                Ok(Value::Unit)
            }
            ExprKind::While { condition, body } => {
                while self.condition(*condition)? {
                    self.expr(*body)?;
                }
                Ok(Value::Unit)
            }
            ExprKind::Return { target, value } => {
                let value = self.expr(*value)?;
                Err(Interrupt::Return {
                    target: *target,
                    value,
                })
            }
            ExprKind::TypeOp { op, arg, .. } => match op {
                TypeOperator::InstanceOf | TypeOperator::NotInstanceOf => {
                    Err(EvalError::unsupported("instance checks").into())
                }
                TypeOperator::CoerceToUnit => {
                    self.expr(*arg)?;
                    Ok(Value::Unit)
                }
                TypeOperator::Cast
                | TypeOperator::SafeCast
                | TypeOperator::ImplicitCast
                | TypeOperator::ReinterpretCast => self.expr(*arg),
            },
        }
    }

    fn condition(&mut self, expr: ExprRef) -> Result<bool, Interrupt> {
        match self.expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_mismatch("boolean", other).into()),
        }
    }

    fn object(&mut self, expr: ExprRef) -> Result<Rc<RefCell<Object>>, Interrupt> {
        match self.expr(expr)? {
            Value::Object(object) => Ok(object),
            other => Err(EvalError::type_mismatch("object", other).into()),
        }
    }

    /// Receiver-less fields live in global storage, initialized on first read.
    fn global(&mut self, field: FieldRef) -> Step {
        if let Some(value) = self.globals.get(&field) {
            return Ok(value.clone());
        }
        let value = match self.ctx.field(field).initializer {
            Some(init) => self.expr(init)?,
            None => Value::Null,
        };
        self.globals.insert(field, value.clone());
        Ok(value)
    }
}

fn box_value(args: &[Value]) -> EvalResult<Value> {
    match args {
        [Value::Null] => Err(EvalError::host("box received null")),
        [value] => Ok(Value::boxed(value.clone())),
        _ => Err(EvalError::type_mismatch("one argument", args.len())),
    }
}

fn unbox_value(args: &[Value]) -> EvalResult<Value> {
    match args {
        [Value::Boxed(inner)] => Ok((**inner).clone()),
        [other] => Err(EvalError::type_mismatch("boxed value", other)),
        _ => Err(EvalError::type_mismatch("one argument", args.len())),
    }
}
