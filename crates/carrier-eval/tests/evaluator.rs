//! Evaluator behavior on hand-built trees.

use carrier_eval::{EvalErrorKind, Evaluator, Receivers, Value};
use carrier_ir::{
    Access, ClassBuilder, FunctionBuilder, IrContext, Location, TypeOperator, VarargElement,
};

fn test_ctx() -> (IrContext, Location) {
    let mut ctx = IrContext::new();
    let path = ctx.paths.intern("eval.kt");
    (ctx, Location::file(path))
}

fn int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected int, got {other}"),
    }
}

#[test]
fn defaults_conditionals_and_early_return() {
    let (mut ctx, loc) = test_ctx();
    let b = *ctx.builtins();

    // fun pick(flag: Boolean, fallback: Int = 7): Int {
    //   when { flag -> return 1 }
    //   return fallback
    // }
    let seven = ctx.const_int(loc, 7);
    let pick = FunctionBuilder::new(loc, "pick", b.int)
        .param("flag", b.boolean)
        .param_with_default("fallback", b.int, seven)
        .build(&mut ctx);
    let flag = ctx.param(pick, 0);
    let fallback = ctx.param(pick, 1);
    let cond = ctx.get_value(loc, flag);
    let one = ctx.const_int(loc, 1);
    let early = ctx.ret(loc, pick, one);
    let branch = ctx.when_expr(loc, b.unit, [(cond, early)]);
    let read = ctx.get_value(loc, fallback);
    let late = ctx.ret(loc, pick, read);
    let body = ctx.block(loc, b.unit, [branch, late]);
    ctx.set_body(pick, body);

    // fun caller(): Int = pick(false, _)
    let caller = FunctionBuilder::new(loc, "caller", b.int).build(&mut ctx);
    let no = ctx.const_bool(loc, false);
    let call = ctx.call(loc, Access::new(pick).arg(no).default_arg());
    ctx.set_body(caller, call);

    let mut eval = Evaluator::new(&ctx);
    let yes = vec![Value::Bool(true), Value::Int(5)];
    assert_eq!(int(&eval.call(pick, Receivers::default(), yes).unwrap()), 1);
    let no = vec![Value::Bool(false), Value::Int(5)];
    assert_eq!(int(&eval.call(pick, Receivers::default(), no).unwrap()), 5);
    assert_eq!(int(&eval.call(caller, Receivers::default(), vec![]).unwrap()), 7);
}

#[test]
fn constructors_initialize_fields() {
    let (mut ctx, loc) = test_ctx();
    let b = *ctx.builtins();

    // class Counter(start: Int) { val count: Int = 10; init { count = start } }
    let counter = ClassBuilder::new(loc, "Counter").build(&mut ctx);
    let counter_ty = ctx.class_type(counter, false);
    let ten = ctx.const_int(loc, 10);
    let count = ctx.add_field(loc, Some(counter), "count", b.int, Some(ten));
    let init = FunctionBuilder::constructor(&mut ctx, loc, counter)
        .param("start", b.int)
        .build(&mut ctx);
    let this = ctx.class(counter).this_receiver.unwrap();
    let start = ctx.param(init, 0);
    let receiver = ctx.get_value(loc, this);
    let value = ctx.get_value(loc, start);
    let store = ctx.set_field(loc, count, Some(receiver), value);
    let body = ctx.block(loc, b.unit, [store]);
    ctx.set_body(init, body);

    // fun read(): Int = new Counter(3).count
    let read = FunctionBuilder::new(loc, "read", b.int).build(&mut ctx);
    let three = ctx.const_int(loc, 3);
    let object = ctx.constructor_call(loc, Access::new(init).arg(three), counter_ty);
    let get = ctx.get_field(loc, count, Some(object));
    ctx.set_body(read, get);

    let mut eval = Evaluator::new(&ctx);
    assert_eq!(int(&eval.call(read, Receivers::default(), vec![]).unwrap()), 3);
}

#[test]
fn host_calls_are_recorded() {
    let (mut ctx, loc) = test_ctx();
    let b = *ctx.builtins();
    let produce = FunctionBuilder::new(loc, "produce", b.any_n).build(&mut ctx);

    // identity_eq(produce(), null)
    let call = ctx.call(loc, Access::new(produce));
    let null = ctx.null(loc, b.nothing_n);
    let check = ctx.call(loc, Access::new(b.identity_eq).arg(call).arg(null));

    let mut eval = Evaluator::new(&ctx);
    eval.register_host(produce, |_| Ok(Value::Null));
    assert!(matches!(eval.eval(check), Ok(Value::Bool(true))));
    assert_eq!(eval.calls_to(produce), 1);
    assert_eq!(eval.host_calls().len(), 1);
}

#[test]
fn conversions_fault_on_null() {
    let (mut ctx, loc) = test_ctx();
    let b = *ctx.builtins();
    let t = ctx.param_type("T", b.any_n, false);
    let box_fn = FunctionBuilder::new(loc, "box", t)
        .type_param("T")
        .type_param("R")
        .param("value", t)
        .build(&mut ctx);
    let unbox_fn = FunctionBuilder::new(loc, "unbox", t)
        .type_param("T")
        .type_param("R")
        .param("value", t)
        .build(&mut ctx);

    let c = ctx.const_char(loc, 'k');
    let boxed = ctx.call(loc, Access::new(box_fn).arg(c));
    let unboxed = ctx.call(loc, Access::new(unbox_fn).arg(boxed));
    let null = ctx.null(loc, b.nothing_n);
    let boxed_null = ctx.call(loc, Access::new(box_fn).arg(null));

    let mut eval = Evaluator::new(&ctx);
    eval.register_conversions(box_fn, unbox_fn);
    assert!(matches!(eval.eval(unboxed), Ok(Value::Char('k'))));
    let err = eval.eval(boxed_null).unwrap_err();
    assert!(matches!(err.kind(), EvalErrorKind::Host(_)));
}

#[test]
fn varargs_spread_and_type_operators() {
    let (mut ctx, loc) = test_ctx();
    let b = *ctx.builtins();
    let ints = ctx.array_type(b.int);

    let one = ctx.const_int(loc, 1);
    let two = ctx.const_int(loc, 2);
    let inner = ctx.vararg(
        loc,
        ints,
        b.int,
        [VarargElement::Element(one), VarargElement::Element(two)],
    );
    let three = ctx.const_int(loc, 3);
    let outer = ctx.vararg(
        loc,
        ints,
        b.int,
        [VarargElement::Spread(inner), VarargElement::Element(three)],
    );

    let mut eval = Evaluator::new(&ctx);
    assert_eq!(eval.eval(outer).unwrap().to_string(), "[1, 2, 3]");

    let arg = ctx.const_int(loc, 4);
    let check = ctx.type_op(loc, TypeOperator::InstanceOf, b.int, arg, b.boolean);
    let arg = ctx.const_int(loc, 4);
    let coerce = ctx.type_op(loc, TypeOperator::CoerceToUnit, b.unit, arg, b.unit);

    let mut eval = Evaluator::new(&ctx);
    let err = eval.eval(check).unwrap_err();
    assert!(matches!(err.kind(), EvalErrorKind::Unsupported(_)));
    assert!(matches!(eval.eval(coerce), Ok(Value::Unit)));
}
