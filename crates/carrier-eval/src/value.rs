//! Runtime values.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use carrier_ir::{ClassRef, FieldRef};

#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Null,
    Bool(bool),
    Int(i64),
    Char(char),
    Str(Rc<str>),
    /// Uniform reference to a specialized value.
    Boxed(Rc<Value>),
    Object(Rc<RefCell<Object>>),
    Array(Rc<RefCell<Vec<Value>>>),
}

#[derive(Debug)]
pub struct Object {
    pub class: ClassRef,
    pub fields: HashMap<FieldRef, Value>,
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::Str(Rc::from(text))
    }

    pub fn boxed(value: Value) -> Self {
        Value::Boxed(Rc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Reference identity. Primitives compare by value; boxes, objects and
    /// arrays by allocation.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Boxed(a), Value::Boxed(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Char(c) => write!(f, "'{}'", c),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Boxed(inner) => write!(f, "box({})", inner),
            Value::Object(object) => write!(f, "<object {}>", object.borrow().class),
            Value::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_compare_by_allocation() {
        let a = Value::boxed(Value::Int(3));
        let b = Value::boxed(Value::Int(3));
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert!(Value::Int(3).identical(&Value::Int(3)));
        assert!(Value::Null.identical(&Value::Null));
        assert!(!Value::Null.identical(&Value::Int(0)));
    }

    #[test]
    fn display() {
        let array = Value::Array(Rc::new(RefCell::new(vec![
            Value::boxed(Value::Char('x')),
            Value::Null,
            Value::string("hi"),
        ])));
        assert_eq!(array.to_string(), "[box('x'), null, \"hi\"]");
    }
}
