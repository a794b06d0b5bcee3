//! Entity references.
//!
//! Each ref type is a thin `u32` wrapper providing type-safe indexing
//! into `PrimaryMap` storage in `IrContext`.

use cranelift_entity::entity_impl;

/// Reference to a class declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassRef(u32);
entity_impl!(ClassRef, "class");

/// Reference to a function or constructor declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncRef(u32);
entity_impl!(FuncRef, "fn");

/// Reference to a field declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef(u32);
entity_impl!(FieldRef, "field");

/// Reference to a value declaration: receiver, parameter, local or temporary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarRef(u32);
entity_impl!(VarRef, "var");

/// Reference to an expression node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprRef(u32);
entity_impl!(ExprRef, "expr");

/// Reference to an interned type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);
entity_impl!(TypeRef, "ty");

/// Reference to a compilation unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitRef(u32);
entity_impl!(UnitRef, "unit");

/// Reference to an interned source path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathRef(u32);
entity_impl!(PathRef, "path");
