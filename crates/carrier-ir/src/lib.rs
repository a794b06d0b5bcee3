//! Carrier IR crate.
//!
//! A small arena-based tree IR for a managed language with inline value
//! classes. Declarations and expressions live in an [`IrContext`] and are
//! addressed through `Copy` refs; passes rewrite trees in place by storing
//! replacement refs into parent slots.

pub mod builder;
pub mod context;
pub mod location;
pub mod overrides;
pub mod parents;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod types;
pub mod walk;

// Re-export smallvec for downstream crates building `Access` and vararg lists
pub use smallvec;

pub use builder::{ClassBuilder, FunctionBuilder};
pub use context::{
    Access, Branch, Builtins, ClassData, ClassFlags, Const, Decl, DeclParent, ExprData, ExprKind,
    FieldData, FunctionData, FunctionKind, IrContext, Modality, TypeOperator, UnitData,
    VarData, VarKind, VarargElement,
};
pub use location::{Location, PathInterner, Span};
pub use overrides::{OverrideCache, OverrideError, real_override_target};
pub use parents::patch_declaration_parents;
pub use printer::{print_class, print_expr, print_function, print_type, print_unit};
pub use refs::{ClassRef, ExprRef, FieldRef, FuncRef, PathRef, TypeRef, UnitRef, VarRef};
pub use symbol::Symbol;
pub use types::{TypeData, TypeInterner};
pub use walk::{WalkAction, children, walk_class, walk_expr, walk_field, walk_function, walk_unit};
