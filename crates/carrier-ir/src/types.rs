//! Type representation and interning.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::refs::{ClassRef, TypeRef};
use crate::symbol::Symbol;

/// Data for a single interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// Fully dynamic type. Always nullable.
    Dynamic,
    /// Bottom type: an expression of this type never produces a value.
    Nothing { nullable: bool },
    /// The unit type: no meaningful value.
    Unit { nullable: bool },
    /// Reference to a class, possibly applied to type arguments.
    Class {
        class: ClassRef,
        args: SmallVec<[TypeRef; 2]>,
        nullable: bool,
    },
    /// Type parameter with its upper bound.
    Param {
        name: Symbol,
        bound: TypeRef,
        nullable: bool,
    },
}

impl TypeData {
    /// Whether the type carries an explicit `?` marker.
    pub fn is_marked_nullable(&self) -> bool {
        match self {
            TypeData::Dynamic => true,
            TypeData::Nothing { nullable }
            | TypeData::Unit { nullable }
            | TypeData::Class { nullable, .. }
            | TypeData::Param { nullable, .. } => *nullable,
        }
    }

    /// Same type with the `?` marker set to `nullable`. Dynamic is unaffected.
    pub fn with_nullability(&self, nullable: bool) -> TypeData {
        let mut data = self.clone();
        match &mut data {
            TypeData::Dynamic => {}
            TypeData::Nothing { nullable: n }
            | TypeData::Unit { nullable: n }
            | TypeData::Class { nullable: n, .. }
            | TypeData::Param { nullable: n, .. } => *n = nullable,
        }
        data
    }
}

/// Type storage of a context. Structurally equal types share one `TypeRef`,
/// so type equality is ref equality.
#[derive(Default)]
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    refs: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&known) = self.refs.get(&data) {
            return known;
        }
        let r = self.types.push(data.clone());
        self.refs.insert(data, r);
        r
    }

    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn nullability_is_part_of_identity() {
        let mut interner = TypeInterner::new();
        let bottom = interner.intern(TypeData::Nothing { nullable: false });
        let null = interner.intern(TypeData::Nothing { nullable: true });
        assert_ne!(bottom, null);
        assert_eq!(interner.intern(TypeData::Nothing { nullable: true }), null);
    }

    #[test]
    fn class_types_distinguish_arguments() {
        let mut interner = TypeInterner::new();
        let class = ClassRef::new(0);
        let unit = interner.intern(TypeData::Unit { nullable: false });
        let bare = interner.intern(TypeData::Class {
            class,
            args: SmallVec::new(),
            nullable: false,
        });
        let applied = interner.intern(TypeData::Class {
            class,
            args: smallvec::smallvec![unit],
            nullable: false,
        });
        assert_ne!(bare, applied);
        assert!(!interner.get(applied).is_marked_nullable());
    }

    #[test]
    fn nullability_marker() {
        assert!(TypeData::Dynamic.is_marked_nullable());
        assert_eq!(TypeData::Dynamic.with_nullability(false), TypeData::Dynamic);
        let unit = TypeData::Unit { nullable: false };
        assert!(unit.with_nullability(true).is_marked_nullable());
    }
}
