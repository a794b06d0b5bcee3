//! IrContext: arena storage for declarations, expressions and types.
//!
//! All IR entities are stored in `PrimaryMap`s owned by `IrContext` and are
//! addressed through the `Copy` refs in [`crate::refs`]. Expressions own
//! their children by ref; rewriting a slot means storing a different
//! `ExprRef` into the parent's `ExprKind`.

use cranelift_entity::PrimaryMap;
use smallvec::{SmallVec, smallvec};

use crate::location::{Location, PathInterner};
use crate::refs::*;
use crate::symbol::{self, Symbol};
use crate::types::{TypeData, TypeInterner};

// ============================================================================
// Declarations
// ============================================================================

/// Structural properties of a class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassFlags {
    /// Inline value class: erased to its underlying type unless boxed.
    pub is_inline: bool,
    pub is_final: bool,
    pub is_interface: bool,
    /// Specialized array of primitives (`IntArray`, `CharArray`, ...).
    pub is_primitive_array: bool,
}

pub struct ClassData {
    pub name: Symbol,
    pub location: Location,
    pub flags: ClassFlags,
    /// Underlying representation of an inline class.
    pub underlying: Option<TypeRef>,
    pub supertypes: SmallVec<[TypeRef; 2]>,
    /// The class's own `this` receiver. Its declaration parent is the class.
    pub this_receiver: Option<VarRef>,
    pub parent: Option<ClassRef>,
    pub functions: Vec<FuncRef>,
    pub fields: Vec<FieldRef>,
    pub classes: Vec<ClassRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Simple,
    Constructor,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Modality {
    #[default]
    Final,
    Open,
    Abstract,
}

pub struct FunctionData {
    pub name: Symbol,
    pub location: Location,
    pub kind: FunctionKind,
    pub owner: Option<ClassRef>,
    pub modality: Modality,
    /// Compiler-generated override that inherits its implementation.
    pub is_fake_override: bool,
    /// Declarations this function directly overrides.
    pub overridden: SmallVec<[FuncRef; 2]>,
    pub type_params: SmallVec<[Symbol; 2]>,
    pub dispatch_receiver: Option<VarRef>,
    pub extension_receiver: Option<VarRef>,
    pub params: SmallVec<[VarRef; 4]>,
    pub return_type: TypeRef,
    pub body: Option<ExprRef>,
}

pub struct FieldData {
    pub name: Symbol,
    pub location: Location,
    pub ty: TypeRef,
    pub owner: Option<ClassRef>,
    pub initializer: Option<ExprRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    DispatchReceiver,
    ExtensionReceiver,
    ValueParameter(u32),
    Local,
    /// Synthesized by a pass; scoped to the block that declares it.
    Temporary,
}

/// Declaration that owns a value declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclParent {
    Function(FuncRef),
    Class(ClassRef),
    Field(FieldRef),
}

pub struct VarData {
    pub name: Symbol,
    pub location: Location,
    pub ty: TypeRef,
    pub kind: VarKind,
    /// `None` until the variable is attached to a declaration.
    pub parent: Option<DeclParent>,
    pub default_value: Option<ExprRef>,
}

/// A top-level declaration of a compilation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decl {
    Function(FuncRef),
    Class(ClassRef),
    Field(FieldRef),
}

pub struct UnitData {
    pub name: Symbol,
    pub decls: Vec<Decl>,
}

// ============================================================================
// Expressions
// ============================================================================

/// Target and operands of a call-like expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Access {
    pub target: FuncRef,
    pub type_args: SmallVec<[TypeRef; 2]>,
    pub dispatch_receiver: Option<ExprRef>,
    pub extension_receiver: Option<ExprRef>,
    /// Positional arguments; `None` means the parameter's default is used.
    pub args: SmallVec<[Option<ExprRef>; 4]>,
}

impl Access {
    pub fn new(target: FuncRef) -> Self {
        Self {
            target,
            type_args: SmallVec::new(),
            dispatch_receiver: None,
            extension_receiver: None,
            args: SmallVec::new(),
        }
    }

    pub fn type_arg(mut self, ty: TypeRef) -> Self {
        self.type_args.push(ty);
        self
    }

    pub fn dispatch(mut self, receiver: ExprRef) -> Self {
        self.dispatch_receiver = Some(receiver);
        self
    }

    pub fn extension(mut self, receiver: ExprRef) -> Self {
        self.extension_receiver = Some(receiver);
        self
    }

    pub fn arg(mut self, arg: ExprRef) -> Self {
        self.args.push(Some(arg));
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = ExprRef>) -> Self {
        self.args.extend(args.into_iter().map(Some));
        self
    }

    /// Leave the next positional parameter to its default value.
    pub fn default_arg(mut self) -> Self {
        self.args.push(None);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarargElement {
    Element(ExprRef),
    Spread(ExprRef),
}

impl VarargElement {
    pub fn expr(&self) -> ExprRef {
        match self {
            VarargElement::Element(e) | VarargElement::Spread(e) => *e,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub condition: ExprRef,
    pub result: ExprRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeOperator {
    Cast,
    SafeCast,
    InstanceOf,
    NotInstanceOf,
    ImplicitCast,
    CoerceToUnit,
    ReinterpretCast,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Const {
    Int(i64),
    Bool(bool),
    Char(char),
    String(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Call(Access),
    ConstructorCall(Access),
    DelegatingConstructorCall(Access),
    GetField {
        field: FieldRef,
        receiver: Option<ExprRef>,
    },
    SetField {
        field: FieldRef,
        receiver: Option<ExprRef>,
        value: ExprRef,
    },
    GetValue(VarRef),
    SetValue {
        var: VarRef,
        value: ExprRef,
    },
    /// Local variable declaration.
    Let {
        var: VarRef,
        init: Option<ExprRef>,
    },
    Vararg {
        element_type: TypeRef,
        elements: SmallVec<[VarargElement; 4]>,
    },
    Block(Vec<ExprRef>),
    When(Vec<Branch>),
    While {
        condition: ExprRef,
        body: ExprRef,
    },
    Return {
        target: FuncRef,
        value: ExprRef,
    },
    TypeOp {
        op: TypeOperator,
        operand: TypeRef,
        arg: ExprRef,
    },
    Const(Const),
    Null,
}

pub struct ExprData {
    pub kind: ExprKind,
    /// Declared static type.
    pub ty: TypeRef,
    pub location: Location,
}

// ============================================================================
// Builtins
// ============================================================================

/// Classes, functions and types every context starts with.
#[derive(Clone, Copy, Debug)]
pub struct Builtins {
    pub any_class: ClassRef,
    pub boolean_class: ClassRef,
    pub char_class: ClassRef,
    pub int_class: ClassRef,
    pub string_class: ClassRef,
    pub array_class: ClassRef,
    pub boolean_array_class: ClassRef,
    pub char_array_class: ClassRef,
    pub int_array_class: ClassRef,
    /// `identity_eq(a: Any?, b: Any?): Boolean`, reference identity.
    pub identity_eq: FuncRef,
    pub any: TypeRef,
    pub any_n: TypeRef,
    pub nothing: TypeRef,
    pub nothing_n: TypeRef,
    pub unit: TypeRef,
    pub boolean: TypeRef,
    pub char: TypeRef,
    pub int: TypeRef,
    pub string: TypeRef,
    pub dynamic: TypeRef,
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based mutable IR context.
pub struct IrContext {
    classes: PrimaryMap<ClassRef, ClassData>,
    functions: PrimaryMap<FuncRef, FunctionData>,
    fields: PrimaryMap<FieldRef, FieldData>,
    vars: PrimaryMap<VarRef, VarData>,
    exprs: PrimaryMap<ExprRef, ExprData>,
    units: PrimaryMap<UnitRef, UnitData>,

    /// Type and path interners.
    pub types: TypeInterner,
    pub paths: PathInterner,

    builtins: Builtins,
}

impl IrContext {
    /// Create a context populated with the builtin classes and types.
    pub fn new() -> Self {
        let mut paths = PathInterner::new();
        let path = paths.intern("builtin:///");
        let loc = Location::file(path);
        let mut types = TypeInterner::new();
        let mut classes = PrimaryMap::new();

        let mut builtin_class = |types: &mut TypeInterner, name, flags, underlying| {
            let class = classes.push(ClassData {
                name: Symbol::new(name),
                location: loc,
                flags,
                underlying,
                supertypes: SmallVec::new(),
                this_receiver: None,
                parent: None,
                functions: Vec::new(),
                fields: Vec::new(),
                classes: Vec::new(),
            });
            let ty = types.intern(TypeData::Class {
                class,
                args: SmallVec::new(),
                nullable: false,
            });
            (class, ty)
        };

        let final_ = ClassFlags {
            is_final: true,
            ..ClassFlags::default()
        };
        let primitive_array = ClassFlags {
            is_final: true,
            is_primitive_array: true,
            ..ClassFlags::default()
        };

        let (any_class, any) = builtin_class(&mut types, "Any", ClassFlags::default(), None);
        let (boolean_class, boolean) = builtin_class(&mut types, "Boolean", final_, None);
        let (int_class, int) = builtin_class(&mut types, "Int", final_, None);
        // Char erases to its numeric code and is boxed for polymorphic use.
        let (char_class, char) = builtin_class(
            &mut types,
            "Char",
            ClassFlags {
                is_inline: true,
                is_final: true,
                ..ClassFlags::default()
            },
            Some(int),
        );
        let (string_class, string) = builtin_class(&mut types, "String", final_, None);
        let (array_class, _) = builtin_class(&mut types, "Array", final_, None);
        let (boolean_array_class, _) =
            builtin_class(&mut types, "BooleanArray", primitive_array, None);
        let (char_array_class, _) = builtin_class(&mut types, "CharArray", primitive_array, None);
        let (int_array_class, _) = builtin_class(&mut types, "IntArray", primitive_array, None);

        let any_n_data = types.get(any).with_nullability(true);
        let any_n = types.intern(any_n_data);
        let nothing = types.intern(TypeData::Nothing { nullable: false });
        let nothing_n = types.intern(TypeData::Nothing { nullable: true });
        let unit = types.intern(TypeData::Unit { nullable: false });
        let dynamic = types.intern(TypeData::Dynamic);

        let mut ctx = Self {
            classes,
            functions: PrimaryMap::new(),
            fields: PrimaryMap::new(),
            vars: PrimaryMap::new(),
            exprs: PrimaryMap::new(),
            units: PrimaryMap::new(),
            types,
            paths,
            builtins: Builtins {
                any_class,
                boolean_class,
                char_class,
                int_class,
                string_class,
                array_class,
                boolean_array_class,
                char_array_class,
                int_array_class,
                // Patched right below, once functions can be created.
                identity_eq: FuncRef::from_u32(0),
                any,
                any_n,
                nothing,
                nothing_n,
                unit,
                boolean,
                char,
                int,
                string,
                dynamic,
            },
        };

        for class in [
            any_class,
            boolean_class,
            int_class,
            char_class,
            string_class,
            array_class,
            boolean_array_class,
            char_array_class,
            int_array_class,
        ] {
            ctx.attach_this_receiver(class);
        }

        let identity_eq = crate::builder::FunctionBuilder::new(loc, symbol::IDENTITY_EQ(), boolean)
            .param("a", any_n)
            .param("b", any_n)
            .build(&mut ctx);
        ctx.builtins.identity_eq = identity_eq;
        ctx
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    // ========================================================================
    // Entity access
    // ========================================================================

    pub fn create_class(&mut self, data: ClassData) -> ClassRef {
        let parent = data.parent;
        let class = self.classes.push(data);
        if let Some(parent) = parent {
            self.classes[parent].classes.push(class);
        }
        class
    }

    pub fn class(&self, class: ClassRef) -> &ClassData {
        &self.classes[class]
    }

    pub fn class_mut(&mut self, class: ClassRef) -> &mut ClassData {
        &mut self.classes[class]
    }

    pub fn create_function(&mut self, data: FunctionData) -> FuncRef {
        let owner = data.owner;
        let func = self.functions.push(data);
        if let Some(owner) = owner {
            self.classes[owner].functions.push(func);
        }
        func
    }

    pub fn func(&self, func: FuncRef) -> &FunctionData {
        &self.functions[func]
    }

    pub fn func_mut(&mut self, func: FuncRef) -> &mut FunctionData {
        &mut self.functions[func]
    }

    pub fn create_field(&mut self, data: FieldData) -> FieldRef {
        let owner = data.owner;
        let field = self.fields.push(data);
        if let Some(owner) = owner {
            self.classes[owner].fields.push(field);
        }
        field
    }

    pub fn field(&self, field: FieldRef) -> &FieldData {
        &self.fields[field]
    }

    pub fn field_mut(&mut self, field: FieldRef) -> &mut FieldData {
        &mut self.fields[field]
    }

    pub fn create_var(&mut self, data: VarData) -> VarRef {
        self.vars.push(data)
    }

    pub fn var(&self, var: VarRef) -> &VarData {
        &self.vars[var]
    }

    pub fn var_mut(&mut self, var: VarRef) -> &mut VarData {
        &mut self.vars[var]
    }

    pub fn create_expr(&mut self, data: ExprData) -> ExprRef {
        self.exprs.push(data)
    }

    pub fn expr(&self, expr: ExprRef) -> &ExprData {
        &self.exprs[expr]
    }

    /// Mutable access to an expression.
    ///
    /// Slot rewrites go through here: store the replacement `ExprRef` into
    /// the parent's kind.
    pub fn expr_mut(&mut self, expr: ExprRef) -> &mut ExprData {
        &mut self.exprs[expr]
    }

    pub fn expr_ty(&self, expr: ExprRef) -> TypeRef {
        self.exprs[expr].ty
    }

    pub fn create_unit(&mut self, name: impl Into<Symbol>) -> UnitRef {
        self.units.push(UnitData {
            name: name.into(),
            decls: Vec::new(),
        })
    }

    pub fn unit(&self, unit: UnitRef) -> &UnitData {
        &self.units[unit]
    }

    pub fn add_decl(&mut self, unit: UnitRef, decl: Decl) {
        self.units[unit].decls.push(decl);
    }

    /// Create the `this` receiver of `class` if it does not have one yet.
    pub fn attach_this_receiver(&mut self, class: ClassRef) -> VarRef {
        if let Some(existing) = self.classes[class].this_receiver {
            return existing;
        }
        let ty = self.class_type(class, false);
        let location = self.classes[class].location;
        let receiver = self.vars.push(VarData {
            name: symbol::THIS(),
            location,
            ty,
            kind: VarKind::DispatchReceiver,
            parent: Some(DeclParent::Class(class)),
            default_value: None,
        });
        self.classes[class].this_receiver = Some(receiver);
        receiver
    }

    // ========================================================================
    // Type construction
    // ========================================================================

    pub fn class_type(&mut self, class: ClassRef, nullable: bool) -> TypeRef {
        self.types.intern(TypeData::Class {
            class,
            args: SmallVec::new(),
            nullable,
        })
    }

    /// `Array<element>`.
    pub fn array_type(&mut self, element: TypeRef) -> TypeRef {
        let array = self.builtins.array_class;
        self.types.intern(TypeData::Class {
            class: array,
            args: smallvec![element],
            nullable: false,
        })
    }

    pub fn param_type(&mut self, name: impl Into<Symbol>, bound: TypeRef, nullable: bool) -> TypeRef {
        self.types.intern(TypeData::Param {
            name: name.into(),
            bound,
            nullable,
        })
    }

    pub fn make_nullable(&mut self, ty: TypeRef) -> TypeRef {
        let data = self.types.get(ty).with_nullability(true);
        self.types.intern(data)
    }

    // ========================================================================
    // Type queries
    // ========================================================================

    /// Whether a value of this type may be null at runtime.
    ///
    /// Dynamic is nullable; a type parameter is nullable when marked or when
    /// its bound is.
    pub fn is_nullable(&self, ty: TypeRef) -> bool {
        match self.types.get(ty) {
            TypeData::Param {
                bound, nullable, ..
            } => *nullable || self.is_nullable(*bound),
            data => data.is_marked_nullable(),
        }
    }

    /// Non-null bottom type.
    pub fn is_nothing(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(ty), TypeData::Nothing { nullable: false })
    }

    pub fn is_nullable_nothing(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(ty), TypeData::Nothing { nullable: true })
    }

    /// Non-null unit type.
    pub fn is_unit(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(ty), TypeData::Unit { nullable: false })
    }

    pub fn is_dynamic(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(ty), TypeData::Dynamic)
    }

    /// Whether the type is one of the specialized primitive arrays.
    pub fn is_primitive_array(&self, ty: TypeRef) -> bool {
        self.class_of(ty)
            .is_some_and(|class| self.classes[class].flags.is_primitive_array)
    }

    /// The class a type refers to directly (type parameters excluded).
    pub fn class_of(&self, ty: TypeRef) -> Option<ClassRef> {
        match self.types.get(ty) {
            TypeData::Class { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// The class a type erases to; type parameters erase to their bound.
    pub fn erase(&self, ty: TypeRef) -> Option<ClassRef> {
        match self.types.get(ty) {
            TypeData::Class { class, .. } => Some(*class),
            TypeData::Param { bound, .. } => self.erase(*bound),
            _ => None,
        }
    }

    // ========================================================================
    // Declaration queries
    // ========================================================================

    /// Whether dispatch on `func` can reach another implementation.
    ///
    /// Overridable means not final and not declared in a final class;
    /// overriding means the function has overridden declarations.
    pub fn is_overridable_or_overrides(&self, func: FuncRef) -> bool {
        let data = &self.functions[func];
        if !data.overridden.is_empty() {
            return true;
        }
        if data.kind == FunctionKind::Constructor || data.modality == Modality::Final {
            return false;
        }
        data.owner
            .is_none_or(|owner| !self.classes[owner].flags.is_final)
    }

    /// Iterate over every function of the context, in creation order.
    pub fn functions(&self) -> impl Iterator<Item = FuncRef> + '_ {
        self.functions.keys()
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}
