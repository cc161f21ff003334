//! Type system handles consumed by the rewrite pass.
//!
//! The resolver that runs before the rewrite owns the real type system. The
//! pass only needs a read-only view of it: class shapes, array component
//! types, primitive wrappers, and the identity of methods and constructors.
//! `TypeTable` is that view. Handles (`TypeId`, `MethodId`) are plain indices
//! and are cheap to copy and compare.

mod lookup;

pub use lookup::TypeChooser;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    fn wrapper_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Char => "Character",
            PrimitiveKind::Int => "Integer",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::Void => "Void",
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Boolean | PrimitiveKind::Char | PrimitiveKind::Void
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub is_enum: bool,
    pub is_interface: bool,
    /// Declared fields in declaration order
    pub fields: IndexMap<String, TypeId>,
    pub methods: Vec<MethodId>,
    /// Constructors written in source; resolver-synthesized ones are absent
    pub declared_constructors: Vec<MethodId>,
    /// Set on wrapper classes (`Integer` unboxes to `int`)
    pub unboxed: Option<PrimitiveKind>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Class(ClassInfo),
    Array { component: TypeId },
}

#[derive(Debug, Clone)]
pub struct TypeData {
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: TypeId,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: String,
    pub owner: TypeId,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeId,
    pub is_static: bool,
    pub kind: MethodKind,
}

/// Types the pass refers to by role rather than by name.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownTypes {
    pub object: TypeId,
    pub number: TypeId,
    pub integer: TypeId,
    pub string: TypeId,
    pub map: TypeId,
    pub linked_hash_map: TypeId,
    pub list: TypeId,
    pub closure: TypeId,
    pub class: TypeId,
    pub bytecode_adapter: TypeId,
    pub int: TypeId,
    pub boolean: TypeId,
    pub void: TypeId,
}

/// Read-only view over the resolver's type universe.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeData>,
    methods: Vec<MethodData>,
    arrays: FxHashMap<TypeId, TypeId>,
    primitives: FxHashMap<PrimitiveKind, TypeId>,
    wrappers: FxHashMap<PrimitiveKind, TypeId>,
    well_known: WellKnownTypes,
}

/// Names of the comparison routines exposed by the bytecode adapter type.
pub const COMPARISON_ADAPTER_METHODS: [&str; 7] = [
    "compareEqual",
    "compareNotEqual",
    "compareLessThan",
    "compareLessThanEqual",
    "compareGreaterThan",
    "compareGreaterThanEqual",
    "compareTo",
];

impl TypeTable {
    /// Create a table pre-populated with primitives, their wrappers and the
    /// library types the pass relies on.
    pub fn new() -> Self {
        let placeholder = TypeId(0);
        let mut table = Self {
            types: Vec::new(),
            methods: Vec::new(),
            arrays: FxHashMap::default(),
            primitives: FxHashMap::default(),
            wrappers: FxHashMap::default(),
            well_known: WellKnownTypes {
                object: placeholder,
                number: placeholder,
                integer: placeholder,
                string: placeholder,
                map: placeholder,
                linked_hash_map: placeholder,
                list: placeholder,
                closure: placeholder,
                class: placeholder,
                bytecode_adapter: placeholder,
                int: placeholder,
                boolean: placeholder,
                void: placeholder,
            },
        };

        for kind in PrimitiveKind::ALL {
            let id = table.push_type(kind.name(), TypeKind::Primitive(kind));
            table.primitives.insert(kind, id);
        }

        let object = table.push_type("Object", TypeKind::Class(ClassInfo::default()));
        let number = table.declare_class_extending("Number", object);
        for kind in PrimitiveKind::ALL {
            let parent = if kind.is_numeric() { number } else { object };
            let wrapper = table.declare_class_extending(kind.wrapper_name(), parent);
            if let Some(info) = table.class_info_mut(wrapper) {
                info.unboxed = Some(kind);
            }
            table.wrappers.insert(kind, wrapper);
        }

        let string = table.declare_class_extending("String", object);
        let map = table.declare_interface("Map");
        let linked_hash_map = table.declare_class_extending("LinkedHashMap", object);
        table.add_interface(linked_hash_map, map);
        let list = table.declare_interface("List");
        let closure = table.declare_class_extending("Closure", object);
        let class = table.declare_class_extending("Class", object);
        let bytecode_adapter = table.declare_class_extending("BytecodeAdapter", object);

        let int = table.primitives[&PrimitiveKind::Int];
        let boolean = table.primitives[&PrimitiveKind::Boolean];
        let void = table.primitives[&PrimitiveKind::Void];
        let integer = table.wrappers[&PrimitiveKind::Int];

        for name in COMPARISON_ADAPTER_METHODS {
            let return_type = if name == "compareTo" { int } else { boolean };
            table.declare_method(
                bytecode_adapter,
                name,
                vec![
                    ParamInfo::new("left", object),
                    ParamInfo::new("right", object),
                ],
                return_type,
                true,
            );
        }

        table.well_known = WellKnownTypes {
            object,
            number,
            integer,
            string,
            map,
            linked_hash_map,
            list,
            closure,
            class,
            bytecode_adapter,
            int,
            boolean,
            void,
        };
        table
    }

    fn push_type(&mut self, name: &str, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData {
            name: name.to_string(),
            kind,
        });
        id
    }

    fn class_info_mut(&mut self, ty: TypeId) -> Option<&mut ClassInfo> {
        match &mut self.types[ty.index()].kind {
            TypeKind::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }

    // =========================================================================
    // Declaration
    // =========================================================================

    pub fn declare_class(&mut self, name: &str) -> TypeId {
        let object = self.well_known.object;
        self.declare_class_extending(name, object)
    }

    pub fn declare_class_extending(&mut self, name: &str, superclass: TypeId) -> TypeId {
        self.push_type(
            name,
            TypeKind::Class(ClassInfo {
                superclass: Some(superclass),
                ..ClassInfo::default()
            }),
        )
    }

    pub fn declare_interface(&mut self, name: &str) -> TypeId {
        self.push_type(
            name,
            TypeKind::Class(ClassInfo {
                is_interface: true,
                ..ClassInfo::default()
            }),
        )
    }

    pub fn declare_enum(&mut self, name: &str) -> TypeId {
        let object = self.well_known.object;
        self.push_type(
            name,
            TypeKind::Class(ClassInfo {
                superclass: Some(object),
                is_enum: true,
                ..ClassInfo::default()
            }),
        )
    }

    pub fn add_interface(&mut self, ty: TypeId, interface: TypeId) {
        if let Some(info) = self.class_info_mut(ty) {
            info.interfaces.push(interface);
        }
    }

    pub fn declare_field(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        if let Some(info) = self.class_info_mut(owner) {
            info.fields.insert(name.to_string(), ty);
        }
    }

    pub fn declare_method(
        &mut self,
        owner: TypeId,
        name: &str,
        params: Vec<ParamInfo>,
        return_type: TypeId,
        is_static: bool,
    ) -> MethodId {
        let id = self.push_method(MethodData {
            name: name.to_string(),
            owner,
            params,
            return_type,
            is_static,
            kind: MethodKind::Method,
        });
        if let Some(info) = self.class_info_mut(owner) {
            info.methods.push(id);
        }
        id
    }

    /// Declare a constructor written by the programmer.
    pub fn declare_constructor(&mut self, owner: TypeId, params: Vec<ParamInfo>) -> MethodId {
        let id = self.push_constructor(owner, params);
        if let Some(info) = self.class_info_mut(owner) {
            info.declared_constructors.push(id);
        }
        id
    }

    /// Register the map-based convenience constructor the resolver invents for
    /// classes without one. It is deliberately absent from the declared list.
    pub fn synthesize_map_constructor(&mut self, owner: TypeId) -> MethodId {
        let map = self.well_known.map;
        self.push_constructor(owner, vec![ParamInfo::new("args", map)])
    }

    fn push_constructor(&mut self, owner: TypeId, params: Vec<ParamInfo>) -> MethodId {
        self.push_method(MethodData {
            name: "<init>".to_string(),
            owner,
            params,
            return_type: owner,
            is_static: false,
            kind: MethodKind::Constructor,
        })
    }

    fn push_method(&mut self, data: MethodData) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(data);
        id
    }

    /// Array type with the given component type, created on first use.
    pub fn array_of(&mut self, component: TypeId) -> TypeId {
        if let Some(&existing) = self.arrays.get(&component) {
            return existing;
        }
        let name = format!("{}[]", self.types[component.index()].name);
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData {
            name,
            kind: TypeKind::Array { component },
        });
        self.arrays.insert(component, id);
        id
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, ty: TypeId) -> &TypeData {
        &self.types[ty.index()]
    }

    pub fn name(&self, ty: TypeId) -> &str {
        &self.types[ty.index()].name
    }

    pub fn method(&self, id: MethodId) -> &MethodData {
        &self.methods[id.index()]
    }

    pub fn class_info(&self, ty: TypeId) -> Option<&ClassInfo> {
        match &self.types[ty.index()].kind {
            TypeKind::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.primitives[&kind]
    }

    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.types[ty.index()].kind, TypeKind::Array { .. })
    }

    pub fn component_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.types[ty.index()].kind {
            TypeKind::Array { component } => Some(component),
            _ => None,
        }
    }

    pub fn is_enum(&self, ty: TypeId) -> bool {
        self.class_info(ty).is_some_and(|info| info.is_enum)
    }

    /// Boxed counterpart of a primitive type; any other type maps to itself.
    pub fn wrapper(&self, ty: TypeId) -> TypeId {
        match self.types[ty.index()].kind {
            TypeKind::Primitive(kind) => self.wrappers[&kind],
            _ => ty,
        }
    }

    /// True when `ty` is `target`, extends it, or implements it (transitively).
    pub fn implements_or_subclass(&self, ty: TypeId, target: TypeId) -> bool {
        let mut pending = vec![ty];
        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if let Some(info) = self.class_info(current) {
                pending.extend(info.superclass);
                pending.extend(info.interfaces.iter().copied());
            }
        }
        false
    }

    /// Declared type of a field, searching superclasses.
    pub fn field_type(&self, owner: TypeId, name: &str) -> Option<TypeId> {
        let mut current = Some(owner);
        while let Some(ty) = current {
            let info = self.class_info(ty)?;
            if let Some(&field) = info.fields.get(name) {
                return Some(field);
            }
            current = info.superclass;
        }
        None
    }

    pub fn find_method(&self, owner: TypeId, name: &str) -> Option<MethodId> {
        self.class_info(owner)?
            .methods
            .iter()
            .copied()
            .find(|&id| self.methods[id.index()].name == name)
    }

    /// Whether the constructor was written by the programmer rather than
    /// synthesized by the resolver.
    pub fn is_declared_constructor(&self, ctor: MethodId) -> bool {
        let owner = self.methods[ctor.index()].owner;
        self.class_info(owner)
            .is_some_and(|info| info.declared_constructors.contains(&ctor))
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
