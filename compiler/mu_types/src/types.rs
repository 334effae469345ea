//! Type entries held by a `Context`.

use crate::class::ClassDef;
use crate::interface::InterfaceDef;
use mu_ir::{MachineRep, Name, ScopeId, TypeId};

/// One declared or generated type.
#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub name: Name,
    /// Scope the type is declared in.
    pub scope: ScopeId,
    /// Scope holding the type's own members, for classes and interfaces.
    pub own_scope: Option<ScopeId>,
    pub rep: MachineRep,
    pub kind: TypeKind,
}

#[derive(Clone, Debug)]
pub enum TypeKind {
    Primitive,
    Class(ClassDef),
    Interface(InterfaceDef),
    /// Fixed-arity aggregate laid out like a class with fields `_0.._n`.
    Tuple(TupleDef),
    DynamicArray { element: TypeId, rank: usize },
    /// Reference to a value of the wrapped type.
    Reference(TypeId),
    /// Function values with this resolved signature, return type first.
    Function(Vec<TypeId>),
}

#[derive(Clone, Debug)]
pub struct TupleDef {
    pub elements: Vec<TypeId>,
    pub class: ClassDef,
}

impl TypeEntry {
    /// Class definition of a class or tuple type.
    pub fn class_def(&self) -> Option<&ClassDef> {
        match &self.kind {
            TypeKind::Class(def) => Some(def),
            TypeKind::Tuple(tuple) => Some(&tuple.class),
            _ => None,
        }
    }

    pub fn class_def_mut(&mut self) -> Option<&mut ClassDef> {
        match &mut self.kind {
            TypeKind::Class(def) => Some(def),
            TypeKind::Tuple(tuple) => Some(&mut tuple.class),
            _ => None,
        }
    }

    pub fn interface_def(&self) -> Option<&InterfaceDef> {
        match &self.kind {
            TypeKind::Interface(def) => Some(def),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        self.class_def().is_some()
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface(_))
    }

    /// Element type of a reference type.
    pub fn dereference_type(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Reference(inner) => Some(inner),
            _ => None,
        }
    }
}
