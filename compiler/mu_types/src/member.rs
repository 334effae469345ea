//! Named storage slots: class fields and function parameters.
//!
//! A slot's storage type may name a type that is not declared yet. Such a
//! slot stays `Unresolved` until a resolution pass finds exactly one match.

use crate::value::Value;
use mu_ir::{Name, TypeId};

/// Storage type of a slot, possibly still a forward reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageRef {
    /// Qualified type name awaiting resolution.
    Unresolved(Name),
    Resolved(TypeId),
}

impl StorageRef {
    pub fn resolved(self) -> Option<TypeId> {
        match self {
            StorageRef::Resolved(ty) => Some(ty),
            StorageRef::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, StorageRef::Resolved(_))
    }
}

/// A field of a class.
#[derive(Clone, Debug)]
pub struct MemberVariable {
    pub name: Name,
    pub storage: StorageRef,
    /// Hidden members are not visible to name lookup.
    pub hidden: bool,
    /// Index into the instance field vector, set when the class freezes.
    pub(crate) index: Option<usize>,
    /// Byte offset within the instance, set when the class freezes.
    pub(crate) offset: Option<usize>,
}

impl MemberVariable {
    pub fn new(name: Name, storage: StorageRef) -> Self {
        Self {
            name,
            storage,
            hidden: false,
            index: None,
            offset: None,
        }
    }

    /// Member whose type is given by name and resolved later.
    pub fn named(name: Name, type_name: Name) -> Self {
        Self::new(name, StorageRef::Unresolved(type_name))
    }

    pub fn typed(name: Name, ty: TypeId) -> Self {
        Self::new(name, StorageRef::Resolved(ty))
    }

    /// Storage type, or `None` while it is still a forward reference.
    pub fn storage_class(&self) -> Option<TypeId> {
        self.storage.resolved()
    }

    pub fn instance_offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn field_index(&self) -> Option<usize> {
        self.index
    }
}

/// A function parameter.
///
/// Free parameters hold variables captured by a closure: they follow the
/// visible parameters and are filled from `default`, never by the caller.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: Name,
    pub storage: StorageRef,
    pub default: Option<Value>,
    pub free: bool,
}

impl Parameter {
    pub fn new(name: Name, storage: StorageRef) -> Self {
        Self {
            name,
            storage,
            default: None,
            free: false,
        }
    }

    pub fn typed(name: Name, ty: TypeId) -> Self {
        Self::new(name, StorageRef::Resolved(ty))
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// A captured variable bound to `value`.
    pub fn free(name: Name, ty: TypeId, value: Value) -> Self {
        Self {
            name,
            storage: StorageRef::Resolved(ty),
            default: Some(value),
            free: true,
        }
    }
}
