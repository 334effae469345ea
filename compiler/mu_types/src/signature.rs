//! Function signatures with deferred resolution.
//!
//! Slot 0 is the return type, the rest are argument types. A signature is
//! built either from types or from qualified names, never a mix. Name-mode
//! signatures resolve lazily: [`Signature::try_resolve`] is pure and may be
//! retried until every referenced type has been declared.

use crate::context::Context;
use crate::errors::Fault;
use mu_ir::{Name, TypeId};
use smallvec::SmallVec;

pub type SlotTypes = SmallVec<[TypeId; 4]>;

#[derive(Clone, Debug, Default)]
enum Slots {
    #[default]
    Empty,
    Types(SlotTypes),
    Names {
        names: SmallVec<[Name; 4]>,
        resolved: Option<SlotTypes>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct Signature {
    slots: Slots,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_types(types: impl IntoIterator<Item = TypeId>) -> Self {
        Self {
            slots: Slots::Types(types.into_iter().collect()),
        }
    }

    /// Name-mode signature. `Name::EMPTY` in a slot means `void`.
    pub fn from_names(names: impl IntoIterator<Item = Name>) -> Self {
        Self {
            slots: Slots::Names {
                names: names.into_iter().collect(),
                resolved: None,
            },
        }
    }

    pub fn push_type(&mut self, ty: TypeId) -> Result<(), Fault> {
        match &mut self.slots {
            Slots::Empty => {
                self.slots = Slots::Types(smallvec::smallvec![ty]);
                Ok(())
            }
            Slots::Types(types) => {
                types.push(ty);
                Ok(())
            }
            Slots::Names { .. } => Err(Fault::inconsistent_signature(
                "cannot add a type to a signature built from names",
            )),
        }
    }

    pub fn push_name(&mut self, name: Name) -> Result<(), Fault> {
        match &mut self.slots {
            Slots::Empty => {
                self.slots = Slots::Names {
                    names: smallvec::smallvec![name],
                    resolved: None,
                };
                Ok(())
            }
            Slots::Names { names, resolved } => {
                names.push(name);
                *resolved = None;
                Ok(())
            }
            Slots::Types(_) => Err(Fault::inconsistent_signature(
                "cannot add a name to a signature built from types",
            )),
        }
    }

    pub fn len(&self) -> usize {
        match &self.slots {
            Slots::Empty => 0,
            Slots::Types(types) => types.len(),
            Slots::Names { names, .. } => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_resolved(&self) -> bool {
        self.types().is_some()
    }

    /// Resolved slot types, return type first.
    pub fn types(&self) -> Option<&[TypeId]> {
        match &self.slots {
            Slots::Empty => Some(&[]),
            Slots::Types(types) => Some(types),
            Slots::Names { resolved, .. } => resolved.as_deref(),
        }
    }

    /// Recorded names of a name-mode signature.
    pub fn names(&self) -> Option<&[Name]> {
        match &self.slots {
            Slots::Names { names, .. } => Some(names),
            _ => None,
        }
    }

    pub fn return_type(&self) -> Option<TypeId> {
        self.types().map(|types| types.first().copied().unwrap_or(TypeId::VOID))
    }

    /// Argument types, excluding the return slot.
    pub fn arg_types(&self) -> Option<&[TypeId]> {
        self.types().map(|types| types.get(1..).unwrap_or(&[]))
    }

    /// Attempt resolution without modifying the signature.
    ///
    /// Returns `Ok(None)` while some name has no visible type (a forward
    /// reference), and an ambiguity fault when a name has several.
    pub fn try_resolve(&self, ctx: &Context) -> Result<Option<SlotTypes>, Fault> {
        let names = match &self.slots {
            Slots::Names {
                resolved: Some(types),
                ..
            } => return Ok(Some(types.clone())),
            Slots::Names { names, .. } => names,
            Slots::Types(types) => return Ok(Some(types.clone())),
            Slots::Empty => return Ok(Some(SlotTypes::new())),
        };

        let mut types = SlotTypes::with_capacity(names.len());
        for &name in names {
            match ctx.resolve_type_name(name)? {
                Some(ty) => types.push(ty),
                None => return Ok(None),
            }
        }
        Ok(Some(types))
    }

    /// Resolve in place. Idempotent; returns whether the signature is resolved.
    pub fn resolve(&mut self, ctx: &Context) -> Result<bool, Fault> {
        if self.is_resolved() {
            return Ok(true);
        }
        match self.try_resolve(ctx)? {
            Some(types) => {
                self.apply(types);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Install the result of a successful `try_resolve`.
    pub(crate) fn apply(&mut self, types: SlotTypes) {
        if let Slots::Names { resolved, .. } = &mut self.slots {
            *resolved = Some(types);
        }
    }

    /// Member-function match: equal except for slot 1, the receiver.
    ///
    /// An override takes `this` as its own class, so that slot never matches.
    pub fn matches_member(&self, other: &Signature) -> bool {
        match (self.types(), other.types()) {
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .enumerate()
                        .all(|(i, (x, y))| i == 1 || x == y)
            }
            _ => false,
        }
    }
}

/// Resolved signatures compare by type identity. Unresolved name-mode
/// signatures compare by recorded names only.
impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        match (self.types(), other.types()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.names() == other.names(),
            _ => false,
        }
    }
}
