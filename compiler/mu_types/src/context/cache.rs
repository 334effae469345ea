//! Generated types, cached by structure.
//!
//! Array, tuple, reference, and function types are created on first request
//! and returned from the cache afterwards. The first type created for a key
//! is the only one that key ever yields, so identity comparisons stay valid.

use super::Context;
use crate::class::ClassDef;
use crate::errors::Fault;
use crate::member::MemberVariable;
use crate::types::{TupleDef, TypeKind};
use mu_ir::{MachineRep, ScopeId, TypeId};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub(crate) struct TypeCache {
    arrays: FxHashMap<(TypeId, usize), TypeId>,
    tuples: FxHashMap<Vec<TypeId>, TypeId>,
    references: FxHashMap<TypeId, TypeId>,
    functions: FxHashMap<Vec<TypeId>, TypeId>,
}

impl Context {
    /// Dynamic array of `element` with `rank` dimensions.
    pub fn array_type(&mut self, element: TypeId, rank: usize) -> Result<TypeId, Fault> {
        if let Some(&cached) = self.cache.arrays.get(&(element, rank)) {
            return Ok(cached);
        }
        if rank == 0 {
            return Err(Fault::wrong_dimensionality(1, 0));
        }
        if element == TypeId::VOID {
            return Err(Fault::bad_registration("void[]", "arrays of void are not allowed"));
        }

        let text = format!(
            "{}[{}]",
            self.qualified_type_name(element),
            ",".repeat(rank - 1)
        );
        let name = self.intern(&text);
        let kind = TypeKind::DynamicArray { element, rank };
        let id = self.push_type(ScopeId::GLOBAL, name, MachineRep::Pointer, kind, true);
        self.cache.arrays.insert((element, rank), id);
        tracing::debug!(array = %text, "generated array type");
        Ok(id)
    }

    pub fn cached_array_type(&self, element: TypeId, rank: usize) -> Option<TypeId> {
        self.cache.arrays.get(&(element, rank)).copied()
    }

    /// Tuple of `elements`, generated as a frozen class with fields `_0.._n`.
    pub fn tuple_type(&mut self, elements: &[TypeId]) -> Result<TypeId, Fault> {
        if let Some(&cached) = self.cache.tuples.get(elements) {
            return Ok(cached);
        }
        if elements.contains(&TypeId::VOID) {
            return Err(Fault::bad_registration("tuple", "tuple elements cannot be void"));
        }

        let element_names: Vec<String> = elements.iter().map(|&t| self.qualified_type_name(t)).collect();
        let text = format!("({})", element_names.join(","));
        let members = elements
            .iter()
            .enumerate()
            .map(|(i, &ty)| MemberVariable::typed(self.intern(&format!("_{i}")), ty))
            .collect();
        let tuple = TupleDef {
            elements: elements.to_vec(),
            class: ClassDef {
                members,
                ..ClassDef::default()
            },
        };
        let name = self.intern(&text);
        let id = self.push_type(
            ScopeId::GLOBAL,
            name,
            MachineRep::Pointer,
            TypeKind::Tuple(tuple),
            true,
        );
        self.freeze(id)?;
        self.cache.tuples.insert(elements.to_vec(), id);
        tracing::debug!(tuple = %text, "generated tuple type");
        Ok(id)
    }

    pub fn cached_tuple_type(&self, elements: &[TypeId]) -> Option<TypeId> {
        self.cache.tuples.get(elements).copied()
    }

    /// Reference to a value of `ty`.
    pub fn reference_type(&mut self, ty: TypeId) -> TypeId {
        if let Some(&cached) = self.cache.references.get(&ty) {
            return cached;
        }
        let text = format!("{}&", self.qualified_type_name(ty));
        let name = self.intern(&text);
        let id = self.push_type(
            ScopeId::GLOBAL,
            name,
            MachineRep::Pointer,
            TypeKind::Reference(ty),
            false,
        );
        self.cache.references.insert(ty, id);
        id
    }

    pub fn cached_reference_type(&self, ty: TypeId) -> Option<TypeId> {
        self.cache.references.get(&ty).copied()
    }

    /// Type of function values with signature `types`, return type first.
    pub fn function_type(&mut self, types: &[TypeId]) -> TypeId {
        if let Some(&cached) = self.cache.functions.get(types) {
            return cached;
        }
        let names: Vec<String> = types.iter().map(|&t| self.qualified_type_name(t)).collect();
        let text = match names.split_first() {
            Some((ret, args)) => format!("({ret};{})", args.join(",")),
            None => "(void;)".to_string(),
        };
        let name = self.intern(&text);
        let id = self.push_type(
            ScopeId::GLOBAL,
            name,
            MachineRep::Pointer,
            TypeKind::Function(types.to_vec()),
            false,
        );
        self.cache.functions.insert(types.to_vec(), id);
        id
    }

    pub fn cached_function_type(&self, types: &[TypeId]) -> Option<TypeId> {
        self.cache.functions.get(types).copied()
    }
}
