//! Interfaces and their per-class dispatch tables.
//!
//! An interface is an ordered list of function slots and never owns data.
//! Whether a class implements an interface is structural: it does exactly
//! when a dispatch table can be built, binding every slot either to a class
//! method with a matching signature or to the slot's default body.

use crate::context::Context;
use crate::errors::Fault;
use mu_ir::{FunctionId, TypeId};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct InterfaceDef {
    /// Slot functions; a function's position is its slot index.
    pub functions: Vec<FunctionId>,
}

impl InterfaceDef {
    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }
}

/// Binding of one interface's slots to one class's functions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchTable {
    pub interface: TypeId,
    pub class: TypeId,
    pub entries: Vec<FunctionId>,
}

impl DispatchTable {
    pub fn entry(&self, slot: usize) -> Option<FunctionId> {
        self.entries.get(slot).copied()
    }
}

impl Context {
    pub fn interface_def(&self, interface: TypeId) -> Result<&InterfaceDef, Fault> {
        self.type_entry(interface)
            .interface_def()
            .ok_or_else(|| Fault::not_an_interface(self.qualified_type_name(interface)))
    }

    pub fn interface_function(&self, interface: TypeId, slot: usize) -> Option<FunctionId> {
        self.interface_def(interface)
            .ok()
            .and_then(|def| def.functions.get(slot).copied())
    }

    /// Build the dispatch table of `interface` for `class`.
    ///
    /// Returns `None` when some slot has neither a matching class method nor
    /// a default body: the class does not implement the interface.
    pub fn construct(&self, interface: TypeId, class: TypeId) -> Option<DispatchTable> {
        let def = self.interface_def(interface).ok()?;
        let mut entries = Vec::with_capacity(def.functions.len());
        for &slot_function in &def.functions {
            let slot = self.function(slot_function);
            let bound = self
                .find_function(class, slot.name, &slot.signature)
                .filter(|&found| !self.function(found).is_abstract());
            match bound {
                Some(found) => entries.push(found),
                None if !slot.is_abstract() => entries.push(slot_function),
                None => return None,
            }
        }
        Some(DispatchTable {
            interface,
            class,
            entries,
        })
    }

    /// Memoized dispatch table of `interface` for the frozen `class`.
    ///
    /// The first table computed for a pair is the one every later caller sees.
    pub fn implementation(
        &self,
        class: TypeId,
        interface: TypeId,
    ) -> Result<Option<Arc<DispatchTable>>, Fault> {
        if !self.is_frozen(class) {
            return Err(Fault::not_frozen(self.qualified_type_name(class)));
        }
        if let Some(cached) = self.implementations.read().get(&(class, interface)) {
            return Ok(cached.clone());
        }

        let built = self.construct(interface, class).map(Arc::new);
        let mut memo = self.implementations.write();
        Ok(memo.entry((class, interface)).or_insert(built).clone())
    }

    /// Whether the frozen `class` implements `interface`.
    pub fn implements(&self, class: TypeId, interface: TypeId) -> bool {
        matches!(self.implementation(class, interface), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests;
