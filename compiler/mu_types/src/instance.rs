//! Class instances.
//!
//! An instance is a type tag, one typed slot per field of the frozen layout,
//! and an ancestor table mapping each declared interface to its dispatch
//! table. Hidden ancestor slots still occupy a field position so indices
//! match the layout, but they hold `Nil`: dispatch always goes through the
//! ancestor table.

use crate::context::Context;
use crate::errors::Fault;
use crate::heap::{AllocRequest, Collector};
use crate::interface::DispatchTable;
use crate::value::{Object, ObjectRef, Value};
use mu_ir::TypeId;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Ancestor {
    pub interface: TypeId,
    /// Field index of the hidden slot reserved for this ancestor.
    pub slot: usize,
    pub table: Arc<DispatchTable>,
}

#[derive(Clone, Debug)]
pub struct ClassInstance {
    class: TypeId,
    fields: Vec<Value>,
    ancestors: Vec<Ancestor>,
}

impl ClassInstance {
    /// Zero-filled instance of a frozen class, ancestor table written.
    pub fn new(ctx: &Context, class: TypeId) -> Result<Self, Fault> {
        let layout = ctx.layout(class)?;
        let fields = layout
            .fields
            .iter()
            .map(|field| Value::zeroed(field.rep))
            .collect();

        let mut ancestors = Vec::with_capacity(layout.ancestors.len());
        for slot in &layout.ancestors {
            let table = ctx.implementation(class, slot.interface)?.ok_or_else(|| {
                Fault::bad_interface_invocation(
                    ctx.qualified_type_name(class),
                    ctx.qualified_type_name(slot.interface),
                )
            })?;
            ancestors.push(Ancestor {
                interface: slot.interface,
                slot: slot.field,
                table,
            });
        }

        Ok(Self {
            class,
            fields,
            ancestors,
        })
    }

    pub fn class(&self) -> TypeId {
        self.class
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Result<&Value, Fault> {
        self.fields
            .get(index)
            .ok_or_else(|| Fault::index_out_of_range(index, self.fields.len()))
    }

    pub fn set_field(&mut self, index: usize, value: Value) -> Result<(), Fault> {
        let len = self.fields.len();
        let slot = self
            .fields
            .get_mut(index)
            .ok_or_else(|| Fault::index_out_of_range(index, len))?;
        *slot = value;
        Ok(())
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Value] {
        &mut self.fields
    }

    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    pub fn ancestor(&self, interface: TypeId) -> Option<&Ancestor> {
        self.ancestors.iter().find(|a| a.interface == interface)
    }
}

/// Allocate a zero-filled instance of the frozen `class` through `collector`.
pub fn allocate(ctx: &Context, collector: &dyn Collector, class: TypeId) -> Result<ObjectRef, Fault> {
    let layout = ctx.layout(class)?;
    let request = AllocRequest {
        bytes: layout.size,
        atomic: layout.gc_atomic,
    };
    let instance = ClassInstance::new(ctx, class)?;
    collector.allocate(request, class, Object::Instance(instance))
}
