//! Classes: single inheritance, interface ancestors, and freezing.
//!
//! # Freezing
//!
//! `Context::freeze` fixes a class's layout. It freezes the superclass first,
//! copies the inherited fields, appends the class's own members aligned to
//! their representation, then appends one hidden pointer slot for each
//! interface the class declares that no ancestor already declared. Dispatch
//! tables for every declared interface are built before anything is
//! committed, so a failed freeze leaves the class exactly as it was.
//!
//! Freezing is idempotent. Once frozen, offsets and size never change and
//! members can no longer be added.

use crate::context::Context;
use crate::errors::Fault;
use crate::member::{MemberVariable, StorageRef};
use crate::signature::Signature;
use crate::value::Value;
use mu_ir::{align_up, FunctionId, MachineRep, Name, TypeId};
use std::sync::Arc;

/// Declaration of a class.
#[derive(Clone, Debug, Default)]
pub struct ClassDef {
    pub super_class: Option<TypeId>,
    /// Interfaces this class declares it implements.
    pub interfaces: Vec<TypeId>,
    /// Own members, in declaration order. Inherited members are not repeated.
    pub members: Vec<MemberVariable>,
    /// Own member functions, in declaration order.
    pub methods: Vec<FunctionId>,
    pub(crate) layout: Option<ClassLayout>,
}

impl ClassDef {
    pub fn is_frozen(&self) -> bool {
        self.layout.is_some()
    }

    pub fn layout(&self) -> Option<&ClassLayout> {
        self.layout.as_ref()
    }

    /// Own member by name.
    pub fn member(&self, name: Name) -> Option<&MemberVariable> {
        self.members.iter().find(|m| m.name == name && !m.hidden)
    }
}

/// One slot of a frozen instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: Name,
    /// Storage type; for hidden ancestor slots, the interface.
    pub ty: TypeId,
    pub rep: MachineRep,
    pub offset: usize,
    pub hidden: bool,
}

/// Hidden slot reserved for an interface ancestor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AncestorSlot {
    pub interface: TypeId,
    /// Index into the field list.
    pub field: usize,
}

/// Final layout of a frozen class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLayout {
    /// Inherited fields first, then own members, then own hidden slots.
    pub fields: Vec<FieldLayout>,
    pub ancestors: Vec<AncestorSlot>,
    /// Instance size in bytes, padded to `alignment`.
    pub size: usize,
    pub alignment: usize,
    /// True when no field holds a pointer, so the collector need not scan.
    pub gc_atomic: bool,
    /// Index of the first field declared by this class itself.
    pub first_own_field: usize,
}

impl ClassLayout {
    fn empty() -> Self {
        Self {
            fields: Vec::new(),
            ancestors: Vec::new(),
            size: 0,
            alignment: 1,
            gc_atomic: true,
            first_own_field: 0,
        }
    }

    fn push_field(&mut self, field: FieldLayout) -> usize {
        let alignment = field.rep.struct_alignment();
        let offset = align_up(self.size, alignment);
        self.size = offset + field.rep.size();
        self.alignment = self.alignment.max(alignment);
        if field.rep.is_pointer() {
            self.gc_atomic = false;
        }
        self.fields.push(FieldLayout { offset, ..field });
        self.fields.len() - 1
    }
}

impl Context {
    pub fn class_def(&self, class: TypeId) -> Result<&ClassDef, Fault> {
        self.type_entry(class)
            .class_def()
            .ok_or_else(|| Fault::not_a_class(self.qualified_type_name(class)))
    }

    pub(crate) fn class_def_mut(&mut self, class: TypeId) -> Result<&mut ClassDef, Fault> {
        let name = self.qualified_type_name(class);
        self.types[class.index()]
            .class_def_mut()
            .ok_or_else(|| Fault::not_a_class(name))
    }

    fn unfrozen_class_mut(&mut self, class: TypeId) -> Result<&mut ClassDef, Fault> {
        let name = self.qualified_type_name(class);
        let def = self.class_def_mut(class)?;
        if def.is_frozen() {
            return Err(Fault::class_frozen(name));
        }
        Ok(def)
    }

    /// Append an own member. Returns its position among the class's members.
    pub fn add_member(&mut self, class: TypeId, member: MemberVariable) -> Result<usize, Fault> {
        let def = self.unfrozen_class_mut(class)?;
        def.members.push(member);
        Ok(def.members.len() - 1)
    }

    /// Declare that `class` implements `interface`.
    pub fn add_interface(&mut self, class: TypeId, interface: TypeId) -> Result<(), Fault> {
        if !self.type_entry(interface).is_interface() {
            return Err(Fault::not_an_interface(self.qualified_type_name(interface)));
        }
        let def = self.unfrozen_class_mut(class)?;
        if !def.interfaces.contains(&interface) {
            def.interfaces.push(interface);
        }
        Ok(())
    }

    pub fn is_frozen(&self, class: TypeId) -> bool {
        self.class_def(class).is_ok_and(ClassDef::is_frozen)
    }

    pub fn layout(&self, class: TypeId) -> Result<&ClassLayout, Fault> {
        self.class_def(class)?
            .layout()
            .ok_or_else(|| Fault::not_frozen(self.qualified_type_name(class)))
    }

    pub fn instance_size(&self, class: TypeId) -> Result<usize, Fault> {
        self.layout(class).map(|layout| layout.size)
    }

    pub fn is_gc_atomic(&self, class: TypeId) -> Result<bool, Fault> {
        self.layout(class).map(|layout| layout.gc_atomic)
    }

    /// Field `index` of a frozen class, inherited fields included.
    pub fn field(&self, class: TypeId, index: usize) -> Result<&FieldLayout, Fault> {
        let layout = self.layout(class)?;
        layout
            .fields
            .get(index)
            .ok_or_else(|| Fault::index_out_of_range(index, layout.fields.len()))
    }

    pub fn field_type(&self, class: TypeId, index: usize) -> Result<TypeId, Fault> {
        self.field(class, index).map(|field| field.ty)
    }

    /// Index of the visible field called `name`, searching the most derived
    /// declaration first.
    pub fn field_index(&self, class: TypeId, name: Name) -> Result<Option<usize>, Fault> {
        let layout = self.layout(class)?;
        Ok(layout
            .fields
            .iter()
            .rposition(|field| field.name == name && !field.hidden))
    }

    /// Freeze `class` and its superclasses.
    pub fn freeze(&mut self, class: TypeId) -> Result<(), Fault> {
        let def = self.class_def(class)?;
        if def.is_frozen() {
            return Ok(());
        }
        let parent = def.super_class;
        if let Some(parent) = parent {
            self.freeze(parent)?;
        }

        let layout = self.compute_layout(class)?;
        let mut tables = Vec::with_capacity(layout.ancestors.len());
        for ancestor in &layout.ancestors {
            let table = self.construct(ancestor.interface, class).ok_or_else(|| {
                Fault::bad_interface_invocation(
                    self.qualified_type_name(class),
                    self.qualified_type_name(ancestor.interface),
                )
            })?;
            tables.push(table);
        }

        tracing::debug!(
            class = %self.qualified_type_name(class),
            size = layout.size,
            fields = layout.fields.len(),
            gc_atomic = layout.gc_atomic,
            "froze class"
        );

        // Nothing below can fail.
        let memo = self.implementations.get_mut();
        for table in tables {
            memo.entry((class, table.interface))
                .or_insert_with(|| Some(Arc::new(table)));
        }
        let def = self.class_def_mut(class)?;
        for (i, member) in def.members.iter_mut().enumerate() {
            let index = layout.first_own_field + i;
            member.index = Some(index);
            member.offset = Some(layout.fields[index].offset);
        }
        def.layout = Some(layout);
        Ok(())
    }

    /// Layout `class` would get if frozen now. The superclass must be frozen.
    fn compute_layout(&self, class: TypeId) -> Result<ClassLayout, Fault> {
        let def = self.class_def(class)?;
        let mut layout = match def.super_class {
            Some(parent) => self.layout(parent)?.clone(),
            None => ClassLayout::empty(),
        };
        layout.first_own_field = layout.fields.len();

        for member in &def.members {
            let Some(ty) = member.storage_class() else {
                let type_name = match member.storage {
                    StorageRef::Unresolved(name) => self.interner().lookup(name),
                    StorageRef::Resolved(_) => "",
                };
                return Err(Fault::unresolved_member(
                    self.qualified_type_name(class),
                    self.interner().lookup(member.name),
                    type_name,
                ));
            };
            layout.push_field(FieldLayout {
                name: member.name,
                ty,
                rep: self.type_entry(ty).rep,
                offset: 0,
                hidden: member.hidden,
            });
        }

        for &interface in &def.interfaces {
            if layout.ancestors.iter().any(|a| a.interface == interface) {
                continue;
            }
            let field = layout.push_field(FieldLayout {
                name: self.type_entry(interface).name,
                ty: interface,
                rep: MachineRep::Pointer,
                offset: 0,
                hidden: true,
            });
            layout.ancestors.push(AncestorSlot { interface, field });
        }

        layout.size = align_up(layout.size, layout.alignment);
        Ok(layout)
    }

    /// Freeze every class in declaration order.
    pub fn freeze_all(&mut self) -> Result<(), Fault> {
        let classes: Vec<TypeId> = self.type_ids().filter(|&ty| self.type_entry(ty).is_class()).collect();
        for class in classes {
            self.freeze(class)?;
        }
        Ok(())
    }

    /// `class` followed by its superclasses, most derived first.
    pub fn superclass_chain(&self, class: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(class), move |&ty| {
            self.type_entry(ty).class_def().and_then(|def| def.super_class)
        })
    }

    /// Whether `class` is `ancestor` or derives from it.
    pub fn is_a(&self, class: TypeId, ancestor: TypeId) -> bool {
        self.superclass_chain(class).any(|ty| ty == ancestor)
    }

    /// Whether a value of type `from` may be used where `to` is expected.
    pub fn substitutable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if from == TypeId::NIL {
            return self.type_entry(to).rep.is_pointer();
        }
        let target = self.type_entry(to);
        if target.is_interface() {
            return self.implements(from, to);
        }
        target.is_class() && self.type_entry(from).is_class() && self.is_a(from, to)
    }

    /// Member function of `class` (or an ancestor) called `name` whose
    /// signature matches `signature` everywhere except the receiver slot.
    pub fn find_function(&self, class: TypeId, name: Name, signature: &Signature) -> Option<FunctionId> {
        self.superclass_chain(class).find_map(|ty| {
            let def = self.type_entry(ty).class_def()?;
            def.methods.iter().copied().find(|&id| {
                let candidate = self.function(id);
                candidate.name == name && candidate.signature.matches_member(signature)
            })
        })
    }

    /// The override of `function` that runs for an instance of `class`.
    pub fn dynamic_lookup(&self, class: TypeId, function: FunctionId) -> Result<FunctionId, Fault> {
        let declared = self.function(function);
        let Some(owner) = declared.owner else {
            return Ok(function);
        };

        if self.type_entry(owner).is_interface() {
            let slot = declared.interface_slot.unwrap_or(0);
            let table = self.implementation(class, owner)?.ok_or_else(|| {
                Fault::bad_interface_invocation(
                    self.qualified_type_name(class),
                    self.qualified_type_name(owner),
                )
            })?;
            return table
                .entry(slot)
                .ok_or_else(|| Fault::index_out_of_range(slot, table.entries.len()));
        }

        if !self.is_a(class, owner) {
            return Err(Fault::bad_cast(
                self.qualified_type_name(class),
                self.qualified_type_name(owner),
            ));
        }
        Ok(self
            .find_function(class, declared.name, &declared.signature)
            .unwrap_or(function))
    }

    /// Member functions of subclasses that override `function`.
    pub fn find_overriding_functions(&self, function: FunctionId) -> Vec<FunctionId> {
        let declared = self.function(function);
        let Some(owner) = declared.owner else {
            return Vec::new();
        };
        self.type_ids()
            .filter(|&ty| ty != owner && self.type_entry(ty).is_class() && self.is_a(ty, owner))
            .filter_map(|ty| self.type_entry(ty).class_def())
            .flat_map(|def| def.methods.iter().copied())
            .filter(|&id| {
                let candidate = self.function(id);
                candidate.name == declared.name
                    && candidate.signature.matches_member(&declared.signature)
            })
            .collect()
    }

    /// Check that `value` is an instance of `target`. Nil passes through.
    pub fn dynamic_cast(&self, value: &Value, target: TypeId) -> Result<Value, Fault> {
        match value {
            Value::Nil => Ok(Value::Nil),
            Value::Object(object) if self.substitutable(object.ty(), target) => Ok(value.clone()),
            Value::Object(object) => Err(Fault::bad_cast(
                self.qualified_type_name(object.ty()),
                self.qualified_type_name(target),
            )),
            other => Err(Fault::bad_cast(other.kind_name(), self.qualified_type_name(target))),
        }
    }
}
