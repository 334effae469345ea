//! Runtime values.
//!
//! `Value` is the tagged scalar union every node produces. Heap objects are
//! shared through `ObjectRef`, a reference-counted cell whose identity is
//! the object's identity. Functions are values too, either by handle into
//! the context or as a synthesized closure.

use crate::dynamic_array::DynamicArray;
use crate::errors::Fault;
use crate::function::Function;
use crate::instance::ClassInstance;
use mu_ir::{FunctionId, MachineRep, TypeId};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// A runtime value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Void,
    Nil,
    Bool(bool),
    Byte(u8),
    Short(i16),
    Char(char),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Object(ObjectRef),
    Function(FunctionRef),
    /// An lvalue: where a value lives rather than the value itself.
    Reference(Place),
}

impl Value {
    /// The zero value stored in fresh memory of representation `rep`.
    pub fn zeroed(rep: MachineRep) -> Self {
        match rep {
            MachineRep::Void => Value::Void,
            MachineRep::Bool => Value::Bool(false),
            MachineRep::Byte => Value::Byte(0),
            MachineRep::Short => Value::Short(0),
            MachineRep::Char => Value::Char('\0'),
            MachineRep::Int => Value::Int(0),
            MachineRep::Int64 => Value::Int64(0),
            MachineRep::Float => Value::Float(0.0),
            MachineRep::Double => Value::Double(0.0),
            MachineRep::Pointer => Value::Nil,
        }
    }

    pub fn rep(&self) -> MachineRep {
        match self {
            Value::Void => MachineRep::Void,
            Value::Bool(_) => MachineRep::Bool,
            Value::Byte(_) => MachineRep::Byte,
            Value::Short(_) => MachineRep::Short,
            Value::Char(_) => MachineRep::Char,
            Value::Int(_) => MachineRep::Int,
            Value::Int64(_) => MachineRep::Int64,
            Value::Float(_) => MachineRep::Float,
            Value::Double(_) => MachineRep::Double,
            Value::Nil | Value::Object(_) | Value::Function(_) | Value::Reference(_) => {
                MachineRep::Pointer
            }
        }
    }

    /// Short description used in fault messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Reference(_) => "reference",
            Value::Nil => "nil",
            other => other.rep().name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral payload widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Char(c) => Some(i64::from(u32::from(*c))),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "numeric casts follow C conversion rules"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Non-negative integral payload as an index.
    pub fn as_index(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_place(&self) -> Option<&Place> {
        match self {
            Value::Reference(place) => Some(place),
            _ => None,
        }
    }

    /// Numeric conversion to `rep`, with C truncation semantics.
    ///
    /// Returns `None` when either side is not a number.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "numeric casts follow C conversion rules"
    )]
    pub fn convert(&self, rep: MachineRep) -> Option<Value> {
        if self.rep() == rep {
            return Some(self.clone());
        }
        if let Some(v) = self.as_i64() {
            return Some(match rep {
                MachineRep::Bool => Value::Bool(v != 0),
                MachineRep::Byte => Value::Byte(v as u8),
                MachineRep::Short => Value::Short(v as i16),
                MachineRep::Char => Value::Char(char::from_u32(v as u32).unwrap_or('\u{FFFD}')),
                MachineRep::Int => Value::Int(v as i32),
                MachineRep::Int64 => Value::Int64(v),
                MachineRep::Float => Value::Float(v as f32),
                MachineRep::Double => Value::Double(v as f64),
                MachineRep::Void | MachineRep::Pointer => return None,
            });
        }
        let v = match self {
            Value::Float(f) => f64::from(*f),
            Value::Double(d) => *d,
            _ => return None,
        };
        Some(match rep {
            MachineRep::Bool => Value::Bool(v != 0.0),
            MachineRep::Byte => Value::Byte(v as u8),
            MachineRep::Short => Value::Short(v as i16),
            MachineRep::Char => Value::Char(char::from_u32(v as u32).unwrap_or('\u{FFFD}')),
            MachineRep::Int => Value::Int(v as i32),
            MachineRep::Int64 => Value::Int64(v as i64),
            MachineRep::Float => Value::Float(v as f32),
            MachineRep::Double => Value::Double(v),
            MachineRep::Void | MachineRep::Pointer => return None,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Object(object) => write!(f, "<object {:?}>", object.ty()),
            Value::Function(FunctionRef::Declared(id)) => write!(f, "<function {}>", id.index()),
            Value::Function(FunctionRef::Synthesized(_)) => f.write_str("<closure>"),
            Value::Reference(place) => write!(f, "<ref {place:?}>"),
        }
    }
}

/// Where an lvalue lives.
#[derive(Clone, Debug, PartialEq)]
pub enum Place {
    /// Slot `slot` of one activation on the evaluating thread's value
    /// stack. Activations are numbered in call order and never reused, so
    /// a place that outlives its activation is detected rather than
    /// aliasing a later frame.
    Stack { activation: u64, slot: usize },
    /// Field `index` of a class instance.
    Field { object: ObjectRef, index: usize },
    /// Element `index` of a dynamic array.
    Element { object: ObjectRef, index: usize },
}

/// A callable value.
#[derive(Clone, Debug)]
pub enum FunctionRef {
    /// A function declared in the context.
    Declared(FunctionId),
    /// A function built at runtime, such as a partial application.
    Synthesized(Arc<Function>),
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FunctionRef::Declared(a), FunctionRef::Declared(b)) => a == b,
            (FunctionRef::Synthesized(a), FunctionRef::Synthesized(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Heap payload of an object.
#[derive(Debug)]
pub enum Object {
    Instance(ClassInstance),
    Array(DynamicArray),
}

impl Object {
    pub fn as_instance(&self) -> Result<&ClassInstance, Fault> {
        match self {
            Object::Instance(instance) => Ok(instance),
            Object::Array(_) => Err(Fault::bad_cast("array", "class instance")),
        }
    }

    pub fn as_instance_mut(&mut self) -> Result<&mut ClassInstance, Fault> {
        match self {
            Object::Instance(instance) => Ok(instance),
            Object::Array(_) => Err(Fault::bad_cast("array", "class instance")),
        }
    }

    pub fn as_array(&self) -> Result<&DynamicArray, Fault> {
        match self {
            Object::Array(array) => Ok(array),
            Object::Instance(_) => Err(Fault::bad_internal_array_call("receiver is not an array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut DynamicArray, Fault> {
        match self {
            Object::Array(array) => Ok(array),
            Object::Instance(_) => Err(Fault::bad_internal_array_call("receiver is not an array")),
        }
    }

    /// Move every object handle this payload holds into `out`.
    fn detach_handles(&mut self, out: &mut Vec<ObjectRef>) {
        let slots = match self {
            Object::Instance(instance) => instance.fields_mut(),
            Object::Array(array) => array.storage_mut(),
        };
        for slot in slots {
            if matches!(
                slot,
                Value::Object(_) | Value::Reference(Place::Field { .. } | Place::Element { .. })
            ) {
                match std::mem::replace(slot, Value::Nil) {
                    Value::Object(object)
                    | Value::Reference(Place::Field { object, .. } | Place::Element { object, .. }) => {
                        out.push(object);
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Callback run once when an object becomes unreachable.
pub type Finalizer = Box<dyn FnOnce() + Send>;

struct ObjectCell {
    ty: TypeId,
    data: RwLock<Object>,
    finalizers: Mutex<Vec<Finalizer>>,
}

/// Reclamation is iterative: handles held by a dying object go on a
/// worklist, and a handle that turns out to be the last one has its own
/// handles detached before its cell drops. Long chains never recurse.
impl Drop for ObjectCell {
    fn drop(&mut self) {
        let mut orphans = Vec::new();
        self.data.get_mut().detach_handles(&mut orphans);
        for finalizer in self.finalizers.get_mut().drain(..) {
            finalizer();
        }
        while let Some(ObjectRef(handle)) = orphans.pop() {
            if let Ok(mut cell) = Arc::try_unwrap(handle) {
                cell.data.get_mut().detach_handles(&mut orphans);
            }
        }
    }
}

/// Shared handle to a heap object. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

impl ObjectRef {
    /// Wrap a payload. Collectors call this; scripts go through a `Collector`.
    pub fn new(ty: TypeId, object: Object) -> Self {
        Self(Arc::new(ObjectCell {
            ty,
            data: RwLock::new(object),
            finalizers: Mutex::new(Vec::new()),
        }))
    }

    /// Dynamic type of the object.
    pub fn ty(&self) -> TypeId {
        self.0.ty
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.data.write()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Queue a finalizer. Finalizers run in registration order.
    pub fn add_finalizer(&self, finalizer: Finalizer) {
        self.0.finalizers.lock().push(finalizer);
    }

    /// Number of live handles to this object.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:?} @ {:p})", self.0.ty, Arc::as_ptr(&self.0))
    }
}
