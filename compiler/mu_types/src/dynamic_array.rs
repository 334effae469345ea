//! Growable typed arrays.
//!
//! A `DynamicArray` has a fixed rank chosen at creation and a size per
//! dimension. Elements are stored row-major in one buffer whose capacity
//! only grows: shrinking keeps the buffer, and elements exposed again by a
//! later growth are zero-filled first.
//!
//! Byte-level accounting (`data_size`, `alloc_size`) is derived from the
//! element representation, so `size() == data_size() / element_size()`
//! always holds.

use crate::context::Context;
use crate::errors::Fault;
use crate::heap::{AllocRequest, Collector};
use crate::types::TypeKind;
use crate::value::{Object, ObjectRef, Value};
use mu_ir::{MachineRep, TypeId};
use smallvec::SmallVec;

/// Most elements one array may hold. Positions are script `int`s.
pub const MAX_ELEMENTS: usize = (1 << 31) - 1;

#[derive(Clone, Debug)]
pub struct DynamicArray {
    element: TypeId,
    rep: MachineRep,
    sizes: SmallVec<[usize; 2]>,
    /// Backing buffer. Its length is the capacity in elements.
    data: Vec<Value>,
    /// Logical element count, the product of `sizes`.
    len: usize,
}

impl DynamicArray {
    /// Empty array of the given rank. A rank of zero is treated as one.
    pub fn new(element: TypeId, rep: MachineRep, rank: usize) -> Self {
        let rank = rank.max(1);
        Self {
            element,
            rep,
            sizes: SmallVec::from_elem(0, rank),
            data: Vec::new(),
            len: 0,
        }
    }

    pub fn element_type(&self) -> TypeId {
        self.element
    }

    pub fn element_rep(&self) -> MachineRep {
        self.rep
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Total number of logical elements.
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_size(&self) -> usize {
        self.rep.size()
    }

    /// Bytes of logically valid data.
    pub fn data_size(&self) -> usize {
        self.len * self.element_size()
    }

    /// Bytes of reserved storage.
    pub fn alloc_size(&self) -> usize {
        self.data.len() * self.element_size()
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Change the size of every dimension.
    ///
    /// The number of dimensions must equal the rank. On any fault the array
    /// is left exactly as it was.
    pub fn resize(&mut self, dims: &[usize]) -> Result<(), Fault> {
        let total = self.extent(dims)?;
        self.set_len(total)?;
        self.sizes.clear();
        self.sizes.extend_from_slice(dims);
        Ok(())
    }

    /// Element count described by `dims`, checked against the rank and
    /// [`MAX_ELEMENTS`].
    pub fn extent(&self, dims: &[usize]) -> Result<usize, Fault> {
        if dims.len() != self.rank() {
            return Err(Fault::wrong_dimensionality(self.rank(), dims.len()));
        }
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&total| total <= MAX_ELEMENTS)
            .ok_or_else(|| {
                let requested = dims
                    .iter()
                    .fold(self.element_size(), |acc, &d| acc.saturating_mul(d));
                self.too_large(requested)
            })
    }

    /// Bytes of new storage needed before `len` elements fit.
    pub fn growth_bytes(&self, len: usize) -> usize {
        (self.grown_capacity(len) - self.data.len()) * self.element_size()
    }

    fn grown_capacity(&self, len: usize) -> usize {
        if len <= self.data.len() {
            return self.data.len();
        }
        len.max(self.data.len().saturating_mul(2)).min(MAX_ELEMENTS)
    }

    fn too_large(&self, requested: usize) -> Fault {
        Fault::out_of_heap_memory(
            requested,
            self.alloc_size(),
            MAX_ELEMENTS.saturating_mul(self.element_size()),
        )
    }

    /// Set the logical length, growing geometrically and zero-filling
    /// newly exposed elements. Storage is reserved before anything changes.
    fn set_len(&mut self, new_len: usize) -> Result<(), Fault> {
        if new_len > MAX_ELEMENTS {
            return Err(self.too_large(new_len.saturating_mul(self.element_size())));
        }
        let capacity = self.grown_capacity(new_len);
        if capacity > self.data.len() {
            let extra = capacity - self.data.len();
            self.data
                .try_reserve_exact(extra)
                .map_err(|_| self.too_large(extra * self.element_size()))?;
            self.data.resize(capacity, Value::zeroed(self.rep));
        }
        if new_len > self.len {
            let zero = Value::zeroed(self.rep);
            for slot in &mut self.data[self.len..new_len] {
                *slot = zero.clone();
            }
        }
        self.len = new_len;
        Ok(())
    }

    /// Row-major flat index of a multi-dimensional position.
    pub fn flat_index(&self, position: &[usize]) -> Result<usize, Fault> {
        if position.len() != self.rank() {
            return Err(Fault::wrong_dimensionality(self.rank(), position.len()));
        }
        let mut flat = 0usize;
        for (&index, &extent) in position.iter().zip(&self.sizes) {
            if index >= extent {
                return Err(Fault::index_out_of_range(index, extent));
            }
            flat = flat * extent + index;
        }
        Ok(flat)
    }

    pub fn element(&self, index: usize) -> Result<&Value, Fault> {
        if index >= self.len {
            return Err(Fault::index_out_of_range(index, self.len));
        }
        Ok(&self.data[index])
    }

    pub fn set_element(&mut self, index: usize, value: Value) -> Result<(), Fault> {
        if index >= self.len {
            return Err(Fault::index_out_of_range(index, self.len));
        }
        self.data[index] = value;
        Ok(())
    }

    /// The whole buffer, including slots past the logical size.
    pub(crate) fn storage_mut(&mut self) -> &mut [Value] {
        &mut self.data
    }

    /// Logically valid elements in storage order.
    pub fn elements(&self) -> &[Value] {
        &self.data[..self.len]
    }

    pub(crate) fn require_vector(&self, operation: &str) -> Result<(), Fault> {
        if self.rank() == 1 {
            Ok(())
        } else {
            Err(Fault::bad_internal_array_call(format!(
                "{operation} requires a one-dimensional array, rank is {}",
                self.rank()
            )))
        }
    }

    /// Remove `count` elements starting at `start`, compacting the rest.
    ///
    /// The range is validated against the logical size before anything moves.
    pub fn erase(&mut self, start: usize, count: usize) -> Result<(), Fault> {
        self.require_vector("erase")?;
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| Fault::erase_out_of_bounds(start, count, self.len))?;
        self.data[start..self.len].rotate_left(end - start);
        self.len -= count;
        self.sizes[0] = self.len;
        Ok(())
    }

    pub fn push_back(&mut self, value: Value) -> Result<(), Fault> {
        self.require_vector("push_back")?;
        let index = self.len;
        self.set_len(index + 1)?;
        self.data[index] = value;
        self.sizes[0] = self.len;
        Ok(())
    }

    pub fn pop_back(&mut self) -> Result<Value, Fault> {
        self.require_vector("pop_back")?;
        if self.len == 0 {
            return Err(Fault::out_of_range(-1, 0));
        }
        self.len -= 1;
        self.sizes[0] = self.len;
        Ok(std::mem::replace(
            &mut self.data[self.len],
            Value::zeroed(self.rep),
        ))
    }

    pub fn front(&self) -> Result<&Value, Fault> {
        self.element(0)
    }

    pub fn back(&self) -> Result<&Value, Fault> {
        match self.len.checked_sub(1) {
            Some(last) => self.element(last),
            None => Err(Fault::out_of_range(-1, 0)),
        }
    }

    /// Drop every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.len = 0;
        for size in &mut self.sizes {
            *size = 0;
        }
    }
}

/// Allocate an empty array of the generated array type `ty`.
pub fn allocate_array(ctx: &Context, collector: &dyn Collector, ty: TypeId) -> Result<ObjectRef, Fault> {
    let TypeKind::DynamicArray { element, rank } = ctx.type_entry(ty).kind else {
        return Err(Fault::bad_internal_array_call(format!(
            "`{}` is not an array type",
            ctx.qualified_type_name(ty)
        )));
    };
    let rep = ctx.type_entry(element).rep;
    let request = AllocRequest {
        bytes: 0,
        atomic: !rep.is_pointer(),
    };
    collector.allocate(request, ty, Object::Array(DynamicArray::new(element, rep, rank)))
}

/// Resize the array behind `object`, charging any new storage to
/// `collector` before the array changes.
pub fn resize_array(collector: &dyn Collector, object: &ObjectRef, dims: &[usize]) -> Result<(), Fault> {
    let mut guard = object.write();
    let array = guard.as_array_mut()?;
    let extra = array.growth_bytes(array.extent(dims)?);
    collector.grow(object, extra)?;
    array.resize(dims)
}

/// Append to the array behind `object`, charging growth like [`resize_array`].
pub fn push_back_array(collector: &dyn Collector, object: &ObjectRef, value: Value) -> Result<(), Fault> {
    let mut guard = object.write();
    let array = guard.as_array_mut()?;
    array.require_vector("push_back")?;
    let extra = array.growth_bytes(array.size().saturating_add(1));
    collector.grow(object, extra)?;
    array.push_back(value)
}
