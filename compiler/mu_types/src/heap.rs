//! The collector seam.
//!
//! The runtime never frees an object: it asks a [`Collector`] for storage
//! and drops its handles. The concrete reclamation strategy is the
//! collector's business. [`RefCountedCollector`] reclaims on last drop and
//! keeps statistics; hosts with a tracing collector plug in their own.

use crate::errors::Fault;
use crate::value::{Finalizer, Object, ObjectRef};
use mu_ir::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Size and scanning needs of one allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocRequest {
    pub bytes: usize,
    /// True when the object holds no pointers and need not be scanned.
    pub atomic: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub allocations: usize,
    pub atomic_allocations: usize,
    pub live_bytes: usize,
    pub finalized: usize,
}

pub trait Collector: Send + Sync {
    fn allocate(&self, request: AllocRequest, ty: TypeId, object: Object) -> Result<ObjectRef, Fault>;

    /// Charge `extra_bytes` of new storage to `object` before it grows.
    ///
    /// The charge is released when `object` is reclaimed. Collectors that
    /// do not budget memory accept every request.
    fn grow(&self, _object: &ObjectRef, _extra_bytes: usize) -> Result<(), Fault> {
        Ok(())
    }

    /// Run `finalizer` once `object` is reclaimed.
    fn register_finalizer(&self, object: &ObjectRef, finalizer: Finalizer) {
        object.add_finalizer(finalizer);
    }

    fn stats(&self) -> HeapStats;
}

#[derive(Default)]
struct Counters {
    allocations: AtomicUsize,
    atomic_allocations: AtomicUsize,
    live_bytes: AtomicUsize,
    finalized: AtomicUsize,
}

/// Collector that reclaims an object when its last handle drops.
///
/// Objects that reach themselves through their own fields form a cycle
/// whose count never drops to zero: they are not reclaimed and their
/// finalizers never run. Programs that build cyclic structures must break
/// the cycle before dropping it, or run under a tracing collector.
///
/// Array growth is charged through [`Collector::grow`] and counts against
/// the same limit as allocations.
#[derive(Clone, Default)]
pub struct RefCountedCollector {
    counters: Arc<Counters>,
    limit: Option<usize>,
}

impl RefCountedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail allocations that would push live bytes past `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            counters: Arc::default(),
            limit: Some(limit),
        }
    }

    /// Add `bytes` to the live total unless that would pass the limit.
    fn charge(&self, bytes: usize) -> Result<(), Fault> {
        let live = &self.counters.live_bytes;
        let limit = self.limit.unwrap_or(usize::MAX);
        live.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            current.checked_add(bytes).filter(|&total| total <= limit)
        })
        .map(|_| ())
        .map_err(|current| {
            tracing::warn!(requested = bytes, live = current, limit, "heap limit reached");
            Fault::out_of_heap_memory(bytes, current, limit)
        })
    }

    fn release_on_drop(&self, object: &ObjectRef, bytes: usize, counts: bool) {
        let release = Arc::clone(&self.counters);
        object.add_finalizer(Box::new(move || {
            release.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
            if counts {
                release.finalized.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
}

impl Collector for RefCountedCollector {
    fn allocate(&self, request: AllocRequest, ty: TypeId, object: Object) -> Result<ObjectRef, Fault> {
        self.charge(request.bytes)?;
        let counters = &self.counters;
        counters.allocations.fetch_add(1, Ordering::Relaxed);
        if request.atomic {
            counters.atomic_allocations.fetch_add(1, Ordering::Relaxed);
        }

        let object = ObjectRef::new(ty, object);
        self.release_on_drop(&object, request.bytes, true);
        Ok(object)
    }

    fn grow(&self, object: &ObjectRef, extra_bytes: usize) -> Result<(), Fault> {
        if extra_bytes == 0 {
            return Ok(());
        }
        self.charge(extra_bytes)?;
        self.release_on_drop(object, extra_bytes, false);
        Ok(())
    }

    fn stats(&self) -> HeapStats {
        let counters = &self.counters;
        HeapStats {
            allocations: counters.allocations.load(Ordering::Relaxed),
            atomic_allocations: counters.atomic_allocations.load(Ordering::Relaxed),
            live_bytes: counters.live_bytes.load(Ordering::Relaxed),
            finalized: counters.finalized.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests;
