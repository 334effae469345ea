#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use crate::dynamic_array::{push_back_array, resize_array, DynamicArray};
use crate::value::Value;
use crate::errors::FaultKind;
use mu_ir::MachineRep;
use pretty_assertions::assert_eq;

fn payload() -> Object {
    Object::Array(DynamicArray::new(TypeId::INT, MachineRep::Int, 1))
}

#[test]
fn test_stats_track_live_bytes() {
    let collector = RefCountedCollector::new();
    let request = AllocRequest {
        bytes: 24,
        atomic: true,
    };
    let a = collector.allocate(request, TypeId::INT, payload()).unwrap();
    let b = collector.allocate(request, TypeId::INT, payload()).unwrap();
    assert_eq!(
        collector.stats(),
        HeapStats {
            allocations: 2,
            atomic_allocations: 2,
            live_bytes: 48,
            finalized: 0,
        }
    );

    drop(a);
    let stats = collector.stats();
    assert_eq!(stats.live_bytes, 24);
    assert_eq!(stats.finalized, 1);
    drop(b);
    assert_eq!(collector.stats().live_bytes, 0);
}

#[test]
fn test_limit_raises_out_of_heap_memory() {
    let collector = RefCountedCollector::with_limit(32);
    let request = AllocRequest {
        bytes: 24,
        atomic: false,
    };
    let _kept = collector.allocate(request, TypeId::INT, payload()).unwrap();
    let err = collector.allocate(request, TypeId::INT, payload()).unwrap_err();
    assert_eq!(
        err.kind,
        FaultKind::OutOfHeapMemory {
            requested: 24,
            live: 24,
            limit: 32,
        }
    );
    assert_eq!(collector.stats().allocations, 1);
}

#[test]
fn test_registered_finalizer_runs_after_accounting() {
    use std::sync::atomic::AtomicBool;

    let collector = RefCountedCollector::new();
    let object = collector
        .allocate(
            AllocRequest {
                bytes: 8,
                atomic: true,
            },
            TypeId::INT,
            payload(),
        )
        .unwrap();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    collector.register_finalizer(&object, Box::new(move || flag.store(true, Ordering::SeqCst)));
    drop(object);
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(collector.stats().finalized, 1);
}

#[test]
fn test_array_growth_is_charged_and_released() {
    let collector = RefCountedCollector::with_limit(64);
    let request = AllocRequest {
        bytes: 0,
        atomic: true,
    };
    let array = collector.allocate(request, TypeId::INT, payload()).unwrap();
    resize_array(&collector, &array, &[10]).unwrap();
    assert_eq!(collector.stats().live_bytes, 40);

    let err = resize_array(&collector, &array, &[20]).unwrap_err();
    assert_eq!(
        err.kind,
        FaultKind::OutOfHeapMemory {
            requested: 40,
            live: 40,
            limit: 64,
        }
    );
    let err = push_back_array(&collector, &array, Value::Int(1)).unwrap_err();
    assert!(matches!(err.kind, FaultKind::OutOfHeapMemory { .. }));
    assert_eq!(array.read().as_array().unwrap().size(), 10);

    resize_array(&collector, &array, &[4]).unwrap();
    assert_eq!(collector.stats().live_bytes, 40);

    drop(array);
    let stats = collector.stats();
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.finalized, 1);
}

fn self_referencing(collector: &RefCountedCollector) -> ObjectRef {
    let request = AllocRequest {
        bytes: 8,
        atomic: false,
    };
    let cyclic = Object::Array(DynamicArray::new(TypeId::INT, MachineRep::Pointer, 1));
    let node = collector.allocate(request, TypeId::INT, cyclic).unwrap();
    node.write()
        .as_array_mut()
        .unwrap()
        .push_back(Value::Object(node.clone()))
        .unwrap();
    node
}

/// Reclamation is by reference count, so an object that can reach itself
/// is never reclaimed. Breaking the cycle by hand releases it.
#[test]
fn test_cycles_are_reclaimed_only_once_broken() {
    let collector = RefCountedCollector::new();

    drop(self_referencing(&collector));
    assert_eq!(collector.stats().finalized, 0);
    assert_eq!(collector.stats().live_bytes, 8);

    let broken = self_referencing(&collector);
    broken
        .write()
        .as_array_mut()
        .unwrap()
        .set_element(0, Value::Nil)
        .unwrap();
    drop(broken);
    let stats = collector.stats();
    assert_eq!(stats.finalized, 1);
    assert_eq!(stats.live_bytes, 8);
}
