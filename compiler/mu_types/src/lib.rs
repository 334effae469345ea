#![allow(
    clippy::result_large_err,
    reason = "Fault is the error type of every runtime operation; boxing it would touch every signature"
)]
//! Mu Types - the object and type runtime of the Mu language.
//!
//! This crate provides:
//! - The symbol table (`Context`): scopes, types, functions, overload sets
//! - Classes with single inheritance, interfaces, tuples, dynamic arrays
//! - Freezing: instance layout and per-interface dispatch tables
//! - Signatures with deferred, fixed-point name resolution
//! - Runtime values, heap objects, and the collector seam
//! - The evaluator tree (`Node`) and the `NodeEvaluator` trait natives call
//! - The fault hierarchy (`Fault`, `FaultKind`, `ControlAction`)
//!
//! # Lifecycle
//!
//! Declarations and resolution mutate the `Context`. Freezing fixes class
//! layouts. Evaluation then only reads the context; the one exception, the
//! dispatch table memo, is guarded by its own lock.

mod class;
mod context;
mod dynamic_array;
mod errors;
mod executor;
mod function;
mod heap;
mod instance;
mod interface;
mod member;
pub mod node;
mod signature;
mod types;
mod value;

pub use class::{AncestorSlot, ClassDef, ClassLayout, FieldLayout};
pub use context::{Context, Scope, ScopeOwner, SymbolRef, Symbols};
pub use dynamic_array::{
    allocate_array, push_back_array, resize_array, DynamicArray, MAX_ELEMENTS,
};
pub use errors::{
    Backtrace, BacktraceFrame, ControlAction, EvalResult, Fault, FaultCategory, FaultKind,
};
pub use executor::NodeEvaluator;
pub use function::{
    Function, FunctionAttributes, FunctionBody, LazyNative, NativeFn, StrictNative,
};
pub use heap::{AllocRequest, Collector, HeapStats, RefCountedCollector};
pub use instance::{allocate, Ancestor, ClassInstance};
pub use interface::{DispatchTable, InterfaceDef};
pub use member::{MemberVariable, Parameter, StorageRef};
pub use node::{Node, NodeFormatter, NodeStyle, SourcePosition};
pub use signature::{Signature, SlotTypes};
pub use types::{TupleDef, TypeEntry, TypeKind};
pub use value::{Finalizer, FunctionRef, Object, ObjectRef, Place, Value};
