//! Mu IR - names, handles, and machine representations.
//!
//! The leaf crate of the Mu runtime:
//! - `Name` handles produced by the sharded `StringInterner`
//! - `TypeId`, `FunctionId`, `ScopeId` handles into the symbol table
//! - `MachineRep`, the size/alignment descriptor of a stored value
//!
//! Everything here is `Copy` and compares by handle, never by content.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-copied handles.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod ids;
mod interner;
mod machine_rep;
mod name;

pub use ids::{FunctionId, ScopeId, TypeId};
pub use interner::{split_qualified, InternError, SharedInterner, StringInterner, WellKnownNames};
pub use machine_rep::{align_up, MachineRep};
pub use name::Name;

static_assert_size!(Name, 4);
static_assert_size!(TypeId, 4);
static_assert_size!(FunctionId, 4);
static_assert_size!(ScopeId, 4);
