//! Native stack headroom for node recursion.
//!
//! Every nested node and every call recurses on the native stack, so a deep
//! Mu program would overflow it long before the call-depth limit trips.
//! Each node evaluation first makes sure some headroom is left.

/// Headroom that must remain before evaluating another node.
#[cfg(not(target_arch = "wasm32"))]
const MIN_HEADROOM: usize = 128 * 1024;

/// Size of each new stack segment once the headroom is gone.
#[cfg(not(target_arch = "wasm32"))]
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if headroom is low.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(MIN_HEADROOM, SEGMENT_SIZE, f)
}

/// WASM cannot switch stacks; `EvalMode::Interpret` caps the depth instead.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
