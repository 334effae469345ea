#![allow(
    clippy::result_large_err,
    reason = "natives and the evaluator return Fault by value like the rest of the runtime"
)]
//! Mu Eval - the tree-walking evaluator for the Mu runtime.
//!
//! # Architecture
//!
//! - `Thread`: walks node trees against a shared `Context`, owns the value
//!   stack and call stack, and is the catch boundary for faults
//! - `PartialApplicator`: synthesizes closures by binding some parameters
//! - `Registrar`: the keyword-list registration API for natives and classes
//! - `load_primitives` / `install_array_natives`: the base native library
//!
//! Natives see the thread only through `mu_types::NodeEvaluator`.

pub mod diagnostics;
mod eval_mode;
mod partial;
mod registration;
mod stack;
mod thread;

pub use diagnostics::{CallFrame, CallStack};
pub use eval_mode::{EvalConfig, EvalMode};
pub use partial::PartialApplicator;
pub use registration::{
    install_all_array_natives, install_array_natives, load_primitives, FunctionDecl, Keyword,
    Registrar,
};
pub use stack::ensure_sufficient_stack;
pub use thread::{Thread, ThreadBuilder};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset; later calls are no-ops. Calls and
/// virtual dispatch log at `trace`, closures and registration at `debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
