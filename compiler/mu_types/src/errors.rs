//! Faults raised by declaration, freezing, resolution, and evaluation.
//!
//! # Categories
//!
//! Every `FaultKind` belongs to one `FaultCategory`:
//! - **Structural**: declarations that cannot be made consistent
//!   (mixed signatures, ambiguous or unresolved names, missing interfaces).
//! - **Evaluation**: failures while walking a node tree (nil receivers,
//!   bad casts, range errors, stack and heap exhaustion).
//! - **Container**: misuse of a `DynamicArray`.
//!
//! Factory functions (`Fault::ambiguous_symbol(..)`, ...) are the public
//! construction API. A host catches faults at one evaluation boundary; none
//! of them leaves a half-built object reachable.

use crate::value::Value;
use std::fmt;

/// Result of evaluating a node.
pub type EvalResult = Result<Value, ControlAction>;

/// Broad grouping of faults.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    Structural,
    Evaluation,
    Container,
}

/// Typed fault. The `Display` text is the user-facing message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FaultKind {
    // Structural
    #[error("inconsistent signature: {detail}")]
    InconsistentSignature { detail: String },
    #[error("ambiguous symbol `{name}`: {candidates} visible types share this name")]
    AmbiguousSymbol { name: String, candidates: usize },
    #[error("unresolved symbol `{name}`")]
    UnresolvedSymbol { name: String },
    #[error("class `{class}` does not implement interface `{interface}`")]
    BadInterfaceInvocation { class: String, interface: String },
    #[error("cannot freeze `{class}`: member `{member}` has unresolved type `{type_name}`")]
    UnresolvedMember {
        class: String,
        member: String,
        type_name: String,
    },
    #[error("class `{class}` is frozen and cannot be modified")]
    ClassFrozen { class: String },
    #[error("class `{class}` must be frozen first")]
    NotFrozen { class: String },
    #[error("`{name}` is not a class")]
    NotAClass { name: String },
    #[error("`{name}` is not an interface")]
    NotAnInterface { name: String },
    #[error("malformed declaration of `{name}`: {detail}")]
    BadRegistration { name: String, detail: String },
    #[error("cannot partially apply `{function}`: {detail}")]
    BadPartialApplication { function: String, detail: String },

    // Evaluation
    #[error("nil argument to `{function}`")]
    NilArgument { function: String },
    #[error("bad cast from `{from}` to `{to}`")]
    BadCast { from: String, to: String },
    #[error("bad internal array call: {detail}")]
    BadInternalArrayCall { detail: String },
    #[error("index {index} out of range for size {size}")]
    OutOfRange { index: i64, size: usize },
    #[error("reference to stack slot {slot} outlived its activation")]
    StaleReference { slot: usize },
    #[error("out of stack space: call depth limit {depth} reached")]
    OutOfStackSpace { depth: usize },
    #[error("out of heap memory: {requested} bytes requested with {live} live (limit {limit})")]
    OutOfHeapMemory {
        requested: usize,
        live: usize,
        limit: usize,
    },
    #[error("`{function}` expects {expected} arguments, got {got}")]
    ArityMismatch {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("type mismatch: expected `{expected}`, got `{got}`")]
    TypeMismatch { expected: String, got: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("`{function}` is abstract and has no body")]
    AbstractCall { function: String },
    #[error("evaluated unresolved node `{name}`")]
    UnresolvedNode { name: String },
    #[error("{message}")]
    Program { message: String },

    // Container
    #[error("wrong dimensionality: array has rank {rank}, got {requested} dimensions")]
    WrongDimensionality { rank: usize, requested: usize },
    #[error("erase of {count} elements at {start} exceeds size {size}")]
    EraseOutOfBounds {
        start: usize,
        count: usize,
        size: usize,
    },
}

impl FaultKind {
    pub fn category(&self) -> FaultCategory {
        match self {
            FaultKind::InconsistentSignature { .. }
            | FaultKind::AmbiguousSymbol { .. }
            | FaultKind::UnresolvedSymbol { .. }
            | FaultKind::BadInterfaceInvocation { .. }
            | FaultKind::UnresolvedMember { .. }
            | FaultKind::ClassFrozen { .. }
            | FaultKind::NotFrozen { .. }
            | FaultKind::NotAClass { .. }
            | FaultKind::NotAnInterface { .. }
            | FaultKind::BadRegistration { .. }
            | FaultKind::BadPartialApplication { .. } => FaultCategory::Structural,
            FaultKind::WrongDimensionality { .. } | FaultKind::EraseOutOfBounds { .. } => {
                FaultCategory::Container
            }
            _ => FaultCategory::Evaluation,
        }
    }
}

/// One frame of a captured call chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    pub name: String,
}

/// Snapshot of the active call chain at a fault, most recent call first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<BacktraceFrame>,
}

impl Backtrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {}", frame.name)?;
        }
        Ok(())
    }
}

/// A raised fault: its kind plus whatever context was gathered on the way up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    /// Call chain at the fault site, attached by the evaluator.
    pub backtrace: Option<Backtrace>,
    /// Secondary context, outermost last.
    pub notes: Vec<String>,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    pub fn category(&self) -> FaultCategory {
        self.kind.category()
    }

    /// Attach a backtrace unless one is already present.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        if self.backtrace.is_none() && !backtrace.is_empty() {
            self.backtrace = Some(backtrace);
        }
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn inconsistent_signature(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::InconsistentSignature {
            detail: detail.into(),
        })
    }

    pub fn ambiguous_symbol(name: impl Into<String>, candidates: usize) -> Self {
        Self::new(FaultKind::AmbiguousSymbol {
            name: name.into(),
            candidates,
        })
    }

    pub fn unresolved_symbol(name: impl Into<String>) -> Self {
        Self::new(FaultKind::UnresolvedSymbol { name: name.into() })
    }

    pub fn bad_interface_invocation(class: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::new(FaultKind::BadInterfaceInvocation {
            class: class.into(),
            interface: interface.into(),
        })
    }

    pub fn unresolved_member(
        class: impl Into<String>,
        member: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::new(FaultKind::UnresolvedMember {
            class: class.into(),
            member: member.into(),
            type_name: type_name.into(),
        })
    }

    pub fn class_frozen(class: impl Into<String>) -> Self {
        Self::new(FaultKind::ClassFrozen {
            class: class.into(),
        })
    }

    pub fn not_frozen(class: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFrozen {
            class: class.into(),
        })
    }

    pub fn not_a_class(name: impl Into<String>) -> Self {
        Self::new(FaultKind::NotAClass { name: name.into() })
    }

    pub fn not_an_interface(name: impl Into<String>) -> Self {
        Self::new(FaultKind::NotAnInterface { name: name.into() })
    }

    pub fn bad_registration(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FaultKind::BadRegistration {
            name: name.into(),
            detail: detail.into(),
        })
    }

    pub fn bad_partial_application(function: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FaultKind::BadPartialApplication {
            function: function.into(),
            detail: detail.into(),
        })
    }

    pub fn nil_argument(function: impl Into<String>) -> Self {
        Self::new(FaultKind::NilArgument {
            function: function.into(),
        })
    }

    pub fn bad_cast(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(FaultKind::BadCast {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn bad_internal_array_call(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::BadInternalArrayCall {
            detail: detail.into(),
        })
    }

    pub fn out_of_range(index: i64, size: usize) -> Self {
        Self::new(FaultKind::OutOfRange { index, size })
    }

    /// Out-of-range fault for a `usize` index.
    pub fn index_out_of_range(index: usize, size: usize) -> Self {
        Self::out_of_range(i64::try_from(index).unwrap_or(i64::MAX), size)
    }

    pub fn stale_reference(slot: usize) -> Self {
        Self::new(FaultKind::StaleReference { slot })
    }

    pub fn out_of_stack_space(depth: usize) -> Self {
        Self::new(FaultKind::OutOfStackSpace { depth })
    }

    pub fn out_of_heap_memory(requested: usize, live: usize, limit: usize) -> Self {
        Self::new(FaultKind::OutOfHeapMemory {
            requested,
            live,
            limit,
        })
    }

    pub fn arity_mismatch(function: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::new(FaultKind::ArityMismatch {
            function: function.into(),
            expected: expected.into(),
            got,
        })
    }

    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::new(FaultKind::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        })
    }

    pub fn division_by_zero() -> Self {
        Self::new(FaultKind::DivisionByZero)
    }

    pub fn abstract_call(function: impl Into<String>) -> Self {
        Self::new(FaultKind::AbstractCall {
            function: function.into(),
        })
    }

    pub fn unresolved_node(name: impl Into<String>) -> Self {
        Self::new(FaultKind::UnresolvedNode { name: name.into() })
    }

    /// Fault raised by script code itself.
    pub fn program(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Program {
            message: message.into(),
        })
    }

    pub fn wrong_dimensionality(rank: usize, requested: usize) -> Self {
        Self::new(FaultKind::WrongDimensionality { rank, requested })
    }

    pub fn erase_out_of_bounds(start: usize, count: usize, size: usize) -> Self {
        Self::new(FaultKind::EraseOutOfBounds { start, count, size })
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n{backtrace}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Why evaluation of a node stopped early.
///
/// `Return` is control flow, not an error: the enclosing activation turns
/// it back into a value. Only `Fault` crosses the evaluation boundary.
#[derive(Clone, Debug)]
pub enum ControlAction {
    Fault(Fault),
    Return(Value),
}

impl ControlAction {
    /// Convert a stray `Return` into its value, keeping faults.
    pub fn into_result(self) -> Result<Value, Fault> {
        match self {
            ControlAction::Fault(fault) => Err(fault),
            ControlAction::Return(value) => Ok(value),
        }
    }

    /// Apply `f` to a fault, passing control flow through untouched.
    #[must_use]
    pub fn map_fault(self, f: impl FnOnce(Fault) -> Fault) -> Self {
        match self {
            ControlAction::Fault(fault) => ControlAction::Fault(f(fault)),
            other @ ControlAction::Return(_) => other,
        }
    }
}

impl From<Fault> for ControlAction {
    fn from(fault: Fault) -> Self {
        ControlAction::Fault(fault)
    }
}
