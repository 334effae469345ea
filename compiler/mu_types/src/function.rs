//! Callable symbols.
//!
//! A `Function` pairs a [`Signature`] with its parameters and a body. The
//! body is abstract (an interface slot without a default), native, or a
//! node tree evaluated in a fresh stack frame.

use crate::errors::EvalResult;
use crate::executor::NodeEvaluator;
use crate::member::Parameter;
use crate::node::Node;
use crate::signature::Signature;
use crate::value::Value;
use bitflags::bitflags;
use mu_ir::{Name, ScopeId, TypeId};
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Declaration attributes of a function.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct FunctionAttributes: u32 {
        /// Applies element-wise over containers.
        const MAPPED = 1 << 0;
        const OPERATOR = 1 << 1;
        /// Operator whose left operand is the receiver.
        const MEMBER_OPERATOR = 1 << 2;
        const CAST = 1 << 3;
        /// Cast that may lose information.
        const LOSSY = 1 << 4;
        const COMMUTATIVE = 1 << 5;
        const NATIVE = 1 << 6;
        /// Result holds on to an argument.
        const RETAINING = 1 << 7;
        const LAMBDA = 1 << 8;
        const NO_SIDE_EFFECTS = 1 << 9;
        /// Side effects depend on the arguments.
        const DEPENDENT_SIDE_EFFECTS = 1 << 10;
        const DYNAMIC_ACTIVATION = 1 << 11;
        const HIDDEN_ARGUMENT = 1 << 12;
        /// Built by the runtime rather than declared.
        const GENERATED = 1 << 13;
        /// Member function; parameter 0 is `this`.
        const METHOD = 1 << 14;
        /// No body; must be bound through a dispatch table.
        const ABSTRACT = 1 << 15;
    }
}

/// Native entry point receiving evaluated arguments.
pub type StrictNative = fn(&mut dyn NodeEvaluator, &Function, &[Value]) -> EvalResult;

/// Native entry point receiving unevaluated argument nodes.
///
/// The native decides which arguments to evaluate and in what order.
pub type LazyNative = fn(&mut dyn NodeEvaluator, &Function, &[Node]) -> EvalResult;

#[derive(Copy, Clone)]
pub enum NativeFn {
    Strict(StrictNative),
    Lazy(LazyNative),
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeFn::Strict(_) => f.write_str("NativeFn::Strict"),
            NativeFn::Lazy(_) => f.write_str("NativeFn::Lazy"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum FunctionBody {
    /// Interface slot with no default implementation.
    Abstract,
    Native(NativeFn),
    Nodes(Arc<Node>),
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Name,
    /// Scope the function is declared in.
    pub scope: ScopeId,
    pub signature: Signature,
    pub attributes: FunctionAttributes,
    pub parameters: Vec<Parameter>,
    pub body: FunctionBody,
    /// Upper bound on visible arguments, `None` when unbounded.
    pub max_args: Option<usize>,
    /// Class or interface the function is a member of.
    pub owner: Option<TypeId>,
    /// Dense slot index when the owner is an interface.
    pub interface_slot: Option<usize>,
    /// Stack slots for locals beyond the parameters.
    pub locals: usize,
}

impl Function {
    pub fn new(name: Name, signature: Signature, parameters: Vec<Parameter>, body: FunctionBody) -> Self {
        let max_args = Some(parameters.iter().filter(|p| !p.free).count());
        let attributes = match body {
            FunctionBody::Native(_) => FunctionAttributes::NATIVE,
            FunctionBody::Abstract => FunctionAttributes::ABSTRACT,
            FunctionBody::Nodes(_) => FunctionAttributes::empty(),
        };
        Self {
            name,
            scope: ScopeId::GLOBAL,
            signature,
            attributes,
            parameters,
            body,
            max_args,
            owner: None,
            interface_slot: None,
            locals: 0,
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: FunctionAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    #[must_use]
    pub fn with_locals(mut self, locals: usize) -> Self {
        self.locals = locals;
        self
    }

    /// Number of visible (caller-supplied) parameters.
    pub fn num_args(&self) -> usize {
        self.parameters.iter().filter(|p| !p.free).count()
    }

    pub fn num_free_variables(&self) -> usize {
        self.parameters.iter().filter(|p| p.free).count()
    }

    /// Leading visible parameters without a default.
    pub fn min_args(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.free)
            .take_while(|p| p.default.is_none())
            .count()
    }

    pub fn max_args(&self) -> Option<usize> {
        self.max_args
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args() && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity for fault messages.
    pub fn arity_text(&self) -> String {
        match (self.min_args(), self.max_args) {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }

    pub fn is_method(&self) -> bool {
        self.attributes.contains(FunctionAttributes::METHOD)
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.body, FunctionBody::Abstract)
    }

    pub fn return_type(&self) -> Option<TypeId> {
        self.signature.return_type()
    }

    /// Resolved type of argument `index`, falling back to the parameter's
    /// own storage when the signature is shorter.
    pub fn arg_type(&self, index: usize) -> Option<TypeId> {
        self.signature
            .arg_types()
            .and_then(|args| args.get(index).copied())
            .or_else(|| self.parameters.get(index).and_then(|p| p.storage.resolved()))
    }

    /// Stack slots needed by one activation.
    pub fn frame_size(&self) -> usize {
        self.parameters.len() + self.locals
    }
}

#[cfg(test)]
mod tests;
