//! The evaluator's tree.
//!
//! A `Node` is one executable unit. Each variant carries its own children;
//! the evaluator is a single recursive `match` over variants, and control
//! constructs (`If`, `And`, `Or`, `While`) choose which children run.
//!
//! Node trees own their children outright. Values embedded in `Constant`
//! nodes keep referenced objects alive for as long as the tree lives.

mod format;

pub use format::{NodeFormatter, NodeStyle};

use crate::value::{FunctionRef, Value};
use mu_ir::{FunctionId, Name, TypeId};

/// Source position attached by a front end.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub file: Name,
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, Debug)]
pub enum Node {
    /// Literal value of type `ty`.
    Constant { ty: TypeId, value: Value },
    /// Direct call. Arguments are evaluated left to right unless the callee
    /// is a lazy native.
    Call {
        function: FunctionRef,
        args: Vec<Node>,
    },
    /// Virtual call: the override is chosen from the dynamic class of
    /// `args[0]`.
    CallMethod {
        function: FunctionId,
        args: Vec<Node>,
    },
    /// Call through slot `slot` of `interface`'s dispatch table for the
    /// dynamic class of `args[0]`.
    CallInterface {
        interface: TypeId,
        slot: usize,
        args: Vec<Node>,
    },
    /// Call of a function value.
    CallIndirect { callee: Box<Node>, args: Vec<Node> },
    /// Reference to a slot of the current frame. `ty` is the slot's value type.
    StackReference { slot: usize, ty: TypeId },
    StackValue { slot: usize, ty: TypeId },
    /// Reference to field `index` of an instance. `ty` is the field type.
    FieldReference {
        object: Box<Node>,
        index: usize,
        ty: TypeId,
    },
    FieldValue {
        object: Box<Node>,
        index: usize,
        ty: TypeId,
    },
    /// Store `value` through the reference `target` evaluates to.
    Assign { target: Box<Node>, value: Box<Node> },
    Dereference { reference: Box<Node>, ty: TypeId },
    /// Evaluates every node, yields the last.
    Sequence { nodes: Vec<Node>, ty: TypeId },
    If {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    While { condition: Box<Node>, body: Box<Node> },
    Return(Option<Box<Node>>),
    /// Allocate a zeroed instance of a frozen class.
    New { class: TypeId },
    DynamicCast { object: Box<Node>, target: TypeId },
    Annotated {
        node: Box<Node>,
        position: SourcePosition,
    },
    /// Placeholder left by a front end for a symbol not yet bound.
    Unresolved { name: Name },
    /// Partial application: `None` marks a parameter left open.
    Curry {
        function: FunctionRef,
        args: Vec<Option<Node>>,
        dynamic: bool,
    },
}

impl Node {
    pub fn constant(ty: TypeId, value: Value) -> Self {
        Node::Constant { ty, value }
    }

    pub fn int(value: i32) -> Self {
        Node::Constant {
            ty: TypeId::INT,
            value: Value::Int(value),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Node::Constant {
            ty: TypeId::BOOL,
            value: Value::Bool(value),
        }
    }

    pub fn call(function: FunctionId, args: Vec<Node>) -> Self {
        Node::Call {
            function: FunctionRef::Declared(function),
            args,
        }
    }

    pub fn stack_value(slot: usize, ty: TypeId) -> Self {
        Node::StackValue { slot, ty }
    }

    /// Child nodes in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Constant { .. }
            | Node::StackReference { .. }
            | Node::StackValue { .. }
            | Node::New { .. }
            | Node::Unresolved { .. }
            | Node::Return(None) => Vec::new(),
            Node::Call { args, .. }
            | Node::CallMethod { args, .. }
            | Node::CallInterface { args, .. } => args.iter().collect(),
            Node::CallIndirect { callee, args } => {
                std::iter::once(callee.as_ref()).chain(args).collect()
            }
            Node::FieldReference { object, .. }
            | Node::FieldValue { object, .. }
            | Node::DynamicCast { object, .. } => vec![object.as_ref()],
            Node::Assign { target, value } => vec![target.as_ref(), value.as_ref()],
            Node::Dereference { reference, .. } => vec![reference.as_ref()],
            Node::Sequence { nodes, .. } => nodes.iter().collect(),
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                let mut children = vec![condition.as_ref(), then.as_ref()];
                children.extend(otherwise.as_deref());
                children
            }
            Node::And(a, b) | Node::Or(a, b) => vec![a.as_ref(), b.as_ref()],
            Node::While { condition, body } => vec![condition.as_ref(), body.as_ref()],
            Node::Return(Some(value)) => vec![value.as_ref()],
            Node::Annotated { node, .. } => vec![node.as_ref()],
            Node::Curry { args, .. } => args.iter().flatten().collect(),
        }
    }

    /// Whether any node in the tree is an unresolved placeholder.
    pub fn has_unresolved(&self) -> bool {
        matches!(self, Node::Unresolved { .. })
            || self.children().into_iter().any(Node::has_unresolved)
    }
}

#[cfg(test)]
mod tests;
