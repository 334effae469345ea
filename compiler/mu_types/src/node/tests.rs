#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use crate::context::Context;
use crate::function::{Function, FunctionBody};
use crate::member::Parameter;
use crate::signature::Signature;
use mu_ir::ScopeId;
use pretty_assertions::assert_eq;

fn with_add() -> (Context, FunctionId) {
    let mut ctx = Context::new();
    let math = ctx.declare_namespace(ScopeId::GLOBAL, "math");
    let add = Function::new(
        ctx.intern("add"),
        Signature::from_types([TypeId::INT; 3]),
        vec![
            Parameter::typed(ctx.intern("a"), TypeId::INT),
            Parameter::typed(ctx.intern("b"), TypeId::INT),
        ],
        FunctionBody::Abstract,
    );
    let id = ctx.declare_function(math, add).unwrap();
    (ctx, id)
}

#[test]
fn test_tree_format() {
    let (ctx, add) = with_add();
    let node = Node::call(add, vec![Node::int(1), Node::stack_value(0, TypeId::INT)]);
    let text = NodeFormatter::new(&ctx, NodeStyle::Tree).format(&node);
    assert_eq!(
        text,
        "(call math.add\n  (constant 1 : int)\n  (stack 0 : int))"
    );
}

#[test]
fn test_lisp_format() {
    let (ctx, add) = with_add();
    let node = Node::Sequence {
        nodes: vec![
            Node::Assign {
                target: Box::new(Node::StackReference {
                    slot: 1,
                    ty: TypeId::INT,
                }),
                value: Box::new(Node::call(add, vec![Node::int(2), Node::int(3)])),
            },
            Node::stack_value(1, TypeId::INT),
        ],
        ty: TypeId::INT,
    };
    let text = NodeFormatter::new(&ctx, NodeStyle::Lisp).format(&node);
    assert_eq!(text, "(begin (= &$1 (math.add 2 3)) $1)");
}

#[test]
fn test_curry_marks_open_arguments() {
    let (ctx, add) = with_add();
    let node = Node::Curry {
        function: FunctionRef::Declared(add),
        args: vec![Some(Node::int(5)), None],
        dynamic: false,
    };
    assert_eq!(
        NodeFormatter::new(&ctx, NodeStyle::Lisp).format(&node),
        "(curry math.add 5 _)"
    );
    assert_eq!(
        NodeFormatter::new(&ctx, NodeStyle::Tree).format(&node),
        "(curry math.add\n  (constant 5 : int)\n  _)"
    );
}

#[test]
fn test_unresolved_placeholders() {
    let ctx = Context::new();
    let node = Node::If {
        condition: Box::new(Node::boolean(true)),
        then: Box::new(Node::Unresolved {
            name: ctx.intern("missing"),
        }),
        otherwise: None,
    };
    assert!(node.has_unresolved());
    assert!(!Node::int(1).has_unresolved());
    assert_eq!(
        NodeFormatter::new(&ctx, NodeStyle::Lisp).format(&node),
        "(if true *unresolved*:missing)"
    );
}

#[test]
fn test_children_in_evaluation_order() {
    let node = Node::While {
        condition: Box::new(Node::boolean(false)),
        body: Box::new(Node::Return(Some(Box::new(Node::int(7))))),
    };
    let children = node.children();
    assert_eq!(children.len(), 2);
    assert!(matches!(children[0], Node::Constant { .. }));
    assert!(matches!(children[1], Node::Return(Some(_))));
    assert!(Node::Return(None).children().is_empty());
}
