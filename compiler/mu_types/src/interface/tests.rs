#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use crate::errors::FaultKind;
use crate::function::{Function, FunctionAttributes, FunctionBody};
use crate::member::Parameter;
use crate::node::Node;
use crate::signature::Signature;
use mu_ir::ScopeId;
use pretty_assertions::assert_eq;

/// Interface `Printable { int id(); int width() = 10; }`.
fn printable(ctx: &mut Context) -> (TypeId, FunctionId, FunctionId) {
    let printable = ctx.declare_interface(ScopeId::GLOBAL, "Printable");
    let scope = ctx.type_entry(printable).own_scope.unwrap();
    let this = ctx.intern("this");
    let id = Function::new(
        ctx.intern("id"),
        Signature::from_types([TypeId::INT, printable]),
        vec![Parameter::typed(this, printable)],
        FunctionBody::Abstract,
    );
    let width = Function::new(
        ctx.intern("width"),
        Signature::from_types([TypeId::INT, printable]),
        vec![Parameter::typed(this, printable)],
        FunctionBody::Nodes(Arc::new(Node::int(10))),
    );
    let id = ctx.declare_function(scope, id).unwrap();
    let width = ctx.declare_function(scope, width).unwrap();
    (printable, id, width)
}

fn class_with_id(ctx: &mut Context, name: &str) -> (TypeId, FunctionId) {
    let class = ctx.declare_class(ScopeId::GLOBAL, name, None).unwrap();
    let scope = ctx.type_entry(class).own_scope.unwrap();
    let this = ctx.intern("this");
    let f = Function::new(
        ctx.intern("id"),
        Signature::from_types([TypeId::INT, class]),
        vec![Parameter::typed(this, class)],
        FunctionBody::Nodes(Arc::new(Node::int(1))),
    )
    .with_attributes(FunctionAttributes::METHOD);
    let f = ctx.declare_function(scope, f).unwrap();
    (class, f)
}

#[test]
fn test_slots_follow_declaration_order() {
    let mut ctx = Context::new();
    let (printable, id, width) = printable(&mut ctx);
    assert_eq!(ctx.interface_def(printable).unwrap().num_functions(), 2);
    assert_eq!(ctx.function(id).interface_slot, Some(0));
    assert_eq!(ctx.function(width).interface_slot, Some(1));
    assert_eq!(ctx.function(width).owner, Some(printable));
    assert!(ctx.function(width).is_method());
    assert_eq!(ctx.interface_function(printable, 1), Some(width));
    assert_eq!(ctx.interface_function(printable, 2), None);
}

#[test]
fn test_default_body_fills_missing_slot() {
    let mut ctx = Context::new();
    let (printable, _, width) = printable(&mut ctx);
    let (doc, doc_id) = class_with_id(&mut ctx, "Doc");

    let table = ctx.construct(printable, doc).unwrap();
    assert_eq!(table.entries, vec![doc_id, width]);
    assert_eq!(table.entry(1), Some(width));
    assert_eq!(table.entry(2), None);
}

#[test]
fn test_abstract_slot_without_method_is_not_implemented() {
    let mut ctx = Context::new();
    let (printable, ..) = printable(&mut ctx);
    let empty = ctx.declare_class(ScopeId::GLOBAL, "Empty", None).unwrap();
    assert_eq!(ctx.construct(printable, empty), None);

    ctx.freeze(empty).unwrap();
    assert!(!ctx.implements(empty, printable));
    assert_eq!(ctx.implementation(empty, printable).unwrap(), None);
}

#[test]
fn test_implementation_is_memoized() {
    let mut ctx = Context::new();
    let (printable, ..) = printable(&mut ctx);
    let (doc, _) = class_with_id(&mut ctx, "Doc");
    ctx.freeze(doc).unwrap();

    let first = ctx.implementation(doc, printable).unwrap().unwrap();
    let second = ctx.implementation(doc, printable).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(ctx.implements(doc, printable));
}

#[test]
fn test_implementation_requires_frozen_class() {
    let mut ctx = Context::new();
    let (printable, ..) = printable(&mut ctx);
    let (doc, _) = class_with_id(&mut ctx, "Doc");
    let err = ctx.implementation(doc, printable).unwrap_err();
    assert!(matches!(err.kind, FaultKind::NotFrozen { .. }));
}

#[test]
fn test_interface_dispatch_through_dynamic_lookup() {
    let mut ctx = Context::new();
    let (_, id, width) = printable(&mut ctx);
    let (doc, doc_id) = class_with_id(&mut ctx, "Doc");
    ctx.freeze(doc).unwrap();

    assert_eq!(ctx.dynamic_lookup(doc, id).unwrap(), doc_id);
    assert_eq!(ctx.dynamic_lookup(doc, width).unwrap(), width);

    let bare = ctx.declare_class(ScopeId::GLOBAL, "Bare", None).unwrap();
    ctx.freeze(bare).unwrap();
    let err = ctx.dynamic_lookup(bare, id).unwrap_err();
    assert!(matches!(err.kind, FaultKind::BadInterfaceInvocation { .. }));
}
