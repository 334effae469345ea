#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use mu_types::FaultKind;
use pretty_assertions::assert_eq;

fn frame(interner: &StringInterner, name: &str) -> CallFrame {
    CallFrame {
        name: interner.intern(name),
    }
}

#[test]
fn test_push_and_pop() {
    let interner = StringInterner::new();
    let mut stack = CallStack::new(Some(100));
    assert!(stack.is_empty());
    stack.push(frame(&interner, "main")).unwrap();
    assert_eq!(stack.depth(), 1);
    stack.pop();
    assert!(stack.is_empty());
}

#[test]
fn test_depth_limit_enforced() {
    let interner = StringInterner::new();
    let mut stack = CallStack::new(Some(3));
    for _ in 0..3 {
        stack.push(frame(&interner, "recurse")).unwrap();
    }
    let err = stack.push(frame(&interner, "recurse")).unwrap_err();
    assert_eq!(err.kind, FaultKind::OutOfStackSpace { depth: 3 });
    assert_eq!(stack.depth(), 3);
}

#[test]
fn test_unlimited_depth() {
    let interner = StringInterner::new();
    let mut stack = CallStack::default();
    for _ in 0..1000 {
        stack.push(frame(&interner, "deep")).unwrap();
    }
    assert_eq!(stack.depth(), 1000);
    assert_eq!(stack.max_depth(), None);
    stack.truncate(10);
    assert_eq!(stack.depth(), 10);
}

#[test]
fn test_capture_most_recent_first() {
    let interner = StringInterner::new();
    let mut stack = CallStack::new(None);
    for name in ["outer", "middle", "inner"] {
        stack.push(frame(&interner, name)).unwrap();
    }
    let backtrace = stack.capture(&interner);
    let names: Vec<&str> = backtrace.frames().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["inner", "middle", "outer"]);
    assert_eq!(
        backtrace.to_string(),
        "stack backtrace:\n  0: inner\n  1: middle\n  2: outer\n"
    );
}

#[test]
fn test_attach_keeps_innermost_backtrace() {
    let interner = StringInterner::new();
    let mut stack = CallStack::new(None);
    stack.push(frame(&interner, "outer")).unwrap();
    stack.push(frame(&interner, "inner")).unwrap();
    let fault = stack.attach_backtrace(Fault::division_by_zero(), &interner);
    stack.pop();
    let fault = stack.attach_backtrace(fault, &interner);
    assert_eq!(fault.backtrace.map(|b| b.len()), Some(2));
}

#[test]
fn test_attach_on_empty_stack_is_noop() {
    let interner = StringInterner::new();
    let stack = CallStack::new(None);
    let fault = stack.attach_backtrace(Fault::division_by_zero(), &interner);
    assert!(fault.backtrace.is_none());
}
