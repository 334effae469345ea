use super::*;
use crate::context::Context;
use crate::member::Parameter;
use pretty_assertions::assert_eq;

fn params(ctx: &Context, names: &[&str]) -> Vec<Parameter> {
    names
        .iter()
        .map(|n| Parameter::typed(ctx.intern(n), TypeId::INT))
        .collect()
}

#[test]
fn test_arity_bounds() {
    let ctx = Context::new();
    let mut parameters = params(&ctx, &["a", "b", "c"]);
    parameters[2] = parameters[2].clone().with_default(Value::Int(0));
    let f = Function::new(
        ctx.intern("f"),
        Signature::from_types([TypeId::INT; 4]),
        parameters,
        FunctionBody::Abstract,
    );

    assert_eq!(f.num_args(), 3);
    assert_eq!(f.min_args(), 2);
    assert_eq!(f.max_args(), Some(3));
    assert!(!f.accepts(1));
    assert!(f.accepts(2));
    assert!(f.accepts(3));
    assert!(!f.accepts(4));
    assert_eq!(f.arity_text(), "2 to 3");
}

#[test]
fn test_unbounded_arity_text() {
    let ctx = Context::new();
    let mut f = Function::new(
        ctx.intern("print"),
        Signature::from_types([TypeId::VOID, TypeId::INT]),
        params(&ctx, &["x"]),
        FunctionBody::Abstract,
    );
    assert_eq!(f.arity_text(), "1");
    assert!(f.attributes.contains(FunctionAttributes::ABSTRACT));
    f.max_args = None;
    assert!(f.accepts(7));
    assert_eq!(f.arity_text(), "at least 1");
}

#[test]
fn test_free_variables_are_not_arguments() {
    let ctx = Context::new();
    let mut parameters = params(&ctx, &["x"]);
    parameters.push(Parameter::free(ctx.intern("k"), TypeId::INT, Value::Int(3)));
    let f = Function::new(
        ctx.intern("g"),
        Signature::from_types([TypeId::INT, TypeId::INT]),
        parameters,
        FunctionBody::Abstract,
    )
    .with_locals(2);

    assert_eq!(f.num_args(), 1);
    assert_eq!(f.num_free_variables(), 1);
    assert_eq!(f.max_args(), Some(1));
    assert_eq!(f.frame_size(), 4);
}

fn answer(_: &mut dyn NodeEvaluator, _: &Function, _: &[Value]) -> EvalResult {
    Ok(Value::Int(42))
}

#[test]
fn test_native_body_sets_attribute() {
    let ctx = Context::new();
    let f = Function::new(
        ctx.intern("answer"),
        Signature::from_types([TypeId::INT]),
        Vec::new(),
        FunctionBody::Native(NativeFn::Strict(answer)),
    )
    .with_attributes(FunctionAttributes::NO_SIDE_EFFECTS);

    assert!(f.attributes.contains(FunctionAttributes::NATIVE));
    assert!(f.attributes.contains(FunctionAttributes::NO_SIDE_EFFECTS));
    assert!(!f.is_abstract());
    assert!(!f.is_method());
    assert_eq!(f.return_type(), Some(TypeId::INT));
}

#[test]
fn test_arg_type_falls_back_to_parameter_storage() {
    let ctx = Context::new();
    let f = Function::new(
        ctx.intern("h"),
        Signature::from_types([TypeId::VOID]),
        vec![Parameter::typed(ctx.intern("d"), TypeId::DOUBLE)],
        FunctionBody::Abstract,
    );
    assert_eq!(f.arg_type(0), Some(TypeId::DOUBLE));
    assert_eq!(f.arg_type(1), None);
}
