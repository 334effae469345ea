#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use crate::thread::{Thread, ThreadBuilder};
use mu_types::{
    Collector, FaultKind, FunctionRef, Node, ObjectRef, RefCountedCollector, TypeKind,
};
use std::sync::Arc;
use pretty_assertions::assert_eq;

fn bad_registration(name: &str, detail: &str) -> FaultKind {
    FaultKind::BadRegistration {
        name: name.to_owned(),
        detail: detail.to_owned(),
    }
}

fn noop(
    _: &mut dyn mu_types::NodeEvaluator,
    _: &Function,
    _: &[Value],
) -> mu_types::EvalResult {
    Ok(Value::Void)
}

// Keyword parsing

#[test]
fn test_parse_full_list() {
    let decl = FunctionDecl::parse(
        "clamp",
        &[
            Keyword::Return("int"),
            Keyword::Args(&["int", "int", "int"]),
            Keyword::Parameters(&["value", "low", "high"]),
            Keyword::Optional(&[Value::Int(0), Value::Int(100)]),
            Keyword::End,
        ],
    )
    .unwrap();
    assert_eq!(decl.return_type, Some("int"));
    assert_eq!(decl.args.as_slice(), &["int", "int", "int"]);
    assert_eq!(decl.defaults, vec![Value::Int(0), Value::Int(100)]);
    assert_eq!(decl.maximum, None);
}

#[test]
fn test_parse_requires_end() {
    let fault = FunctionDecl::parse("f", &[Keyword::Return("int")]).unwrap_err();
    assert_eq!(fault.kind, bad_registration("f", "keyword list must finish with `End`"));
}

#[test]
fn test_parse_rejects_out_of_order_and_repeats() {
    let fault = FunctionDecl::parse(
        "f",
        &[Keyword::Args(&["int"]), Keyword::Return("int"), Keyword::End],
    )
    .unwrap_err();
    assert_eq!(fault.kind, bad_registration("f", "`Return` is out of order or repeated"));

    let fault = FunctionDecl::parse(
        "f",
        &[Keyword::Args(&["int"]), Keyword::Args(&["int"]), Keyword::End],
    )
    .unwrap_err();
    assert_eq!(fault.kind, bad_registration("f", "`Args` is out of order or repeated"));
}

#[test]
fn test_parse_checks_counts() {
    let names = FunctionDecl::parse(
        "f",
        &[Keyword::Args(&["int", "int"]), Keyword::Parameters(&["a"]), Keyword::End],
    )
    .unwrap_err();
    assert_eq!(names.kind, bad_registration("f", "1 parameter names for 2 arguments"));

    let defaults = FunctionDecl::parse(
        "f",
        &[
            Keyword::Args(&["int"]),
            Keyword::Optional(&[Value::Int(1), Value::Int(2)]),
            Keyword::End,
        ],
    )
    .unwrap_err();
    assert_eq!(defaults.kind, bad_registration("f", "2 defaults for 1 arguments"));

    let maximum = FunctionDecl::parse(
        "f",
        &[Keyword::Args(&["int", "int"]), Keyword::Maximum(Some(1)), Keyword::End],
    )
    .unwrap_err();
    assert_eq!(
        maximum.kind,
        bad_registration("f", "maximum of 1 is below the 2 declared arguments")
    );
}

// Registrar

#[test]
fn test_function_defaults_and_names() {
    let mut ctx = Context::new();
    let mut registrar = Registrar::new(&mut ctx);
    let fault = registrar
        .function(
            ScopeId::GLOBAL,
            "clamp",
            NativeFn::Strict(noop),
            &[
                Keyword::Return("int"),
                Keyword::Args(&["int", "int", "int"]),
                Keyword::Parameters(&["value", "low"]),
                Keyword::End,
            ],
        )
        .unwrap_err();
    assert!(matches!(fault.kind, FaultKind::BadRegistration { .. }));

    let id = registrar
        .function(
            ScopeId::GLOBAL,
            "clamp",
            NativeFn::Strict(noop),
            &[
                Keyword::Return("int"),
                Keyword::Args(&["int", "int"]),
                Keyword::Optional(&[Value::Int(9)]),
                Keyword::End,
            ],
        )
        .unwrap();
    let function = ctx.function(id);
    assert_eq!(function.min_args(), 1);
    assert_eq!(function.max_args(), Some(2));
    assert_eq!(ctx.interner().lookup(function.parameters[1].name), "_1");
    assert_eq!(function.parameters[1].default, Some(Value::Int(9)));
    assert!(function.signature.is_resolved());
    assert!(function.attributes.contains(FunctionAttributes::NATIVE));
}

#[test]
fn test_forward_reference_resolves_later() {
    let mut ctx = Context::new();
    let id = Registrar::new(&mut ctx)
        .function(
            ScopeId::GLOBAL,
            "length",
            NativeFn::Strict(noop),
            &[Keyword::Return("double"), Keyword::Args(&["Vec3"]), Keyword::End],
        )
        .unwrap();
    assert!(!ctx.function(id).signature.is_resolved());
    assert_eq!(ctx.describe_function(id), "double length(*unresolved*:Vec3 _0)");

    let vec3 = ctx.declare_class(ScopeId::GLOBAL, "Vec3", None).unwrap();
    ctx.resolve_all().unwrap();
    let function = ctx.function(id);
    assert_eq!(function.signature.types().unwrap(), &[TypeId::DOUBLE, vec3]);
    assert_eq!(function.parameters[0].storage, StorageRef::Resolved(vec3));
}

#[test]
fn test_parameters_and_signature_resolve_names_alike() {
    let mut ctx = Context::new();
    let geo = ctx.declare_namespace(ScopeId::GLOBAL, "geo");
    let point = ctx.declare_class(ScopeId::GLOBAL, "Point", None).unwrap();
    let geo_point = ctx.declare_class(geo, "Point", None).unwrap();

    let mut registrar = Registrar::new(&mut ctx);
    let plain = registrar
        .function(
            geo,
            "take",
            NativeFn::Strict(noop),
            &[Keyword::Args(&["Point"]), Keyword::End],
        )
        .unwrap();
    let qualified = registrar
        .function(
            geo,
            "take_local",
            NativeFn::Strict(noop),
            &[Keyword::Args(&["geo.Point"]), Keyword::End],
        )
        .unwrap();

    for (id, expected) in [(plain, point), (qualified, geo_point)] {
        let function = ctx.function(id);
        assert_eq!(function.signature.types().unwrap(), &[TypeId::VOID, expected]);
        assert_eq!(function.parameters[0].storage, StorageRef::Resolved(expected));
    }
}

#[test]
fn test_forward_parameters_resolve_from_global_scope() {
    let mut ctx = Context::new();
    let geo = ctx.declare_namespace(ScopeId::GLOBAL, "geo");
    let id = Registrar::new(&mut ctx)
        .function(
            geo,
            "area",
            NativeFn::Strict(noop),
            &[Keyword::Args(&["Shape"]), Keyword::End],
        )
        .unwrap();
    let shape = ctx.declare_class(ScopeId::GLOBAL, "Shape", None).unwrap();
    ctx.declare_class(geo, "Shape", None).unwrap();

    ctx.resolve_all().unwrap();
    let function = ctx.function(id);
    assert_eq!(function.signature.types().unwrap(), &[TypeId::VOID, shape]);
    assert_eq!(function.parameters[0].storage, StorageRef::Resolved(shape));
}

#[test]
fn test_method_prepends_receiver() {
    let mut ctx = Context::new();
    let mut registrar = Registrar::new(&mut ctx);
    let point = registrar.class(ScopeId::GLOBAL, "Point", None).unwrap();
    let id = registrar
        .method(
            point,
            "scale",
            NativeFn::Strict(noop),
            &[Keyword::Args(&["double"]), Keyword::Maximum(Some(1)), Keyword::End],
        )
        .unwrap();

    let function = ctx.function(id);
    assert!(function.is_method());
    assert_eq!(function.owner, Some(point));
    assert_eq!(function.max_args(), Some(2));
    assert_eq!(function.parameters[0].storage, StorageRef::Resolved(point));
    assert_eq!(
        function.signature.types().unwrap(),
        &[TypeId::VOID, point, TypeId::DOUBLE]
    );
    assert_eq!(ctx.type_entry(point).class_def().unwrap().methods, vec![id]);
}

#[test]
fn test_class_names_superclass() {
    let mut ctx = Context::new();
    let mut registrar = Registrar::new(&mut ctx);
    let base = registrar.class(ScopeId::GLOBAL, "Base", None).unwrap();
    let derived = registrar
        .class(ScopeId::GLOBAL, "Derived", Some("Base"))
        .unwrap();
    let fault = registrar
        .class(ScopeId::GLOBAL, "Orphan", Some("Missing"))
        .unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::UnresolvedSymbol {
            name: "Missing".to_owned()
        }
    );
    assert!(ctx.is_a(derived, base));
}

#[test]
fn test_member_forward_reference_then_freeze() {
    let mut ctx = Context::new();
    let mut registrar = Registrar::new(&mut ctx);
    let node = registrar.class(ScopeId::GLOBAL, "ListNode", None).unwrap();
    registrar.member(node, "value", "int").unwrap();
    registrar.member(node, "next", "ListNode").unwrap();
    registrar.member(node, "owner", "List").unwrap();
    let list = registrar.class(ScopeId::GLOBAL, "List", None).unwrap();

    ctx.resolve_all().unwrap();
    ctx.freeze_all().unwrap();
    assert_eq!(ctx.field_type(node, 1).unwrap(), node);
    assert_eq!(ctx.field_type(node, 2).unwrap(), list);
}

#[test]
fn test_interface_function_is_abstract_slot() {
    let mut ctx = Context::new();
    let mut registrar = Registrar::new(&mut ctx);
    let shape = registrar.interface(ScopeId::GLOBAL, "Shape");
    let id = registrar
        .interface_function(shape, "area", &[Keyword::Return("double"), Keyword::End])
        .unwrap();
    let not_interface = registrar
        .interface_function(TypeId::INT, "area", &[Keyword::End])
        .unwrap_err();
    assert!(matches!(not_interface.kind, FaultKind::NotAnInterface { .. }));

    let function = ctx.function(id);
    assert!(function.is_abstract());
    assert_eq!(function.interface_slot, Some(0));
    assert_eq!(ctx.interface_function(shape, 0), Some(id));
}

// Primitive natives

fn primitives() -> Context {
    let mut ctx = Context::new();
    load_primitives(&mut ctx).unwrap();
    ctx
}

fn overload(ctx: &Context, name: &str, args: &[TypeId]) -> FunctionRef {
    FunctionRef::Declared(ctx.find_overload(ScopeId::GLOBAL, name, args).unwrap())
}

#[test]
fn test_integer_arithmetic_wraps_to_width() {
    let ctx = primitives();
    let mut thread = Thread::new(&ctx);
    let add_int = overload(&ctx, "+", &[TypeId::INT, TypeId::INT]);
    let add_byte = overload(&ctx, "+", &[TypeId::BYTE, TypeId::BYTE]);

    let wrapped = thread
        .run(&add_int, vec![Value::Int(i32::MAX), Value::Int(1)])
        .unwrap();
    assert_eq!(wrapped, Value::Int(i32::MIN));
    let byte = thread
        .run(&add_byte, vec![Value::Byte(200), Value::Byte(100)])
        .unwrap();
    assert_eq!(byte, Value::Byte(44));
}

#[test]
fn test_float_division_and_integer_division_by_zero() {
    let ctx = primitives();
    let mut thread = Thread::new(&ctx);
    let div_double = overload(&ctx, "/", &[TypeId::DOUBLE, TypeId::DOUBLE]);
    let div_int64 = overload(&ctx, "/", &[TypeId::INT64, TypeId::INT64]);

    let value = thread
        .run(&div_double, vec![Value::Double(1.0), Value::Double(4.0)])
        .unwrap();
    assert_eq!(value, Value::Double(0.25));
    let fault = thread
        .run(&div_int64, vec![Value::Int64(1), Value::Int64(0)])
        .unwrap_err();
    assert_eq!(fault.kind, FaultKind::DivisionByZero);
}

#[test]
fn test_comparisons() {
    let ctx = primitives();
    let mut thread = Thread::new(&ctx);
    let lt = overload(&ctx, "<", &[TypeId::INT, TypeId::INT]);
    let eq = overload(&ctx, "==", &[TypeId::DOUBLE, TypeId::DOUBLE]);
    let ne = overload(&ctx, "!=", &[TypeId::DOUBLE, TypeId::DOUBLE]);
    let eq_bool = overload(&ctx, "==", &[TypeId::BOOL, TypeId::BOOL]);

    let nan = || Value::Double(f64::NAN);

    let less = thread.run(&lt, vec![Value::Int(-1), Value::Int(3)]).unwrap();
    assert_eq!(less, Value::Bool(true));
    assert_eq!(thread.run(&eq, vec![nan(), nan()]).unwrap(), Value::Bool(false));
    assert_eq!(thread.run(&ne, vec![nan(), nan()]).unwrap(), Value::Bool(true));
    let same = thread
        .run(&eq_bool, vec![Value::Bool(true), Value::Bool(true)])
        .unwrap();
    assert_eq!(same, Value::Bool(true));
    assert!(ctx
        .find_overload(ScopeId::GLOBAL, "<", &[TypeId::BOOL, TypeId::BOOL])
        .is_none());
}

#[test]
fn test_casts_are_named_after_target() {
    let ctx = primitives();
    let mut thread = Thread::new(&ctx);
    let to_int = ctx
        .find_overload(ScopeId::GLOBAL, "int", &[TypeId::DOUBLE])
        .unwrap();
    let to_double = ctx
        .find_overload(ScopeId::GLOBAL, "double", &[TypeId::INT])
        .unwrap();
    let lossy = FunctionAttributes::CAST | FunctionAttributes::LOSSY;
    assert!(ctx.function(to_int).attributes.contains(lossy));
    assert!(!ctx.function(to_double).attributes.contains(FunctionAttributes::LOSSY));

    let value = thread
        .run(&FunctionRef::Declared(to_int), vec![Value::Double(3.9)])
        .unwrap();
    assert_eq!(value, Value::Int(3));
}

#[test]
fn test_assignment_through_reference() {
    let mut ctx = primitives();
    let int_ref = ctx.cached_reference_type(TypeId::INT).unwrap();
    let assign = ctx
        .find_overload(ScopeId::GLOBAL, "=", &[int_ref, TypeId::INT])
        .unwrap();
    let body = Node::Sequence {
        nodes: vec![
            Node::call(
                assign,
                vec![
                    Node::StackReference {
                        slot: 0,
                        ty: TypeId::INT,
                    },
                    Node::int(12),
                ],
            ),
            Node::stack_value(0, TypeId::INT),
        ],
        ty: TypeId::INT,
    };
    let function = Function::new(
        ctx.intern("store"),
        Signature::from_types([TypeId::INT]),
        vec![],
        FunctionBody::Nodes(std::sync::Arc::new(body)),
    )
    .with_locals(1);
    let id = ctx.declare_function(ScopeId::GLOBAL, function).unwrap();

    let mut thread = Thread::new(&ctx);
    let value = thread.run(&FunctionRef::Declared(id), vec![]).unwrap();
    assert_eq!(value, Value::Int(12));
}

// Array natives

fn array_method(ctx: &Context, array: TypeId, name: &str) -> FunctionId {
    let scope = ctx.type_entry(array).own_scope.unwrap();
    let name = ctx.interner().get(name).unwrap();
    ctx.lookup_local(scope, name)
        .iter()
        .find_map(|symbol| match symbol {
            mu_types::SymbolRef::Function(id) => Some(*id),
            _ => None,
        })
        .unwrap()
}

fn new_array(thread: &mut Thread<'_>, array: TypeId) -> ObjectRef {
    match thread.evaluate(&Node::New { class: array }).unwrap() {
        Value::Object(object) => object,
        other => panic!("expected an array, got {other:?}"),
    }
}

fn call(thread: &mut Thread<'_>, function: FunctionId, args: Vec<Value>) -> Result<Value, Fault> {
    thread.run(&FunctionRef::Declared(function), args)
}

#[test]
fn test_array_growth_counts_against_the_heap_limit() {
    let mut ctx = primitives();
    let mut registrar = Registrar::new(&mut ctx);
    let ints = registrar.array_type(TypeId::INT, 1).unwrap();
    let grid = registrar.array_type(TypeId::INT, 2).unwrap();
    let resize = array_method(&ctx, ints, "resize");
    let resize_grid = array_method(&ctx, grid, "resize");

    let collector = Arc::new(RefCountedCollector::with_limit(1024));
    let mut thread = ThreadBuilder::new(&ctx)
        .collector(collector.clone())
        .build();
    let array = new_array(&mut thread, ints);
    let this = || Value::Object(array.clone());

    let fault = call(&mut thread, resize, vec![this(), Value::Int(10_000_000)]).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::OutOfHeapMemory {
            requested: 40_000_000,
            live: 0,
            limit: 1024,
        }
    );
    assert_eq!(array.read().as_array().unwrap().size(), 0);

    call(&mut thread, resize, vec![this(), Value::Int(100)]).unwrap();
    assert_eq!(collector.stats().live_bytes, 400);

    let matrix = new_array(&mut thread, grid);
    let huge = Value::Int(1 << 30);
    let fault = call(
        &mut thread,
        resize_grid,
        vec![Value::Object(matrix.clone()), huge.clone(), huge],
    )
    .unwrap_err();
    assert!(matches!(fault.kind, FaultKind::OutOfHeapMemory { .. }));
    assert_eq!(matrix.read().as_array().unwrap().sizes(), &[0, 0]);
}

#[test]
fn test_vector_methods() {
    let mut ctx = primitives();
    let ints = Registrar::new(&mut ctx).array_type(TypeId::INT, 1).unwrap();
    let [push_back, size, pop_back, front, back, erase, empty, clear] =
        ["push_back", "size", "pop_back", "front", "back", "erase", "empty", "clear"]
            .map(|name| array_method(&ctx, ints, name));

    let mut thread = Thread::new(&ctx);
    let array = new_array(&mut thread, ints);
    let this = || Value::Object(array.clone());

    assert_eq!(call(&mut thread, empty, vec![this()]).unwrap(), Value::Bool(true));
    for v in [10, 20, 30, 40] {
        call(&mut thread, push_back, vec![this(), Value::Int(v)]).unwrap();
    }
    assert_eq!(call(&mut thread, size, vec![this()]).unwrap(), Value::Int(4));
    assert_eq!(call(&mut thread, front, vec![this()]).unwrap(), Value::Int(10));
    assert_eq!(call(&mut thread, back, vec![this()]).unwrap(), Value::Int(40));

    // Count defaults to one.
    call(&mut thread, erase, vec![this(), Value::Int(1)]).unwrap();
    assert_eq!(
        array.read().as_array().unwrap().elements(),
        &[Value::Int(10), Value::Int(30), Value::Int(40)]
    );
    let fault = call(&mut thread, erase, vec![this(), Value::Int(2), Value::Int(5)]).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::EraseOutOfBounds { .. }));

    assert_eq!(call(&mut thread, pop_back, vec![this()]).unwrap(), Value::Int(40));
    call(&mut thread, clear, vec![this()]).unwrap();
    let fault = call(&mut thread, pop_back, vec![this()]).unwrap_err();
    assert_eq!(fault.kind, FaultKind::OutOfRange { index: -1, size: 0 });

    let fault = call(&mut thread, size, vec![Value::Nil]).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::NilArgument {
            function: "size".to_owned()
        }
    );
}

#[test]
fn test_indexing_reads_and_writes_elements() {
    let mut ctx = primitives();
    let grid = Registrar::new(&mut ctx).array_type(TypeId::INT, 2).unwrap();
    let resize = array_method(&ctx, grid, "resize");
    let index = array_method(&ctx, grid, "[]");

    let mut thread = Thread::new(&ctx);
    let array = new_array(&mut thread, grid);
    call(
        &mut thread,
        resize,
        vec![Value::Object(array.clone()), Value::Int(2), Value::Int(3)],
    )
    .unwrap();

    let element = |row: i32, column: i32| Node::Call {
        function: FunctionRef::Declared(index),
        args: vec![
            Node::constant(grid, Value::Object(array.clone())),
            Node::int(row),
            Node::int(column),
        ],
    };
    let store = Node::Assign {
        target: Box::new(element(1, 2)),
        value: Box::new(Node::int(7)),
    };
    thread.evaluate(&store).unwrap();
    let load = Node::Dereference {
        reference: Box::new(element(1, 2)),
        ty: TypeId::INT,
    };
    assert_eq!(thread.evaluate(&load).unwrap(), Value::Int(7));
    assert_eq!(array.read().as_array().unwrap().elements()[5], Value::Int(7));

    let fault = thread.evaluate(&element(2, 0)).unwrap_err();
    assert_eq!(fault.kind, FaultKind::OutOfRange { index: 2, size: 2 });

    let one_dimension = Node::Call {
        function: FunctionRef::Declared(index),
        args: vec![Node::constant(grid, Value::Object(array.clone())), Node::int(0)],
    };
    let fault = thread.evaluate(&one_dimension).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::WrongDimensionality {
            rank: 2,
            requested: 1
        }
    );
}

#[test]
fn test_resize_with_wrong_rank_leaves_array_unchanged() {
    let mut ctx = primitives();
    let grid = Registrar::new(&mut ctx).array_type(TypeId::DOUBLE, 2).unwrap();
    let resize = array_method(&ctx, grid, "resize");

    let mut thread = Thread::new(&ctx);
    let array = new_array(&mut thread, grid);
    let this = || Value::Object(array.clone());
    call(&mut thread, resize, vec![this(), Value::Int(2), Value::Int(2)]).unwrap();

    let fault = call(&mut thread, resize, vec![this(), Value::Int(9)]).unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::WrongDimensionality {
            rank: 2,
            requested: 1
        }
    );
    assert_eq!(array.read().as_array().unwrap().sizes(), &[2, 2]);
}

#[test]
fn test_array_natives_install_once() {
    let mut ctx = primitives();
    let ints = ctx.array_type(TypeId::INT, 1).unwrap();
    install_all_array_natives(&mut ctx).unwrap();
    install_array_natives(&mut ctx, ints).unwrap();

    let scope = ctx.type_entry(ints).own_scope.unwrap();
    let size = ctx.interner().get("size").unwrap();
    assert_eq!(ctx.lookup_local(scope, size).len(), 1);
    assert!(matches!(ctx.type_entry(ints).kind, TypeKind::DynamicArray { rank: 1, .. }));

    let fault = install_array_natives(&mut ctx, TypeId::INT).unwrap_err();
    assert!(matches!(fault.kind, FaultKind::BadInternalArrayCall { .. }));
}
