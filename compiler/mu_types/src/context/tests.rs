#![allow(clippy::unwrap_used, reason = "tests use unwrap for brevity")]

use super::*;
use crate::errors::FaultKind;
use crate::function::FunctionBody;
use crate::member::Parameter;
use crate::signature::Signature;
use pretty_assertions::assert_eq;

fn function(ctx: &Context, name: &str, types: &[TypeId]) -> Function {
    let parameters = types[1..]
        .iter()
        .enumerate()
        .map(|(i, &ty)| Parameter::typed(ctx.intern(&format!("p{i}")), ty))
        .collect();
    Function::new(
        ctx.intern(name),
        Signature::from_types(types.iter().copied()),
        parameters,
        FunctionBody::Abstract,
    )
}

#[test]
fn test_primitives_are_preregistered() {
    let ctx = Context::new();
    assert_eq!(ctx.num_types(), TypeId::PRIMITIVES.len());
    for ty in TypeId::PRIMITIVES {
        assert!(matches!(ctx.type_entry(ty).kind, TypeKind::Primitive));
    }
    assert_eq!(ctx.qualified_type_name(TypeId::INT64), "int64");
    assert_eq!(ctx.type_entry(TypeId::DOUBLE).rep, MachineRep::Double);
    assert_eq!(ctx.type_entry(TypeId::NIL).rep, MachineRep::Pointer);
    assert_eq!(ctx.find_types(ScopeId::GLOBAL, "bool").as_slice(), &[TypeId::BOOL]);
}

#[test]
fn test_namespaces_reopen_and_qualify() {
    let mut ctx = Context::new();
    let geo = ctx.declare_namespace(ScopeId::GLOBAL, "geo");
    let flat = ctx.declare_namespace(geo, "flat");
    assert_eq!(ctx.declare_namespace(ScopeId::GLOBAL, "geo"), geo);

    let point = ctx.declare_class(flat, "Point", None).unwrap();
    assert_eq!(ctx.qualified_type_name(point), "geo.flat.Point");
    assert_eq!(ctx.find_types(ScopeId::GLOBAL, "geo.flat.Point").as_slice(), &[point]);
    assert!(ctx.find_types(ScopeId::GLOBAL, "Point").is_empty());
    assert!(ctx.find_types(ScopeId::GLOBAL, "geo.nowhere.Point").is_empty());
    // From inside `geo`, the relative path works too.
    assert_eq!(ctx.find_types(geo, "flat.Point").as_slice(), &[point]);
}

#[test]
fn test_lookup_walks_outward() {
    let mut ctx = Context::new();
    let outer = ctx.declare_namespace(ScopeId::GLOBAL, "outer");
    let inner = ctx.declare_namespace(outer, "inner");
    let global_shape = ctx.declare_class(ScopeId::GLOBAL, "Shape", None).unwrap();
    let inner_shape = ctx.declare_class(inner, "Shape", None).unwrap();
    let name = ctx.intern("Shape");

    assert_eq!(ctx.lookup(inner, name).as_slice(), &[SymbolRef::Type(inner_shape)]);
    assert_eq!(ctx.lookup(outer, name).as_slice(), &[SymbolRef::Type(global_shape)]);
    assert!(ctx.lookup_local(outer, name).is_empty());
}

#[test]
fn test_imports_merge_into_one_set() {
    let mut ctx = Context::new();
    let a = ctx.declare_namespace(ScopeId::GLOBAL, "a");
    let b = ctx.declare_namespace(ScopeId::GLOBAL, "b");
    let user = ctx.declare_namespace(ScopeId::GLOBAL, "user");
    let pa = ctx.declare_class(a, "P", None).unwrap();
    let pb = ctx.declare_class(b, "P", None).unwrap();
    ctx.import(user, a);
    ctx.import(user, a);
    assert_eq!(ctx.scope(user).imports(), &[a]);
    assert_eq!(ctx.find_types(user, "P").as_slice(), &[pa]);

    ctx.import(user, b);
    assert_eq!(ctx.find_types(user, "P").as_slice(), &[pa, pb]);
}

#[test]
fn test_unknown_names_are_not_interned_by_lookup() {
    let ctx = Context::new();
    let before = ctx.interner().len();
    assert!(ctx.lookup_qualified(ScopeId::GLOBAL, "never.seen.before").is_empty());
    assert_eq!(ctx.interner().len(), before);
}

#[test]
fn test_overloads_and_exact_match() {
    let mut ctx = Context::new();
    let int_max = function(&ctx, "max", &[TypeId::INT, TypeId::INT, TypeId::INT]);
    let double_max = function(&ctx, "max", &[TypeId::DOUBLE, TypeId::DOUBLE, TypeId::DOUBLE]);
    let int_max = ctx.declare_function(ScopeId::GLOBAL, int_max).unwrap();
    let double_max = ctx.declare_function(ScopeId::GLOBAL, double_max).unwrap();

    let name = ctx.intern("max");
    assert_eq!(ctx.overloads(ScopeId::GLOBAL, name), vec![int_max, double_max]);
    assert_eq!(
        ctx.find_overload(ScopeId::GLOBAL, "max", &[TypeId::DOUBLE, TypeId::DOUBLE]),
        Some(double_max)
    );
    assert_eq!(ctx.find_overload(ScopeId::GLOBAL, "max", &[TypeId::INT]), None);
    assert_eq!(ctx.qualified_function_name(int_max), "max");
}

#[test]
fn test_superclass_must_be_a_class() {
    let mut ctx = Context::new();
    let err = ctx
        .declare_class(ScopeId::GLOBAL, "Bad", Some(TypeId::INT))
        .unwrap_err();
    assert_eq!(err.kind, FaultKind::NotAClass { name: "int".into() });
}

#[test]
fn test_method_on_frozen_class_is_rejected() {
    let mut ctx = Context::new();
    let class = ctx.declare_class(ScopeId::GLOBAL, "Sealed", None).unwrap();
    ctx.freeze(class).unwrap();
    let scope = ctx.type_entry(class).own_scope.unwrap();
    let f = function(&ctx, "late", &[TypeId::VOID, class]).with_attributes(FunctionAttributes::METHOD);
    let err = ctx.declare_function(scope, f).unwrap_err();
    assert!(matches!(err.kind, FaultKind::ClassFrozen { .. }));
}

#[test]
fn test_array_types_are_cached_by_element_and_rank() {
    let mut ctx = Context::new();
    let ints = ctx.array_type(TypeId::INT, 1).unwrap();
    let grid = ctx.array_type(TypeId::INT, 2).unwrap();
    assert_eq!(ctx.array_type(TypeId::INT, 1).unwrap(), ints);
    assert_ne!(ints, grid);
    assert_eq!(ctx.qualified_type_name(ints), "int[]");
    assert_eq!(ctx.qualified_type_name(grid), "int[,]");
    assert_eq!(ctx.cached_array_type(TypeId::INT, 2), Some(grid));
    assert_eq!(ctx.cached_array_type(TypeId::BYTE, 1), None);

    let err = ctx.array_type(TypeId::INT, 0).unwrap_err();
    assert!(matches!(err.kind, FaultKind::WrongDimensionality { .. }));
    assert!(ctx.array_type(TypeId::VOID, 1).is_err());
}

#[test]
fn test_tuple_types_are_frozen_classes() {
    let mut ctx = Context::new();
    let pair = ctx.tuple_type(&[TypeId::INT, TypeId::DOUBLE]).unwrap();
    assert_eq!(ctx.tuple_type(&[TypeId::INT, TypeId::DOUBLE]).unwrap(), pair);
    assert_eq!(ctx.qualified_type_name(pair), "(int,double)");
    assert!(ctx.is_frozen(pair));
    assert_eq!(ctx.instance_size(pair).unwrap(), 16);
    assert_eq!(ctx.field_index(pair, ctx.intern("_1")).unwrap(), Some(1));
    assert!(ctx.tuple_type(&[TypeId::VOID]).is_err());
}

#[test]
fn test_reference_and_function_types() {
    let mut ctx = Context::new();
    let int_ref = ctx.reference_type(TypeId::INT);
    assert_eq!(ctx.reference_type(TypeId::INT), int_ref);
    assert_eq!(ctx.qualified_type_name(int_ref), "int&");
    assert_eq!(ctx.type_entry(int_ref).dereference_type(), Some(TypeId::INT));

    let predicate = ctx.function_type(&[TypeId::BOOL, TypeId::INT]);
    assert_eq!(ctx.function_type(&[TypeId::BOOL, TypeId::INT]), predicate);
    assert_eq!(ctx.qualified_type_name(predicate), "(bool;int)");
    assert_eq!(ctx.cached_function_type(&[TypeId::BOOL]), None);
}

#[test]
fn test_host_primitive() {
    let mut ctx = Context::new();
    let media = ctx.declare_namespace(ScopeId::GLOBAL, "media");
    let sample = ctx.declare_primitive(media, "Sample", MachineRep::Short);
    assert_eq!(ctx.qualified_type_name(sample), "media.Sample");
    assert_eq!(ctx.type_entry(sample).rep, MachineRep::Short);
    assert_eq!(ctx.type_entry(sample).own_scope, None);
}
