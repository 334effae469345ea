//! Native methods of generated array types.
//!
//! Every array type gets the same method set in its own scope. Indexing is
//! a lazy native so it can evaluate the array before the positions and
//! hand back a reference to the element rather than its value.

use super::{Keyword, Registrar};
use mu_ir::TypeId;
use mu_types::{
    push_back_array, resize_array, Context, EvalResult, Fault, Function, NativeFn, Node,
    NodeEvaluator, ObjectRef, Place, TypeKind, Value,
};
use smallvec::SmallVec;

/// Install the array natives on `array`. Repeated calls are no-ops.
pub fn install_array_natives(ctx: &mut Context, array: TypeId) -> Result<(), Fault> {
    let entry = ctx.type_entry(array);
    let (TypeKind::DynamicArray { element, .. }, Some(scope)) = (&entry.kind, entry.own_scope) else {
        return Err(Fault::bad_internal_array_call(format!(
            "`{}` is not an array type",
            ctx.qualified_type_name(array)
        )));
    };
    let element = *element;
    let size_name = ctx.intern("size");
    if !ctx.lookup_local(scope, size_name).is_empty() {
        return Ok(());
    }

    let element_name = ctx.qualified_type_name(element);
    let reference = ctx.reference_type(element);
    let reference_name = ctx.qualified_type_name(reference);
    let e = element_name.as_str();

    let mut registrar = Registrar::new(ctx);
    registrar.method(
        array,
        "size",
        NativeFn::Strict(size),
        &[Keyword::Return("int"), Keyword::End],
    )?;
    registrar.method(
        array,
        "resize",
        NativeFn::Strict(resize),
        &[
            Keyword::Args(&["int"]),
            Keyword::Parameters(&["size"]),
            Keyword::Maximum(None),
            Keyword::End,
        ],
    )?;
    registrar.method(
        array,
        "push_back",
        NativeFn::Strict(push_back),
        &[Keyword::Args(&[e]), Keyword::Parameters(&["value"]), Keyword::End],
    )?;
    registrar.method(
        array,
        "pop_back",
        NativeFn::Strict(pop_back),
        &[Keyword::Return(e), Keyword::End],
    )?;
    registrar.method(
        array,
        "front",
        NativeFn::Strict(front),
        &[Keyword::Return(e), Keyword::End],
    )?;
    registrar.method(
        array,
        "back",
        NativeFn::Strict(back),
        &[Keyword::Return(e), Keyword::End],
    )?;
    registrar.method(array, "clear", NativeFn::Strict(clear), &[Keyword::End])?;
    registrar.method(
        array,
        "erase",
        NativeFn::Strict(erase),
        &[
            Keyword::Args(&["int", "int"]),
            Keyword::Parameters(&["start", "count"]),
            Keyword::Optional(&[Value::Int(1)]),
            Keyword::End,
        ],
    )?;
    registrar.method(
        array,
        "empty",
        NativeFn::Strict(empty),
        &[Keyword::Return("bool"), Keyword::End],
    )?;
    registrar.method(
        array,
        "[]",
        NativeFn::Lazy(index),
        &[
            Keyword::Return(&reference_name),
            Keyword::Args(&["int"]),
            Keyword::Parameters(&["index"]),
            Keyword::Maximum(None),
            Keyword::End,
        ],
    )?;

    let ctx = registrar.context();
    tracing::debug!(array = %ctx.qualified_type_name(array), "installed array natives");
    Ok(())
}

/// Install the natives on every array type generated so far.
pub fn install_all_array_natives(ctx: &mut Context) -> Result<(), Fault> {
    let arrays: Vec<TypeId> = ctx
        .type_ids()
        .filter(|&ty| matches!(ctx.type_entry(ty).kind, TypeKind::DynamicArray { .. }))
        .collect();
    for array in arrays {
        install_array_natives(ctx, array)?;
    }
    Ok(())
}

fn receiver<'v>(
    evaluator: &dyn NodeEvaluator,
    function: &Function,
    args: &'v [Value],
) -> Result<(&'v ObjectRef, &'v [Value]), Fault> {
    match args.split_first() {
        Some((Value::Object(object), rest)) => Ok((object, rest)),
        Some((Value::Nil, _)) => {
            let name = evaluator.context().interner().lookup(function.name);
            Err(Fault::nil_argument(name))
        }
        Some((other, _)) => Err(Fault::bad_internal_array_call(format!(
            "receiver is {}, not an array",
            other.kind_name()
        ))),
        None => Err(Fault::bad_internal_array_call("missing receiver")),
    }
}

fn to_index(value: &Value, extent: usize) -> Result<usize, Fault> {
    let index = value
        .as_i64()
        .ok_or_else(|| Fault::type_mismatch("int", value.kind_name()))?;
    usize::try_from(index).map_err(|_| Fault::out_of_range(index, extent))
}

fn int_value(n: usize) -> Value {
    Value::Int(i32::try_from(n).unwrap_or(i32::MAX))
}

fn size(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    let size = object.read().as_array()?.size();
    Ok(int_value(size))
}

fn resize(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, dims) = receiver(evaluator, function, args)?;
    let dims = dims
        .iter()
        .map(|dim| to_index(dim, 0))
        .collect::<Result<SmallVec<[usize; 4]>, Fault>>()?;
    resize_array(evaluator.collector(), object, &dims)?;
    Ok(Value::Void)
}

fn push_back(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, rest) = receiver(evaluator, function, args)?;
    let [value] = rest else {
        return Err(Fault::arity_mismatch("push_back", "2", args.len()).into());
    };
    push_back_array(evaluator.collector(), object, value.clone())?;
    Ok(Value::Void)
}

fn pop_back(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    let value = object.write().as_array_mut()?.pop_back()?;
    Ok(value)
}

fn front(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    let value = object.read().as_array()?.front()?.clone();
    Ok(value)
}

fn back(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    let value = object.read().as_array()?.back()?.clone();
    Ok(value)
}

fn clear(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    object.write().as_array_mut()?.clear();
    Ok(Value::Void)
}

fn erase(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, rest) = receiver(evaluator, function, args)?;
    let [start, count] = rest else {
        return Err(Fault::arity_mismatch("erase", "2 to 3", args.len()).into());
    };
    let mut guard = object.write();
    let array = guard.as_array_mut()?;
    let size = array.size();
    array.erase(to_index(start, size)?, to_index(count, size)?)?;
    Ok(Value::Void)
}

fn empty(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let (object, _) = receiver(evaluator, function, args)?;
    let empty = object.read().as_array()?.is_empty();
    Ok(Value::Bool(empty))
}

/// `array[i, j, ...]`: a reference to the element, checked against the
/// array's rank and extents.
fn index(evaluator: &mut dyn NodeEvaluator, _function: &Function, args: &[Node]) -> EvalResult {
    let Some((array_node, positions)) = args.split_first() else {
        return Err(Fault::bad_internal_array_call("missing receiver").into());
    };
    let object = evaluator.eval_object(array_node, "[]")?;
    let values = positions
        .iter()
        .map(|node| evaluator.eval(node))
        .collect::<Result<SmallVec<[Value; 4]>, _>>()?;

    let guard = object.read();
    let array = guard.as_array()?;
    if values.len() != array.rank() {
        return Err(Fault::wrong_dimensionality(array.rank(), values.len()).into());
    }
    let position = values
        .iter()
        .zip(array.sizes())
        .map(|(value, &extent)| to_index(value, extent))
        .collect::<Result<SmallVec<[usize; 4]>, Fault>>()?;
    let flat = array.flat_index(&position)?;
    drop(guard);

    Ok(Value::Reference(Place::Element {
        object,
        index: flat,
    }))
}
