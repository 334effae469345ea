//! Natives every primitive type carries: assignment through a reference,
//! casts between numbers, arithmetic, and comparison.

use super::{Keyword, Registrar};
use mu_ir::{FunctionId, MachineRep, ScopeId, TypeId};
use mu_types::{
    Context, EvalResult, Fault, Function, FunctionAttributes, NativeFn, NodeEvaluator, StrictNative,
    Value,
};
use std::cmp::Ordering;

/// Types that get `=`, `==` and `!=`.
const ASSIGNABLE: [TypeId; 8] = [
    TypeId::BOOL,
    TypeId::BYTE,
    TypeId::SHORT,
    TypeId::CHAR,
    TypeId::INT,
    TypeId::INT64,
    TypeId::FLOAT,
    TypeId::DOUBLE,
];

/// Types that get arithmetic and casts between each other.
const NUMERIC: [TypeId; 6] = [
    TypeId::BYTE,
    TypeId::SHORT,
    TypeId::INT,
    TypeId::INT64,
    TypeId::FLOAT,
    TypeId::DOUBLE,
];

const ARITHMETIC: [(&str, StrictNative); 4] = [("+", add), ("-", sub), ("*", mul), ("/", div)];

const EQUALITY: [(&str, StrictNative); 2] = [("==", eq), ("!=", ne)];

const ORDERING: [(&str, StrictNative); 4] = [("<", lt), ("<=", le), (">", gt), (">=", ge)];

/// Install the primitive natives into the global scope.
///
/// Each call adds another set of overloads; hosts call this once per context.
pub fn load_primitives(ctx: &mut Context) -> Result<(), Fault> {
    let mut registrar = Registrar::new(ctx);
    for ty in ASSIGNABLE {
        load_primitive(&mut registrar, ty)?;
    }
    for from in NUMERIC {
        for to in NUMERIC {
            if from != to {
                load_cast(&mut registrar, from, to)?;
            }
        }
    }
    tracing::debug!("loaded primitive natives");
    Ok(())
}

fn load_primitive(registrar: &mut Registrar<'_>, ty: TypeId) -> Result<(), Fault> {
    let ctx = registrar.context_mut();
    let reference = ctx.reference_type(ty);
    let name = ctx.qualified_type_name(ty);
    let reference_name = ctx.qualified_type_name(reference);
    let name = name.as_str();

    registrar.function(
        ScopeId::GLOBAL,
        "=",
        NativeFn::Strict(assign),
        &[
            Keyword::Return(name),
            Keyword::Args(&[reference_name.as_str(), name]),
            Keyword::Parameters(&["target", "value"]),
            Keyword::End,
        ],
    )?;

    let binary = [name, name];
    let operator = FunctionAttributes::OPERATOR | FunctionAttributes::NO_SIDE_EFFECTS;
    let mut comparisons = EQUALITY.to_vec();
    if ty != TypeId::BOOL {
        comparisons.extend(ORDERING);
    }
    for (symbol, native) in comparisons {
        let id = registrar.function(
            ScopeId::GLOBAL,
            symbol,
            NativeFn::Strict(native),
            &[Keyword::Return("bool"), Keyword::Args(&binary), Keyword::End],
        )?;
        mark(registrar, id, operator);
    }

    if NUMERIC.contains(&ty) {
        for (symbol, native) in ARITHMETIC {
            let id = registrar.function(
                ScopeId::GLOBAL,
                symbol,
                NativeFn::Strict(native),
                &[Keyword::Return(name), Keyword::Args(&binary), Keyword::End],
            )?;
            let mut attributes = operator;
            if matches!(symbol, "+" | "*") {
                attributes |= FunctionAttributes::COMMUTATIVE;
            }
            mark(registrar, id, attributes);
        }
    }
    Ok(())
}

/// A cast is a function named after its target type.
fn load_cast(registrar: &mut Registrar<'_>, from: TypeId, to: TypeId) -> Result<(), Fault> {
    let ctx = registrar.context();
    let from_name = ctx.qualified_type_name(from);
    let to_name = ctx.qualified_type_name(to);
    let lossy = is_lossy(ctx.type_entry(from).rep, ctx.type_entry(to).rep);

    let id = registrar.function(
        ScopeId::GLOBAL,
        &to_name,
        NativeFn::Strict(cast),
        &[
            Keyword::Return(&to_name),
            Keyword::Args(&[from_name.as_str()]),
            Keyword::End,
        ],
    )?;
    let mut attributes = FunctionAttributes::CAST | FunctionAttributes::NO_SIDE_EFFECTS;
    if lossy {
        attributes |= FunctionAttributes::LOSSY;
    }
    mark(registrar, id, attributes);
    Ok(())
}

fn is_lossy(from: MachineRep, to: MachineRep) -> bool {
    if from.is_floating() && !to.is_floating() {
        return true;
    }
    if from.is_integral() && to.is_floating() {
        return to.size() <= from.size();
    }
    to.size() < from.size()
}

fn mark(registrar: &mut Registrar<'_>, function: FunctionId, attributes: FunctionAttributes) {
    registrar.context_mut().function_mut(function).attributes |= attributes;
}

/// Representation of the declared return type.
fn result_rep(evaluator: &dyn NodeEvaluator, function: &Function) -> MachineRep {
    function
        .return_type()
        .map_or(MachineRep::Void, |ty| evaluator.context().type_entry(ty).rep)
}

fn operands(args: &[Value]) -> Result<(&Value, &Value), Fault> {
    match args {
        [lhs, rhs] => Ok((lhs, rhs)),
        _ => Err(Fault::arity_mismatch("operator", "2", args.len())),
    }
}

fn assign(evaluator: &mut dyn NodeEvaluator, _function: &Function, args: &[Value]) -> EvalResult {
    let (target, value) = operands(args)?;
    let Some(place) = target.as_place() else {
        return Err(Fault::bad_cast(target.kind_name(), "reference").into());
    };
    evaluator.store(place, value.clone())?;
    Ok(value.clone())
}

fn cast(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    let [value] = args else {
        return Err(Fault::arity_mismatch("cast", "1", args.len()).into());
    };
    let rep = result_rep(evaluator, function);
    value
        .convert(rep)
        .ok_or_else(|| Fault::bad_cast(value.kind_name(), rep.name()).into())
}

/// Integer arithmetic wraps in `i64` and truncates to the result width;
/// floating arithmetic runs in `f64`. `int_op` returns `None` only for a
/// zero divisor.
fn arithmetic(
    evaluator: &mut dyn NodeEvaluator,
    function: &Function,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult {
    let (lhs, rhs) = operands(args)?;
    let rep = result_rep(evaluator, function);
    let mismatch = || Fault::type_mismatch(rep.name(), format!("{} and {}", lhs.kind_name(), rhs.kind_name()));

    let wide = if rep.is_floating() {
        match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Value::Double(float_op(a, b)),
            _ => return Err(mismatch().into()),
        }
    } else {
        match (lhs.as_i64(), rhs.as_i64()) {
            (Some(a), Some(b)) => Value::Int64(int_op(a, b).ok_or_else(Fault::division_by_zero)?),
            _ => return Err(mismatch().into()),
        }
    };
    wide.convert(rep).ok_or_else(|| mismatch().into())
}

fn add(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    arithmetic(evaluator, function, args, |a, b| Some(a.wrapping_add(b)), |a, b| a + b)
}

fn sub(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    arithmetic(evaluator, function, args, |a, b| Some(a.wrapping_sub(b)), |a, b| a - b)
}

fn mul(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    arithmetic(evaluator, function, args, |a, b| Some(a.wrapping_mul(b)), |a, b| a * b)
}

fn div(evaluator: &mut dyn NodeEvaluator, function: &Function, args: &[Value]) -> EvalResult {
    arithmetic(
        evaluator,
        function,
        args,
        |a, b| (b != 0).then(|| a.wrapping_div(b)),
        |a, b| a / b,
    )
}

/// Order two operands. Integral pairs compare exactly; anything involving
/// a float compares as `f64`, where NaN is unordered.
fn compare(args: &[Value], test: fn(Option<Ordering>) -> bool) -> EvalResult {
    let (lhs, rhs) = operands(args)?;
    let ordering = match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_i64(), rhs.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return Err(
                        Fault::type_mismatch(lhs.kind_name(), rhs.kind_name()).into()
                    )
                }
            },
        },
    };
    Ok(Value::Bool(test(ordering)))
}

fn eq(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| o == Some(Ordering::Equal))
}

fn ne(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| o != Some(Ordering::Equal))
}

fn lt(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| o == Some(Ordering::Less))
}

fn le(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| matches!(o, Some(Ordering::Less | Ordering::Equal)))
}

fn gt(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| o == Some(Ordering::Greater))
}

fn ge(_: &mut dyn NodeEvaluator, _: &Function, args: &[Value]) -> EvalResult {
    compare(args, |o| matches!(o, Some(Ordering::Greater | Ordering::Equal)))
}
