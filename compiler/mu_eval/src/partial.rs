//! Closure synthesis.
//!
//! `PartialApplicator::apply` binds a subset of a function's parameters to
//! fixed values and returns a new function over the parameters left open.
//! The new function's body is one call back into the original, with
//! constants at bound positions and frame reads at open ones. Every check
//! runs before the closure is built, so a failed application leaves nothing
//! behind.

use mu_ir::TypeId;
use mu_types::{
    Context, Fault, Function, FunctionAttributes, FunctionBody, FunctionRef, Node, Parameter,
    Signature, Value,
};
use std::sync::Arc;

pub struct PartialApplicator<'ctx> {
    ctx: &'ctx Context,
}

impl<'ctx> PartialApplicator<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self { ctx }
    }

    /// Bind the parameters of `function` marked in `mask` to `values`, in
    /// order.
    ///
    /// `mask` has one entry per visible parameter. With `dynamic` set and a
    /// method as the target, an open receiver keeps virtual dispatch in the
    /// closure; a bound receiver picks its override now.
    pub fn apply(
        &self,
        function: &FunctionRef,
        values: Vec<Value>,
        mask: &[bool],
        dynamic: bool,
    ) -> Result<Arc<Function>, Fault> {
        let ctx = self.ctx;
        let target = ctx.resolve_function_ref(function);
        let name = ctx.function_ref_name(function);
        let fail = |detail: String| Fault::bad_partial_application(name.as_str(), detail);

        if mask.len() != target.num_args() {
            return Err(fail(format!(
                "mask covers {} parameters but the function takes {}",
                mask.len(),
                target.num_args()
            )));
        }
        let bound = mask.iter().filter(|&&is_bound| is_bound).count();
        if bound != values.len() {
            return Err(fail(format!(
                "{} values supplied for {bound} bound parameters",
                values.len()
            )));
        }
        if !target.signature.is_resolved() {
            return Err(fail("signature is unresolved".to_owned()));
        }

        let mut supplied = values.into_iter();
        let mut slots: Vec<Option<Value>> = Vec::with_capacity(mask.len());
        let mut param_types = Vec::with_capacity(mask.len());
        let mut arg_types = Vec::with_capacity(mask.len());
        for (index, &is_bound) in mask.iter().enumerate() {
            let ty = target
                .arg_type(index)
                .ok_or_else(|| fail(format!("parameter {index} has no type")))?;
            param_types.push(ty);
            if is_bound {
                let value = supplied
                    .next()
                    .ok_or_else(|| fail(format!("no value for parameter {index}")))?;
                let actual = self.value_type(&value, ty).ok_or_else(|| {
                    fail(format!(
                        "parameter {index} expects `{}` but was bound to {}",
                        ctx.qualified_type_name(ty),
                        value.kind_name()
                    ))
                })?;
                arg_types.push(actual);
                slots.push(Some(value));
            } else {
                arg_types.push(ty);
                slots.push(None);
            }
        }
        ctx.check_call(target, &arg_types)
            .map_err(|fault| fail(fault.kind.to_string()))?;

        let receiver_open = matches!(slots.first(), Some(None));
        let dispatched = dynamic && target.is_method();
        let bound_receiver = match slots.first() {
            Some(Some(receiver)) if dispatched => Some(receiver.clone()),
            _ => None,
        };

        let visible = target.parameters.iter().filter(|p| !p.free);
        let mut parameters = Vec::new();
        let mut args = Vec::with_capacity(slots.len());
        for ((slot, original), ty) in slots.into_iter().zip(visible).zip(&param_types) {
            match slot {
                Some(value) => args.push(Node::Constant { ty: *ty, value }),
                None => {
                    args.push(Node::StackValue {
                        slot: parameters.len(),
                        ty: *ty,
                    });
                    let mut parameter = Parameter::typed(original.name, *ty);
                    parameter.default = original.default.clone();
                    parameters.push(parameter);
                }
            }
        }

        let call = match function {
            FunctionRef::Declared(id) if dispatched && receiver_open => Node::CallMethod {
                function: *id,
                args,
            },
            FunctionRef::Declared(id) if dispatched => {
                let class = match bound_receiver {
                    Some(Value::Object(object)) => object.ty(),
                    Some(other) if !other.is_nil() => {
                        return Err(fail(format!("receiver is {}", other.kind_name())))
                    }
                    _ => return Err(Fault::nil_argument(name.as_str())),
                };
                let method = ctx
                    .dynamic_lookup(class, *id)
                    .map_err(|fault| fail(fault.kind.to_string()))?;
                Node::call(method, args)
            }
            _ => Node::Call {
                function: function.clone(),
                args,
            },
        };

        let return_type = target.return_type().unwrap_or(TypeId::VOID);
        let open_types = mask
            .iter()
            .zip(&param_types)
            .filter_map(|(&is_bound, &ty)| (!is_bound).then_some(ty));
        let signature = Signature::from_types(std::iter::once(return_type).chain(open_types));

        let mut closure = Function::new(
            ctx.names().lambda,
            signature,
            parameters,
            FunctionBody::Nodes(Arc::new(call)),
        )
        .with_attributes(FunctionAttributes::LAMBDA | FunctionAttributes::GENERATED);
        closure.scope = target.scope;

        tracing::debug!(
            function = %name,
            bound,
            open = closure.num_args(),
            "synthesized closure"
        );
        Ok(Arc::new(closure))
    }

    /// Type a bound value presents to the call check, or `None` when its
    /// representation cannot fill a `expected` slot.
    fn value_type(&self, value: &Value, expected: TypeId) -> Option<TypeId> {
        match value {
            Value::Object(object) => Some(object.ty()),
            Value::Nil => Some(TypeId::NIL),
            other if other.rep() == self.ctx.type_entry(expected).rep => Some(expected),
            _ => None,
        }
    }
}
