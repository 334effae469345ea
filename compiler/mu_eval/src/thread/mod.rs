//! The evaluating thread.
//!
//! A `Thread` walks one node tree at a time against a read-only `Context`.
//! Parameters and locals of each activation live on a value stack at
//! `base + slot`. Non-local `return` travels up as
//! `ControlAction::Return` and is turned back into a value at the function
//! boundary; faults travel the same channel up to `evaluate`, the catch
//! boundary, which restores the thread so it can be reused.

mod builder;

pub use builder::ThreadBuilder;

use crate::diagnostics::{CallFrame, CallStack};
use crate::eval_mode::EvalConfig;
use crate::partial::PartialApplicator;
use crate::stack::ensure_sufficient_stack;
use mu_ir::{FunctionId, TypeId};
use mu_types::{
    allocate, allocate_array, Collector, Context, ControlAction, DispatchTable, EvalResult, Fault,
    Function, FunctionBody, FunctionRef, NativeFn, Node, NodeEvaluator, ObjectRef, Parameter,
    Place, TypeKind, Value,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One node-bodied call in progress.
#[derive(Copy, Clone, Debug)]
struct Activation {
    id: u64,
    /// Value-stack index of slot 0.
    base: usize,
}

impl Activation {
    const TOP_LEVEL: Activation = Activation { id: 0, base: 0 };
}

pub struct Thread<'ctx> {
    ctx: &'ctx Context,
    collector: Arc<dyn Collector>,
    stack: Vec<Value>,
    /// Live activations, innermost last. The first is the top level.
    frames: Vec<Activation>,
    next_activation: u64,
    call_stack: CallStack,
    config: EvalConfig,
    /// Overrides already chosen, keyed by dynamic class and declared function.
    dispatch_cache: FxHashMap<(TypeId, FunctionId), FunctionId>,
}

impl<'ctx> Thread<'ctx> {
    /// Thread with the default configuration and a reference-counting collector.
    pub fn new(ctx: &'ctx Context) -> Self {
        ThreadBuilder::new(ctx).build()
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Number of active calls.
    pub fn depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Slots currently in use on the value stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Evaluate `node` as a complete unit.
    ///
    /// A stray `return` yields its value. On a fault the value stack and
    /// call stack are restored to where they were before the call.
    pub fn evaluate(&mut self, node: &Node) -> Result<Value, Fault> {
        self.catch(|thread| thread.eval_node(node))
    }

    /// Call `function` as a complete unit, like [`Thread::evaluate`].
    pub fn run(&mut self, function: &FunctionRef, args: Vec<Value>) -> Result<Value, Fault> {
        self.catch(|thread| thread.call(function, args))
    }

    fn catch(&mut self, body: impl FnOnce(&mut Self) -> EvalResult) -> Result<Value, Fault> {
        let stack_len = self.stack.len();
        let frames = self.frames.len();
        let depth = self.call_stack.depth();

        let result = body(self);

        self.stack.truncate(stack_len);
        self.frames.truncate(frames);
        self.call_stack.truncate(depth);
        result.or_else(|action| {
            action.into_result().map_err(|fault| {
                tracing::debug!(%fault, "evaluation faulted");
                self.call_stack.attach_backtrace(fault, self.ctx.interner())
            })
        })
    }

    /// Call `function` with evaluated arguments in a new activation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn invoke(&mut self, function: &Function, args: Vec<Value>) -> EvalResult {
        self.with_frame(function, args.len(), |thread| thread.activate(function, args))
    }

    /// Arity check, frame push, backtrace capture, frame pop.
    fn with_frame(
        &mut self,
        function: &Function,
        argc: usize,
        body: impl FnOnce(&mut Self) -> EvalResult,
    ) -> EvalResult {
        let ctx = self.ctx;
        if !function.accepts(argc) {
            return Err(Fault::arity_mismatch(
                ctx.interner().lookup(function.name),
                function.arity_text(),
                argc,
            )
            .into());
        }
        self.call_stack.push(CallFrame {
            name: function.name,
        })?;
        tracing::trace!(
            function = ctx.interner().lookup(function.name),
            depth = self.call_stack.depth(),
            "call"
        );

        let result = body(self).map_err(|action| {
            action.map_fault(|fault| self.call_stack.attach_backtrace(fault, ctx.interner()))
        });
        self.call_stack.pop();
        match result {
            Err(ControlAction::Return(value)) => Ok(value),
            other => other,
        }
    }

    fn activate(&mut self, function: &Function, mut args: Vec<Value>) -> EvalResult {
        self.complete_arguments(function, &mut args);
        match &function.body {
            FunctionBody::Abstract => {
                let name = self.ctx.interner().lookup(function.name);
                Err(Fault::abstract_call(name).into())
            }
            FunctionBody::Native(NativeFn::Strict(native)) => native(self, function, &args),
            FunctionBody::Native(NativeFn::Lazy(native)) => {
                let nodes: Vec<Node> = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| Node::Constant {
                        ty: function.arg_type(i).unwrap_or(TypeId::VOID),
                        value,
                    })
                    .collect();
                native(self, function, &nodes)
            }
            FunctionBody::Nodes(body) => {
                let base = self.stack.len();
                self.stack.extend(args);
                let frame_end = self.stack.len().max(base + function.frame_size());
                self.stack.resize(frame_end, Value::Void);

                self.frames.push(Activation {
                    id: self.next_activation,
                    base,
                });
                self.next_activation += 1;
                let result = self.eval_node(body);
                self.frames.pop();
                self.stack.truncate(base);
                result
            }
        }
    }

    /// Place of `slot` in the innermost activation.
    fn local(&self, slot: usize) -> Place {
        let activation = self.frames.last().map_or(0, |frame| frame.id);
        Place::Stack { activation, slot }
    }

    /// Value-stack index of `slot` in `activation`, which must still be live.
    fn stack_index(&self, activation: u64, slot: usize) -> Result<usize, Fault> {
        let position = self
            .frames
            .binary_search_by_key(&activation, |frame| frame.id)
            .map_err(|_| Fault::stale_reference(slot))?;
        let base = self.frames[position].base;
        let end = self
            .frames
            .get(position + 1)
            .map_or(self.stack.len(), |next| next.base);
        if base + slot >= end {
            return Err(Fault::index_out_of_range(slot, end - base));
        }
        Ok(base + slot)
    }

    /// Append defaults for omitted parameters, then the free variables.
    fn complete_arguments(&self, function: &Function, args: &mut Vec<Value>) {
        let supplied = args.len();
        let visible = function.parameters.iter().filter(|p| !p.free);
        for parameter in visible.skip(supplied) {
            args.push(self.initial_value(parameter));
        }
        for parameter in function.parameters.iter().filter(|p| p.free) {
            args.push(self.initial_value(parameter));
        }
    }

    fn initial_value(&self, parameter: &Parameter) -> Value {
        parameter.default.clone().unwrap_or_else(|| {
            parameter
                .storage
                .resolved()
                .map_or(Value::Void, |ty| Value::zeroed(self.ctx.type_entry(ty).rep))
        })
    }

    /// Call with argument nodes: lazy natives get the nodes, everything
    /// else gets the evaluated values.
    fn call_with_nodes(&mut self, function: &Function, args: &[Node]) -> EvalResult {
        if let FunctionBody::Native(NativeFn::Lazy(native)) = function.body {
            return self.with_frame(function, args.len(), |thread| native(thread, function, args));
        }
        let values = self.eval_args(args)?;
        self.invoke(function, values)
    }

    fn eval_args(&mut self, args: &[Node]) -> Result<Vec<Value>, ControlAction> {
        args.iter().map(|arg| self.eval_node(arg)).collect()
    }

    fn eval_condition(&mut self, node: &Node) -> Result<bool, ControlAction> {
        let value = self.eval_node(node)?;
        value
            .as_bool()
            .ok_or_else(|| Fault::type_mismatch("bool", value.kind_name()).into())
    }

    /// Dynamic class of a call's receiver.
    fn receiver_class(&self, receiver: Option<&Value>, function: &str) -> Result<TypeId, Fault> {
        match receiver {
            Some(Value::Object(object)) => Ok(object.ty()),
            Some(Value::Nil) | None => Err(Fault::nil_argument(function)),
            Some(other) => Err(Fault::bad_cast(other.kind_name(), "object")),
        }
    }

    /// Override of `function` for instances of `class`, memoized per thread.
    fn dispatch(&mut self, class: TypeId, function: FunctionId) -> Result<FunctionId, Fault> {
        if let Some(&target) = self.dispatch_cache.get(&(class, function)) {
            return Ok(target);
        }
        let target = self.ctx.dynamic_lookup(class, function)?;
        tracing::trace!(?class, ?function, ?target, "resolved virtual call");
        self.dispatch_cache.insert((class, function), target);
        Ok(target)
    }

    /// Dispatch table of `interface` for `object`: the instance's ancestor
    /// entry when it declared the interface, else the structural match.
    fn interface_table(&self, object: &ObjectRef, interface: TypeId) -> Result<Arc<DispatchTable>, Fault> {
        let guard = object.read();
        let declared = guard
            .as_instance()
            .ok()
            .and_then(|instance| instance.ancestor(interface))
            .map(|ancestor| Arc::clone(&ancestor.table));
        drop(guard);

        match declared {
            Some(table) => Ok(table),
            None => self.ctx.implementation(object.ty(), interface)?.ok_or_else(|| {
                Fault::bad_interface_invocation(
                    self.ctx.qualified_type_name(object.ty()),
                    self.ctx.qualified_type_name(interface),
                )
            }),
        }
    }

    fn eval_node(&mut self, node: &Node) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(node))
    }

    fn eval_inner(&mut self, node: &Node) -> EvalResult {
        let ctx = self.ctx;
        match node {
            Node::Constant { value, .. } => Ok(value.clone()),
            Node::Call { function, args } => {
                let callee = ctx.resolve_function_ref(function);
                self.call_with_nodes(callee, args)
            }
            Node::CallMethod { function, args } => {
                let values = self.eval_args(args)?;
                let name = ctx.qualified_function_name(*function);
                let class = self.receiver_class(values.first(), &name)?;
                let target = self.dispatch(class, *function)?;
                self.invoke(ctx.function(target), values)
            }
            Node::CallInterface {
                interface,
                slot,
                args,
            } => {
                let values = self.eval_args(args)?;
                let object = match values.first() {
                    Some(Value::Object(object)) => object.clone(),
                    Some(Value::Nil) | None => {
                        let name = ctx.qualified_type_name(*interface);
                        return Err(Fault::nil_argument(name).into());
                    }
                    Some(other) => return Err(Fault::bad_cast(other.kind_name(), "object").into()),
                };
                let table = self.interface_table(&object, *interface)?;
                let target = table
                    .entry(*slot)
                    .ok_or_else(|| Fault::index_out_of_range(*slot, table.entries.len()))?;
                self.invoke(ctx.function(target), values)
            }
            Node::CallIndirect { callee, args } => {
                let function = match self.eval_node(callee)? {
                    Value::Function(function) => function,
                    Value::Nil => return Err(Fault::nil_argument("indirect call").into()),
                    other => return Err(Fault::bad_cast(other.kind_name(), "function").into()),
                };
                let target = ctx.resolve_function_ref(&function);
                self.call_with_nodes(target, args)
            }
            Node::StackReference { slot, .. } => Ok(Value::Reference(self.local(*slot))),
            Node::StackValue { slot, .. } => Ok(self.load(&self.local(*slot))?),
            Node::FieldReference { object, index, .. } => {
                let object = self.eval_object(object, "field access")?;
                let place = Place::Field {
                    object,
                    index: *index,
                };
                self.load(&place)?;
                Ok(Value::Reference(place))
            }
            Node::FieldValue { object, index, .. } => {
                let object = self.eval_object(object, "field access")?;
                Ok(self.load(&Place::Field {
                    object,
                    index: *index,
                })?)
            }
            Node::Assign { target, value } => {
                let place = match self.eval_node(target)? {
                    Value::Reference(place) => place,
                    other => return Err(Fault::bad_cast(other.kind_name(), "reference").into()),
                };
                let value = self.eval_node(value)?;
                self.store(&place, value.clone())?;
                Ok(value)
            }
            Node::Dereference { reference, .. } => match self.eval_node(reference)? {
                Value::Reference(place) => Ok(self.load(&place)?),
                other => Err(Fault::bad_cast(other.kind_name(), "reference").into()),
            },
            Node::Sequence { nodes, .. } => {
                let mut last = Value::Void;
                for node in nodes {
                    last = self.eval_node(node)?;
                }
                Ok(last)
            }
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                if self.eval_condition(condition)? {
                    self.eval_node(then)
                } else if let Some(otherwise) = otherwise {
                    self.eval_node(otherwise)
                } else {
                    Ok(Value::Void)
                }
            }
            Node::And(lhs, rhs) => {
                let result = self.eval_condition(lhs)? && self.eval_condition(rhs)?;
                Ok(Value::Bool(result))
            }
            Node::Or(lhs, rhs) => {
                let result = self.eval_condition(lhs)? || self.eval_condition(rhs)?;
                Ok(Value::Bool(result))
            }
            Node::While { condition, body } => {
                while self.eval_condition(condition)? {
                    self.eval_node(body)?;
                }
                Ok(Value::Void)
            }
            Node::Return(value) => {
                let value = match value {
                    Some(value) => self.eval_node(value)?,
                    None => Value::Void,
                };
                Err(ControlAction::Return(value))
            }
            Node::New { class } => {
                let collector = &*self.collector;
                let object = match ctx.type_entry(*class).kind {
                    TypeKind::DynamicArray { .. } => allocate_array(ctx, collector, *class)?,
                    _ => allocate(ctx, collector, *class)?,
                };
                Ok(Value::Object(object))
            }
            Node::DynamicCast { object, target } => {
                let value = self.eval_node(object)?;
                Ok(ctx.dynamic_cast(&value, *target)?)
            }
            Node::Annotated { node, position } => self.eval_node(node).map_err(|action| {
                action.map_fault(|fault| {
                    fault.with_note(format!(
                        "at {}:{}:{}",
                        ctx.interner().lookup(position.file),
                        position.line,
                        position.column
                    ))
                })
            }),
            Node::Unresolved { name } => {
                Err(Fault::unresolved_node(ctx.interner().lookup(*name)).into())
            }
            Node::Curry {
                function,
                args,
                dynamic,
            } => {
                let mut values = Vec::new();
                let mut mask = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        Some(arg) => {
                            values.push(self.eval_node(arg)?);
                            mask.push(true);
                        }
                        None => mask.push(false),
                    }
                }
                let closure = PartialApplicator::new(ctx)
                    .apply(function, values, &mask, *dynamic)
                    .map_err(|fault| {
                        fault.with_note(format!(
                            "during partial application of `{}`",
                            ctx.function_ref_name(function)
                        ))
                    })?;
                Ok(Value::Function(FunctionRef::Synthesized(closure)))
            }
        }
    }
}

impl NodeEvaluator for Thread<'_> {
    fn context(&self) -> &Context {
        self.ctx
    }

    fn collector(&self) -> &dyn Collector {
        &*self.collector
    }

    fn eval(&mut self, node: &Node) -> EvalResult {
        self.eval_node(node)
    }

    fn call(&mut self, function: &FunctionRef, args: Vec<Value>) -> EvalResult {
        let target = self.ctx.resolve_function_ref(function);
        self.invoke(target, args)
    }

    fn load(&self, place: &Place) -> Result<Value, Fault> {
        match place {
            Place::Stack { activation, slot } => {
                let index = self.stack_index(*activation, *slot)?;
                Ok(self.stack[index].clone())
            }
            Place::Field { object, index } => {
                let guard = object.read();
                let value = guard.as_instance()?.field(*index)?.clone();
                Ok(value)
            }
            Place::Element { object, index } => {
                let guard = object.read();
                let value = guard.as_array()?.element(*index)?.clone();
                Ok(value)
            }
        }
    }

    fn store(&mut self, place: &Place, value: Value) -> Result<(), Fault> {
        match place {
            Place::Stack { activation, slot } => {
                let index = self.stack_index(*activation, *slot)?;
                self.stack[index] = value;
                Ok(())
            }
            Place::Field { object, index } => {
                let mut guard = object.write();
                guard.as_instance_mut()?.set_field(*index, value)
            }
            Place::Element { object, index } => {
                let mut guard = object.write();
                guard.as_array_mut()?.set_element(*index, value)
            }
        }
    }
}
