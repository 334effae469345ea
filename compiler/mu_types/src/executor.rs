//! The interface natives use to call back into the evaluator.
//!
//! Natives live below the evaluator crate, so they see the evaluating
//! thread only through this trait.

use crate::context::Context;
use crate::errors::{ControlAction, EvalResult, Fault};
use crate::heap::Collector;
use crate::node::Node;
use crate::value::{FunctionRef, ObjectRef, Place, Value};

pub trait NodeEvaluator {
    fn context(&self) -> &Context;

    fn collector(&self) -> &dyn Collector;

    /// Evaluate one node in the current frame.
    fn eval(&mut self, node: &Node) -> EvalResult;

    /// Call a function with already-evaluated arguments.
    fn call(&mut self, function: &FunctionRef, args: Vec<Value>) -> EvalResult;

    /// Read the value stored at `place`.
    fn load(&self, place: &Place) -> Result<Value, Fault>;

    /// Write `value` to `place`.
    fn store(&mut self, place: &Place, value: Value) -> Result<(), Fault>;

    /// Evaluate `node` and require a non-nil object.
    fn eval_object(&mut self, node: &Node, function: &str) -> Result<ObjectRef, ControlAction> {
        match self.eval(node)? {
            Value::Object(object) => Ok(object),
            Value::Nil => Err(Fault::nil_argument(function).into()),
            other => Err(Fault::bad_cast(other.kind_name(), "object").into()),
        }
    }
}
