use super::{Activation, Thread};
use crate::diagnostics::CallStack;
use crate::eval_mode::{EvalConfig, EvalMode};
use mu_types::{Collector, Context, RefCountedCollector};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Builder for [`Thread`].
pub struct ThreadBuilder<'ctx> {
    ctx: &'ctx Context,
    config: EvalConfig,
    collector: Option<Arc<dyn Collector>>,
}

impl<'ctx> ThreadBuilder<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            config: EvalConfig::default(),
            collector: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Limit nested calls, overriding the mode's own limit.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = Some(depth);
        self
    }

    /// Initial capacity of the value stack, in slots.
    #[must_use]
    pub fn stack_size(mut self, slots: usize) -> Self {
        self.config.stack_size = slots;
        self
    }

    #[must_use]
    pub fn collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn build(self) -> Thread<'ctx> {
        let collector = self
            .collector
            .unwrap_or_else(|| Arc::new(RefCountedCollector::new()));
        Thread {
            ctx: self.ctx,
            collector,
            stack: Vec::with_capacity(self.config.stack_size),
            frames: vec![Activation::TOP_LEVEL],
            next_activation: 1,
            call_stack: CallStack::new(self.config.max_depth()),
            config: self.config,
            dispatch_cache: FxHashMap::default(),
        }
    }
}
