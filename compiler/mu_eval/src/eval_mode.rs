//! Evaluation policy.
//!
//! `EvalMode` picks the recursion policy of a thread; `EvalConfig` bundles
//! it with the per-thread knobs a host may override.

/// How deep a thread may recurse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Deep recursion; the native stack grows on demand up to
    /// [`EvalMode::INTERPRET_DEPTH`] calls.
    #[default]
    Interpret,
    /// Calls deeper than `max_depth` raise the out-of-stack-space fault.
    Bounded { max_depth: usize },
}

impl EvalMode {
    /// Call depth `Interpret` allows on native targets.
    pub const INTERPRET_DEPTH: usize = 10_000;

    /// Maximum call depth, or `None` for unlimited.
    ///
    /// `Interpret` is capped at 200 on WASM, where the stack cannot grow.
    #[inline]
    pub fn max_recursion_depth(&self) -> Option<usize> {
        match self {
            Self::Interpret => {
                #[cfg(target_arch = "wasm32")]
                {
                    Some(200)
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    Some(Self::INTERPRET_DEPTH)
                }
            }
            Self::Bounded { max_depth } => Some(*max_depth),
        }
    }
}

/// Per-thread evaluation settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    pub mode: EvalMode,
    /// Overrides the mode's depth limit when set.
    pub max_call_depth: Option<usize>,
    /// Value-stack slots reserved up front.
    pub stack_size: usize,
}

impl EvalConfig {
    pub const DEFAULT_STACK_SIZE: usize = 1024;

    /// Effective call depth limit.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_call_depth.or_else(|| self.mode.max_recursion_depth())
    }

    #[must_use]
    pub fn with_mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            mode: EvalMode::default(),
            max_call_depth: None,
            stack_size: Self::DEFAULT_STACK_SIZE,
        }
    }
}
