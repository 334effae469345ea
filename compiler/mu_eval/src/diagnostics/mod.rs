//! Call-chain tracking for the evaluator.
//!
//! Every activation pushes a `CallFrame` onto the thread's `CallStack`; the
//! depth check lives in `push`. When a fault surfaces inside an activation
//! the frames are snapshotted into a `Backtrace` before the frame pops.

use mu_ir::{Name, StringInterner};
use mu_types::{Backtrace, BacktraceFrame, Fault};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// Interned function name.
    pub name: Name,
}

/// Live call stack of one evaluation thread.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: Option<usize>,
}

impl CallStack {
    /// `max_depth` is `None` for unlimited depth.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call frame, checking the depth limit.
    ///
    /// The frame is not pushed when the limit is reached.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), Fault> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(Fault::out_of_stack_space(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(!self.frames.is_empty(), "CallStack::pop() called on empty stack");
        self.frames.pop();
    }

    /// Drop frames above `depth`, used when unwinding to a catch boundary.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Snapshot of the current chain, most recent call first.
    pub fn capture(&self, interner: &StringInterner) -> Backtrace {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|frame| BacktraceFrame {
                name: interner.lookup(frame.name).to_string(),
            })
            .collect();
        Backtrace::new(frames)
    }

    /// Attach a backtrace of this stack unless the fault already has one.
    pub fn attach_backtrace(&self, fault: Fault, interner: &StringInterner) -> Fault {
        if self.frames.is_empty() || fault.backtrace.is_some() {
            return fault;
        }
        fault.with_backtrace(self.capture(interner))
    }
}

#[cfg(test)]
mod tests;
