//! The invocation stack: a bounded LIFO of execution contexts.

use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;

/// Call stack of the engine. Index `0` is the innermost (current) frame.
#[derive(Debug)]
pub struct ExecutionContextStack {
    contexts: Vec<ExecutionContext>,
    max_depth: usize,
}

impl ExecutionContextStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            contexts: Vec::new(),
            max_depth,
        }
    }

    /// Pushes a frame, failing once the depth cap is reached.
    pub fn push(&mut self, context: ExecutionContext) -> VmResult<()> {
        if self.contexts.len() >= self.max_depth {
            return Err(VmError::InvocationStackOverflow(format!(
                "depth {} reached",
                self.max_depth
            )));
        }
        self.contexts.push(context);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<ExecutionContext> {
        self.contexts.pop()
    }

    /// Frame `n` positions below the top.
    pub fn peek(&self, n: usize) -> Option<&ExecutionContext> {
        let index = self.contexts.len().checked_sub(n + 1)?;
        self.contexts.get(index)
    }

    pub fn peek_mut(&mut self, n: usize) -> Option<&mut ExecutionContext> {
        let index = self.contexts.len().checked_sub(n + 1)?;
        self.contexts.get_mut(index)
    }

    /// Removes the frame `n` positions below the top.
    pub fn remove(&mut self, n: usize) -> Option<ExecutionContext> {
        let index = self.contexts.len().checked_sub(n + 1)?;
        Some(self.contexts.remove(index))
    }

    /// The outermost frame.
    pub fn bottom(&self) -> Option<&ExecutionContext> {
        self.contexts.first()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Iterates from the outermost frame to the current one.
    pub fn iter(&self) -> std::slice::Iter<'_, ExecutionContext> {
        self.contexts.iter()
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
    }
}
