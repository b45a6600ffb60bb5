//! Evaluation stack module for the Neo Virtual Machine.
//!
//! This module represents a stack used by the Neo VM for executing scripts.
//! Indexes passed to [`EvaluationStack`] count from the top: `0` is the most
//! recently pushed item.

use crate::error::{VmError, VmResult};
use crate::stack_item::StackItem;

/// Represents the evaluation stack in the VM.
#[derive(Debug, Default)]
pub struct EvaluationStack {
    /// The underlying stack storage, bottom first.
    stack: Vec<StackItem>,
}

impl EvaluationStack {
    /// Creates a new, empty evaluation stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an item onto the stack.
    pub fn push(&mut self, item: StackItem) {
        self.stack.push(item);
    }

    /// Pops an item from the stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.stack.pop().ok_or_else(|| VmError::stack_underflow(1, 0))
    }

    /// Returns the item `n` positions below the top without removing it.
    pub fn peek(&self, n: usize) -> VmResult<&StackItem> {
        let index = self.index_from_top(n)?;
        Ok(&self.stack[index])
    }

    /// Replaces the item `n` positions below the top.
    pub fn set(&mut self, n: usize, item: StackItem) -> VmResult<()> {
        let index = self.index_from_top(n)?;
        self.stack[index] = item;
        Ok(())
    }

    /// Removes the item `n` positions below the top.
    pub fn remove(&mut self, n: usize) -> VmResult<StackItem> {
        let index = self.index_from_top(n)?;
        Ok(self.stack.remove(index))
    }

    /// Inserts an item so that it ends up `n` positions below the top.
    /// `n == len()` inserts at the bottom.
    pub fn insert(&mut self, n: usize, item: StackItem) -> VmResult<()> {
        if n > self.stack.len() {
            return Err(VmError::stack_underflow(n, self.stack.len()));
        }
        let index = self.stack.len() - n;
        self.stack.insert(index, item);
        Ok(())
    }

    /// Returns the number of items on the stack.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Removes the top `count` items, returned bottom first.
    pub fn take(&mut self, count: usize) -> VmResult<Vec<StackItem>> {
        if count > self.stack.len() {
            return Err(VmError::stack_underflow(count, self.stack.len()));
        }
        let start = self.stack.len() - count;
        Ok(self.stack.split_off(start))
    }

    /// Moves the top `count` items onto `target`, preserving their order.
    pub fn move_to(&mut self, target: &mut EvaluationStack, count: usize) -> VmResult<()> {
        let items = self.take(count)?;
        target.stack.extend(items);
        Ok(())
    }

    /// Pushes `items` in order, so the last one ends up on top.
    pub fn extend(&mut self, items: impl IntoIterator<Item = StackItem>) {
        self.stack.extend(items);
    }

    /// Clears the stack.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Iterates bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, StackItem> {
        self.stack.iter()
    }

    fn index_from_top(&self, n: usize) -> VmResult<usize> {
        if n >= self.stack.len() {
            return Err(VmError::stack_underflow(n + 1, self.stack.len()));
        }
        Ok(self.stack.len() - 1 - n)
    }
}
