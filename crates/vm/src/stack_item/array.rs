//! Array stack item implementation for the Neo Virtual Machine.
//!
//! Arrays have reference semantics: cloning an [`Array`] handle aliases the
//! same storage, which is what DUP and container writes do.

use crate::error::{VmError, VmResult};
use crate::stack_item::StackItem;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Represents an array of stack items in the VM.
#[derive(Clone, Default)]
pub struct Array {
    items: Rc<RefCell<Vec<StackItem>>>,
}

impl Array {
    /// Creates a new array with the specified items.
    pub fn new(items: Vec<StackItem>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// Borrows the items in the array.
    pub fn items(&self) -> Ref<'_, Vec<StackItem>> {
        self.items.borrow()
    }

    /// Copies out the element handles.
    pub fn to_vec(&self) -> Vec<StackItem> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Gets the item at the specified index.
    pub fn get(&self, index: usize) -> Option<StackItem> {
        self.items.borrow().get(index).cloned()
    }

    /// Replaces the item at `index`.
    pub fn set(&self, index: usize, item: StackItem) -> VmResult<()> {
        let old = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| {
                VmError::invalid_parameter_msg(format!("index {index} out of range for {len}"))
            })?;
            std::mem::replace(slot, item)
        };
        drop(old);
        Ok(())
    }

    /// Inserts an item at `index`, shifting later items.
    pub fn insert(&self, index: usize, item: StackItem) -> VmResult<()> {
        let mut items = self.items.borrow_mut();
        if index > items.len() {
            return Err(VmError::invalid_parameter_msg(format!(
                "insert index {index} out of range for {}",
                items.len()
            )));
        }
        items.insert(index, item);
        Ok(())
    }

    /// Adds an item to the end of the array.
    pub fn add(&self, item: StackItem) {
        self.items.borrow_mut().push(item);
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&self, index: usize) -> VmResult<StackItem> {
        let mut items = self.items.borrow_mut();
        if index >= items.len() {
            return Err(VmError::invalid_parameter_msg(format!(
                "remove index {index} out of range for {}",
                items.len()
            )));
        }
        Ok(items.remove(index))
    }

    /// Position of the first element equal to `item`.
    pub fn index_of(&self, item: &StackItem) -> Option<usize> {
        self.to_vec().iter().position(|candidate| candidate.equals(item))
    }

    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.items.borrow_mut());
        drop(old);
    }

    pub fn reverse(&self) {
        self.items.borrow_mut().reverse();
    }

    /// Returns true when both handles alias the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    /// Number of live handles to this array.
    pub fn claims(&self) -> usize {
        Rc::strong_count(&self.items)
    }

    pub(crate) fn storage(&self) -> &Rc<RefCell<Vec<StackItem>>> {
        &self.items
    }

    pub(crate) fn from_storage(items: Rc<RefCell<Vec<StackItem>>>) -> Self {
        Self { items }
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({:p}, len={})", Rc::as_ptr(&self.items), self.len())
    }
}
