//! Struct stack item implementation for the Neo Virtual Machine.
//!
//! A struct is an ordered list like [`Array`](super::Array) but with value
//! semantics: whenever a struct is written into a second logical slot it is
//! deep-cloned first. Clone and equality walk nested structs with an explicit
//! work-list bounded by a caller-supplied item cap.

use crate::error::{VmError, VmResult};
use crate::stack_item::StackItem;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Represents a struct in the VM.
#[derive(Clone, Default)]
pub struct Struct {
    items: Rc<RefCell<Vec<StackItem>>>,
}

impl Struct {
    /// Creates a new struct with the specified items.
    pub fn new(items: Vec<StackItem>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<StackItem>> {
        self.items.borrow()
    }

    pub fn to_vec(&self) -> Vec<StackItem> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<StackItem> {
        self.items.borrow().get(index).cloned()
    }

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

    pub fn add(&self, item: StackItem) {
        self.items.borrow_mut().push(item);
    }

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

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    pub fn claims(&self) -> usize {
        Rc::strong_count(&self.items)
    }

    pub(crate) fn storage(&self) -> &Rc<RefCell<Vec<StackItem>>> {
        &self.items
    }

    pub(crate) fn from_storage(items: Rc<RefCell<Vec<StackItem>>>) -> Self {
        Self { items }
    }

    /// Copies this struct and every nested struct. Arrays, maps and primitives
    /// inside are shared with the original.
    ///
    /// Fails once more than `limit` elements have been visited.
    pub fn deep_clone(&self, limit: usize) -> VmResult<Struct> {
        let root = Struct::default();
        let mut pending = vec![(self.clone(), root.clone())];
        let mut visited = 0usize;

        while let Some((source, target)) = pending.pop() {
            let items = source.to_vec();
            visited += items.len();
            if visited > limit {
                return Err(VmError::item_too_large(visited, limit));
            }

            let copied = items
                .into_iter()
                .map(|item| match item {
                    StackItem::Struct(child) => {
                        let copy = Struct::default();
                        pending.push((child, copy.clone()));
                        StackItem::Struct(copy)
                    }
                    other => other,
                })
                .collect();
            *target.items.borrow_mut() = copied;
        }

        Ok(root)
    }

    /// Element-wise structural equality, descending into nested structs.
    ///
    /// Fails once more than `limit` element pairs have been compared.
    pub fn equals(&self, other: &Struct, limit: usize) -> VmResult<bool> {
        let mut pending = vec![(self.clone(), other.clone())];
        let mut visited = 0usize;

        while let Some((a, b)) = pending.pop() {
            if a.ptr_eq(&b) {
                continue;
            }
            let (left, right) = (a.to_vec(), b.to_vec());
            if left.len() != right.len() {
                return Ok(false);
            }
            visited += left.len();
            if visited > limit {
                return Err(VmError::item_too_large(visited, limit));
            }
            for (x, y) in left.into_iter().zip(right) {
                match (x, y) {
                    (StackItem::Struct(s), StackItem::Struct(t)) => pending.push((s, t)),
                    (x, y) => {
                        if !x.equals(&y) {
                            return Ok(false);
                        }
                    }
                }
            }
        }

        Ok(true)
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Struct({:p}, len={})", Rc::as_ptr(&self.items), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack_item::Array;

    #[test]
    fn test_deep_clone_copies_nested_structs() {
        let inner = Struct::new(vec![StackItem::from_int(1)]);
        let shared = Array::new(vec![]);
        let outer = Struct::new(vec![
            StackItem::Struct(inner.clone()),
            StackItem::Array(shared.clone()),
        ]);

        let copy = outer.deep_clone(1024).expect("clone");
        assert!(!copy.ptr_eq(&outer));
        assert!(copy.equals(&outer, 1024).expect("compare"));

        // Nested struct is independent.
        inner.set(0, StackItem::from_int(9)).expect("set");
        let copied_inner = match copy.get(0) {
            Some(StackItem::Struct(s)) => s,
            other => panic!("expected struct, got {other:?}"),
        };
        assert_eq!(copied_inner.get(0).expect("item").get_int32().expect("int"), 1);

        // Arrays stay aliased.
        match copy.get(1) {
            Some(StackItem::Array(a)) => assert!(a.ptr_eq(&shared)),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_clone_respects_limit() {
        let outer = Struct::new(vec![StackItem::from_int(0); 10]);
        assert!(outer.deep_clone(9).is_err());
        assert!(outer.deep_clone(10).is_ok());
    }

    #[test]
    fn test_equality_is_structural() {
        let a = Struct::new(vec![StackItem::from_int(1), StackItem::from_bytes(vec![2])]);
        let b = Struct::new(vec![StackItem::from_int(1), StackItem::from_bytes(vec![2])]);
        let c = Struct::new(vec![StackItem::from_int(1)]);
        assert!(a.equals(&b, 16).expect("compare"));
        assert!(!a.equals(&c, 16).expect("compare"));

        // Arrays inside compare by identity.
        let d = Struct::new(vec![StackItem::Array(Array::default())]);
        let e = Struct::new(vec![StackItem::Array(Array::default())]);
        assert!(!d.equals(&e, 16).expect("compare"));
    }
}
