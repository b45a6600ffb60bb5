//! Map stack item implementation for the Neo Virtual Machine.
//!
//! An association list keyed by value equality. Lookups are linear scans and
//! iteration follows insertion order.

use crate::stack_item::StackItem;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Represents a map of stack items in the VM.
#[derive(Clone, Default)]
pub struct Map {
    entries: Rc<RefCell<Vec<(StackItem, StackItem)>>>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn position(&self, key: &StackItem) -> Option<usize> {
        self.entries.borrow().iter().position(|(k, _)| k.equals(key))
    }

    /// Gets the value stored under `key`.
    pub fn get(&self, key: &StackItem) -> Option<StackItem> {
        let index = self.position(key)?;
        self.entries.borrow().get(index).map(|(_, v)| v.clone())
    }

    pub fn contains_key(&self, key: &StackItem) -> bool {
        self.position(key).is_some()
    }

    /// Inserts or replaces the value under `key`. Replacing keeps the entry's
    /// original position.
    pub fn set(&self, key: StackItem, value: StackItem) {
        let old = match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries.borrow_mut()[index].1, value)),
            None => {
                self.entries.borrow_mut().push((key, value));
                None
            }
        };
        drop(old);
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&self, key: &StackItem) -> Option<StackItem> {
        let index = self.position(key)?;
        let (_, value) = self.entries.borrow_mut().remove(index);
        Some(value)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<StackItem> {
        self.entries.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Values in insertion order.
    pub fn values(&self) -> Vec<StackItem> {
        self.entries.borrow().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn claims(&self) -> usize {
        Rc::strong_count(&self.entries)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.entries.borrow_mut());
        drop(old);
    }

    pub(crate) fn storage(&self) -> &Rc<RefCell<Vec<(StackItem, StackItem)>>> {
        &self.entries
    }

    pub(crate) fn from_storage(entries: Rc<RefCell<Vec<(StackItem, StackItem)>>>) -> Self {
        Self { entries }
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map({:p}, len={})", Rc::as_ptr(&self.entries), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_compare_by_value() {
        let map = Map::new();
        map.set(StackItem::from_int(1), StackItem::from_bytes(b"one".to_vec()));
        // Integer 1 and byte array [1] share a byte view.
        assert!(map.contains_key(&StackItem::from_bytes(vec![1])));

        map.set(StackItem::from_bytes(vec![1]), StackItem::from_bool(true));
        assert_eq!(map.len(), 1);
        assert!(map.get(&StackItem::from_int(1)).expect("value").get_boolean());
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let map = Map::new();
        for i in 0..4 {
            map.set(StackItem::from_int(i), StackItem::from_int(i * 10));
        }
        assert!(map.remove(&StackItem::from_int(1)).is_some());
        assert!(map.remove(&StackItem::from_int(1)).is_none());

        let keys: Vec<i32> = map.keys().iter().map(|k| k.get_int32().expect("int")).collect();
        assert_eq!(keys, vec![0, 2, 3]);
        let values: Vec<i32> = map.values().iter().map(|v| v.get_int32().expect("int")).collect();
        assert_eq!(values, vec![0, 20, 30]);
    }
}
