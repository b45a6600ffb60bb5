//! Reference-cycle cleanup for compound stack items.
//!
//! Containers are shared `Rc` handles, so a script can make an array that
//! holds itself (directly or through other containers) and the storage would
//! never be freed. Every container that receives another container is
//! recorded here through a weak handle. When the session ends, each recorded
//! container that can reach itself is emptied, which breaks the cycle.

use crate::stack_item::{Array, Map, StackItem, Struct};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// Entry count below which the tracker never prunes.
const MIN_PRUNE_AT: usize = 64;

type ListStorage = RefCell<Vec<StackItem>>;
type MapStorage = RefCell<Vec<(StackItem, StackItem)>>;

#[derive(Debug)]
enum Tracked {
    Array(Weak<ListStorage>),
    Struct(Weak<ListStorage>),
    Map(Weak<MapStorage>),
}

impl Tracked {
    fn of(item: &StackItem) -> Option<Self> {
        match item {
            StackItem::Array(array) => Some(Self::Array(Rc::downgrade(array.storage()))),
            StackItem::Struct(item) => Some(Self::Struct(Rc::downgrade(item.storage()))),
            StackItem::Map(map) => Some(Self::Map(Rc::downgrade(map.storage()))),
            _ => None,
        }
    }

    fn address(&self) -> *const () {
        match self {
            Self::Array(weak) | Self::Struct(weak) => weak.as_ptr() as *const (),
            Self::Map(weak) => weak.as_ptr() as *const (),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Array(weak) | Self::Struct(weak) => weak.strong_count() > 0,
            Self::Map(weak) => weak.strong_count() > 0,
        }
    }

    fn upgrade(&self) -> Option<StackItem> {
        match self {
            Self::Array(weak) => weak
                .upgrade()
                .map(|rc| StackItem::Array(Array::from_storage(rc))),
            Self::Struct(weak) => weak
                .upgrade()
                .map(|rc| StackItem::Struct(Struct::from_storage(rc))),
            Self::Map(weak) => weak
                .upgrade()
                .map(|rc| StackItem::Map(Map::from_storage(rc))),
        }
    }
}

/// Identity of a container's shared storage.
fn address(item: &StackItem) -> Option<*const ()> {
    match item {
        StackItem::Array(array) => Some(Rc::as_ptr(array.storage()) as *const ()),
        StackItem::Struct(item) => Some(Rc::as_ptr(item.storage()) as *const ()),
        StackItem::Map(map) => Some(Rc::as_ptr(map.storage()) as *const ()),
        _ => None,
    }
}

/// Container children of `item`. Map keys are always primitive.
fn compound_children(item: &StackItem) -> Vec<StackItem> {
    let children = match item {
        StackItem::Array(array) => array.to_vec(),
        StackItem::Struct(item) => item.to_vec(),
        StackItem::Map(map) => map.values(),
        _ => Vec::new(),
    };
    children.into_iter().filter(StackItem::is_compound).collect()
}

/// True when `item` is reachable from its own children.
fn reaches_itself(item: &StackItem) -> bool {
    let Some(origin) = address(item) else {
        return false;
    };
    let mut visited = HashSet::new();
    let mut pending = compound_children(item);

    while let Some(next) = pending.pop() {
        let Some(current) = address(&next) else {
            continue;
        };
        if current == origin {
            return true;
        }
        if visited.insert(current) {
            pending.extend(compound_children(&next));
        }
    }
    false
}

fn clear(item: &StackItem) {
    match item {
        StackItem::Array(array) => array.clear(),
        StackItem::Struct(item) => item.clear(),
        StackItem::Map(map) => map.clear(),
        _ => {}
    }
}

/// Weak registry of containers that hold other containers.
#[derive(Debug)]
pub struct CompoundTracker {
    tracked: Vec<Tracked>,
    prune_at: usize,
}

impl Default for CompoundTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompoundTracker {
    pub fn new() -> Self {
        Self {
            tracked: Vec::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }

    /// Records `container`. Primitives are ignored.
    pub fn track(&mut self, container: &StackItem) {
        let Some(entry) = Tracked::of(container) else {
            return;
        };
        if self.tracked.len() >= self.prune_at {
            self.prune();
        }
        self.tracked.push(entry);
    }

    /// Number of recorded containers that are still alive.
    pub fn live_count(&self) -> usize {
        self.tracked.iter().filter(|entry| entry.is_alive()).count()
    }

    /// Drops dead and duplicate entries.
    fn prune(&mut self) {
        let mut seen = HashSet::new();
        self.tracked
            .retain(|entry| entry.is_alive() && seen.insert(entry.address()));
        self.prune_at = MIN_PRUNE_AT.max(self.tracked.len() * 2);
    }

    /// Empties every recorded container that can reach itself and forgets the
    /// rest. Returns the number of containers emptied.
    pub fn release(&mut self) -> usize {
        let tracked = std::mem::take(&mut self.tracked);
        self.prune_at = MIN_PRUNE_AT;

        let mut seen = HashSet::new();
        let cyclic: Vec<StackItem> = tracked
            .iter()
            .filter(|entry| seen.insert(entry.address()))
            .filter_map(Tracked::upgrade)
            .filter(reaches_itself)
            .collect();

        for item in &cyclic {
            clear(item);
        }
        if !cyclic.is_empty() {
            log::debug!("released {} cyclic containers", cyclic.len());
        }
        cyclic.len()
    }
}

impl Drop for CompoundTracker {
    fn drop(&mut self) {
        self.release();
    }
}
