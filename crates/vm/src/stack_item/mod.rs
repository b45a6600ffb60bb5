//! Stack item module for the Neo Virtual Machine.
//!
//! This module provides the stack item types used in the Neo VM.

pub mod array;
pub mod compound_tracker;
pub mod interop_interface;
pub mod map;
#[allow(clippy::module_inception)]
pub mod stack_item;
pub mod stack_item_type;
pub mod struct_item;

pub use array::Array;
pub use compound_tracker::CompoundTracker;
pub use interop_interface::InteropInterface;
pub use map::Map;
pub use stack_item::StackItem;
pub use stack_item_type::StackItemType;
pub use struct_item::Struct;
