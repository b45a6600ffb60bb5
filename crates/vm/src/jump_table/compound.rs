//! Compound-type operations for the Neo Virtual Machine.
//!
//! This module provides the array, struct and map handlers for the Neo VM.
//! Arrays and maps are shared by reference; a struct is deep-cloned whenever
//! it is copied into another slot.

use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
    use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{context_mut, non_negative, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::{Array, StackItem, Struct};

/// Registers the compound-type operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::ARRAYSIZE, array_size);
    jump_table.register(OpCode::PACK, pack);
    jump_table.register(OpCode::UNPACK, unpack);
    jump_table.register(OpCode::PICKITEM, pick_item);
    jump_table.register(OpCode::SETITEM, set_item);
    jump_table.register(OpCode::NEWARRAY, new_array);
    jump_table.register(OpCode::NEWSTRUCT, new_struct);
    jump_table.register(OpCode::NEWMAP, new_map);
    jump_table.register(OpCode::APPEND, append);
    jump_table.register(OpCode::REVERSE, reverse);
    jump_table.register(OpCode::REMOVE, remove);
    jump_table.register(OpCode::HASKEY, has_key);
    jump_table.register(OpCode::KEYS, keys);
    jump_table.register(OpCode::VALUES, values);
}

/// Borrowed view over the two list kinds.
enum List<'a> {
    Array(&'a Array),
    Struct(&'a Struct),
}

impl<'a> List<'a> {
    fn of(item: &'a StackItem) -> Option<Self> {
        match item {
            StackItem::Array(array) => Some(Self::Array(array)),
            StackItem::Struct(item) => Some(Self::Struct(item)),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Array(array) => array.len(),
            Self::Struct(item) => item.len(),
        }
    }

    fn get(&self, index: usize) -> Option<StackItem> {
        match self {
            Self::Array(array) => array.get(index),
            Self::Struct(item) => item.get(index),
        }
    }

    fn set(&self, index: usize, value: StackItem) -> VmResult<()> {
        match self {
            Self::Array(array) => array.set(index, value),
            Self::Struct(item) => item.set(index, value),
        }
    }

    fn add(&self, value: StackItem) {
        match self {
            Self::Array(array) => array.add(value),
            Self::Struct(item) => item.add(value),
        }
    }

    fn remove_at(&self, index: usize) -> VmResult<StackItem> {
        match self {
            Self::Array(array) => array.remove_at(index),
            Self::Struct(item) => item.remove_at(index),
        }
    }

    fn reverse(&self) {
        match self {
            Self::Array(array) => array.reverse(),
            Self::Struct(item) => item.reverse(),
        }
    }

    fn to_vec(&self) -> Vec<StackItem> {
        match self {
            Self::Array(array) => array.to_vec(),
            Self::Struct(item) => item.to_vec(),
        }
    }
}

/// Deep-clones a struct value; any other item is returned as is.
fn copy_value(item: StackItem, limit: usize) -> VmResult<StackItem> {
    match item {
        StackItem::Struct(value) => Ok(StackItem::Struct(value.deep_clone(limit)?)),
        other => Ok(other),
    }
}

/// Pops a map key or list index. Compound keys are rejected.
fn pop_key(context: &mut ExecutionContext) -> VmResult<StackItem> {
    let key = context.pop()?;
    if key.is_compound() {
        return Err(VmError::invalid_type_msg(format!(
            "{:?} cannot be used as a key",
            key.item_type()
        )));
    }
    Ok(key)
}

fn index_in(key: &StackItem, len: usize) -> VmResult<usize> {
    let index = key.get_int32()?;
    match usize::try_from(index) {
        Ok(index) if index < len => Ok(index),
        _ => Err(VmError::invalid_parameter_msg(format!(
            "index {index} out of range for {len}"
        ))),
    }
}

fn not_a_collection(item: &StackItem) -> VmError {
    VmError::invalid_type_msg(format!("{:?} is not a collection", item.item_type()))
}

/// Implements the ARRAYSIZE operation.
fn array_size(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.pop()?;
    let size = match (&item, List::of(&item)) {
        (_, Some(list)) => list.len(),
        (StackItem::Map(map), None) => map.len(),
        (other, None) => other.byte_array_size()?,
    };
    context.push(StackItem::from_int(size));
    Ok(())
}

/// Implements the PACK operation. The first popped item becomes index 0.
fn pack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let max = engine.limits().max_array_size;
    let context = context_mut(engine)?;

    let size = non_negative(context.pop()?.get_int32()?, "PACK size")?;
    let depth = context.evaluation_stack().len();
    if size > depth || size > max {
        return Err(VmError::invalid_parameter_msg(format!(
            "PACK size {size} exceeds depth {depth} or limit {max}"
        )));
    }

    let items = (0..size)
        .map(|_| context.pop())
        .collect::<VmResult<Vec<_>>>()?;
    context.push(StackItem::new_array(items));
    Ok(())
}

/// Implements the UNPACK operation.
fn unpack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let item = context.pop()?;
    let list = List::of(&item).ok_or_else(|| not_a_collection(&item))?;

    let items = list.to_vec();
    let count = items.len();
    for element in items.into_iter().rev() {
        context.push(element);
    }
    context.push(StackItem::from_int(count));
    Ok(())
}

/// Implements the PICKITEM operation.
fn pick_item(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limit = engine.limits().traversal_limit();
    let context = context_mut(engine)?;

    let key = pop_key(context)?;
    let container = context.pop()?;

    let value = match (&container, List::of(&container)) {
        (_, Some(list)) => {
            let index = index_in(&key, list.len())?;
            list.get(index)
                .ok_or_else(|| VmError::invalid_parameter_msg(format!("index {index} vanished")))?
        }
        (StackItem::Map(map), None) => map
            .get(&key)
            .ok_or_else(|| VmError::invalid_parameter_msg("key not found in map"))?,
        (other, None) => return Err(not_a_collection(other)),
    };

    context.push(copy_value(value, limit)?);
    Ok(())
}

/// Implements the SETITEM operation.
fn set_item(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;

    let value = copy_value(context.pop()?, limits.traversal_limit())?;
    let key = pop_key(context)?;
    let container = context.pop()?;
    let nests = value.is_compound();

    match (&container, List::of(&container)) {
        (_, Some(list)) => {
            let index = index_in(&key, list.len())?;
            list.set(index, value)?;
        }
        (StackItem::Map(map), None) => {
            if !map.contains_key(&key) && map.len() >= limits.max_array_size {
                return Err(VmError::item_too_large(map.len() + 1, limits.max_array_size));
            }
            map.set(key, value);
        }
        (other, None) => return Err(not_a_collection(other)),
    }

    if nests {
        engine.track_container(&container);
    }
    Ok(())
}

/// Pops the NEWARRAY/NEWSTRUCT operand. An existing array or struct comes
/// back alone; an element count comes back with that many `false` items.
fn pop_list_source(engine: &mut ExecutionEngine) -> VmResult<(StackItem, Option<Vec<StackItem>>)> {
    let max = engine.limits().max_array_size;
    let context = context_mut(engine)?;
    let item = context.pop()?;

    if item.as_list().is_some() {
        return Ok((item, None));
    }

    let count = non_negative(item.get_int32()?, "element count")?;
    if count > max {
        return Err(VmError::item_too_large(count, max));
    }
    Ok((item, Some(vec![StackItem::from_bool(false); count])))
}

/// Implements the NEWARRAY operation.
fn new_array(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (source, fresh) = pop_list_source(engine)?;
    let result = match (source, fresh) {
        (_, Some(items)) => StackItem::new_array(items),
        (StackItem::Struct(item), None) => StackItem::new_array(item.to_vec()),
        (array, None) => array,
    };
    context_mut(engine)?.push(result);
    Ok(())
}

/// Implements the NEWSTRUCT operation.
fn new_struct(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (source, fresh) = pop_list_source(engine)?;
    let result = match (source, fresh) {
        (_, Some(items)) => StackItem::new_struct(items),
        (StackItem::Array(array), None) => StackItem::new_struct(array.to_vec()),
        (item, None) => item,
    };
    context_mut(engine)?.push(result);
    Ok(())
}

/// Implements the NEWMAP operation.
fn new_map(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    context.push(StackItem::new_map());
    Ok(())
}

/// Implements the APPEND operation.
fn append(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limits = *engine.limits();
    let context = context_mut(engine)?;

    let value = copy_value(context.pop()?, limits.traversal_limit())?;
    let container = context.pop()?;
    let list = List::of(&container).ok_or_else(|| not_a_collection(&container))?;

    if list.len() >= limits.max_array_size {
        return Err(VmError::item_too_large(list.len() + 1, limits.max_array_size));
    }
    let nests = value.is_compound();
    list.add(value);

    if nests {
        engine.track_container(&container);
    }
    Ok(())
}

/// Implements the REVERSE operation.
fn reverse(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    let container = context.pop()?;
    let list = List::of(&container).ok_or_else(|| not_a_collection(&container))?;
    list.reverse();
    Ok(())
}

/// Implements the REMOVE operation. Removing an absent map key is a no-op.
fn remove(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let key = pop_key(context)?;
    let container = context.pop()?;

    match (&container, List::of(&container)) {
        (_, Some(list)) => {
            let index = index_in(&key, list.len())?;
            list.remove_at(index)?;
            Ok(())
        }
        (StackItem::Map(map), None) => {
            map.remove(&key);
            Ok(())
        }
        (other, None) => Err(not_a_collection(other)),
    }
}

/// Implements the HASKEY operation.
fn has_key(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;

    let key = pop_key(context)?;
    let container = context.pop()?;

    let found = match (&container, List::of(&container)) {
        (_, Some(list)) => {
            let index = non_negative(key.get_int32()?, "HASKEY index")?;
            index < list.len()
        }
        (StackItem::Map(map), None) => map.contains_key(&key),
        (other, None) => return Err(not_a_collection(other)),
    };

    context.push(StackItem::from_bool(found));
    Ok(())
}

/// Implements the KEYS operation.
fn keys(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = context_mut(engine)?;
    match context.pop()? {
        StackItem::Map(map) => {
            context.push(StackItem::new_array(map.keys()));
            Ok(())
        }
        other => Err(VmError::invalid_type_msg(format!(
            "KEYS expects a map, got {:?}",
            other.item_type()
        ))),
    }
}

/// Implements the VALUES operation. Struct values are copied.
fn values(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let limit = engine.limits().traversal_limit();
    let context = context_mut(engine)?;

    let container = context.pop()?;
    let items = match (&container, List::of(&container)) {
        (_, Some(list)) => list.to_vec(),
        (StackItem::Map(map), None) => map.values(),
        (other, None) => return Err(not_a_collection(other)),
    };

    let values = items
        .into_iter()
        .map(|item| copy_value(item, limit))
        .collect::<VmResult<Vec<_>>>()?;
    context.push(StackItem::new_array(values));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::execution_engine::ExecutionEngine;
    use crate::stack_item::StackItem;
    use crate::vm_state::VMState;

    fn run(script: &[u8]) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new();
        engine.load_script(script.to_vec(), -1).expect("load");
        engine.execute(u64::MAX);
        engine
    }

    fn top(engine: &ExecutionEngine) -> StackItem {
        engine.result_stack().peek(0).expect("top").clone()
    }

    #[test]
    fn test_pack_unpack() {
        // PUSH3 PUSH2 PUSH1 PUSH3 PACK -> [1, 2, 3]
        let engine = run(&[0x53, 0x52, 0x51, 0x53, 0xC1]);
        assert_eq!(engine.state(), VMState::HALT);
        let items = top(&engine).as_list().expect("array");
        let values: Vec<i32> = items.iter().map(|i| i.get_int32().expect("int")).collect();
        assert_eq!(values, vec![1, 2, 3]);

        // ... UNPACK restores the original order with the count on top.
        let engine = run(&[0x53, 0x52, 0x51, 0x53, 0xC1, 0xC2]);
        let values: Vec<i32> = engine
            .result_stack()
            .iter()
            .map(|i| i.get_int32().expect("int"))
            .collect();
        assert_eq!(values, vec![3, 2, 1, 3]);
    }

    #[test]
    fn test_pack_beyond_depth_faults() {
        assert_eq!(run(&[0x51, 0x53, 0xC1]).state(), VMState::FAULT);
    }

    #[test]
    fn test_newarray_setitem_pickitem() {
        // PUSH2 NEWARRAY DUP PUSH0 PUSH7 SETITEM PUSH0 PICKITEM -> 7
        let engine = run(&[0x52, 0xC5, 0x76, 0x00, 0x57, 0xC4, 0x00, 0xC3]);
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(top(&engine).get_int32().expect("int"), 7);
    }

    #[test]
    fn test_pickitem_out_of_range_faults() {
        // PUSH1 NEWARRAY PUSH1 PICKITEM
        assert_eq!(run(&[0x51, 0xC5, 0x51, 0xC3]).state(), VMState::FAULT);
    }

    #[test]
    fn test_map_operations() {
        // NEWMAP DUP PUSH1 PUSH5 SETITEM DUP PUSH1 HASKEY
        let engine = run(&[0xC7, 0x76, 0x51, 0x55, 0xC4, 0x76, 0x51, 0xCB]);
        assert_eq!(engine.state(), VMState::HALT);
        assert!(top(&engine).get_boolean());

        // NEWMAP PUSH1 PICKITEM: missing key
        assert_eq!(run(&[0xC7, 0x51, 0xC3]).state(), VMState::FAULT);

        // NEWMAP NEWMAP PUSH1 SETITEM: compound key
        assert_eq!(run(&[0xC7, 0xC7, 0x51, 0xC4]).state(), VMState::FAULT);
    }

    #[test]
    fn test_keys_and_values() {
        // NEWMAP DUP PUSH1 PUSH5 SETITEM DUP KEYS SWAP VALUES
        let engine = run(&[0xC7, 0x76, 0x51, 0x55, 0xC4, 0x76, 0xCC, 0x7C, 0xCD]);
        assert_eq!(engine.state(), VMState::HALT);
        let values = engine.result_stack().peek(0).expect("values").as_list().expect("list");
        let keys = engine.result_stack().peek(1).expect("keys").as_list().expect("list");
        assert_eq!(keys.len(), 1);
        assert_eq!(values.len(), 1);
        assert_eq!(keys[0].get_int32().expect("int"), 1);
        assert_eq!(values[0].get_int32().expect("int"), 5);
    }

    #[test]
    fn test_append_reverse_remove() {
        // PUSH0 NEWARRAY DUP PUSH1 APPEND DUP PUSH2 APPEND DUP REVERSE DUP PUSH0 REMOVE
        let engine = run(&[
            0x00, 0xC5, 0x76, 0x51, 0xC8, 0x76, 0x52, 0xC8, 0x76, 0xC9, 0x76, 0x00, 0xCA,
        ]);
        assert_eq!(engine.state(), VMState::HALT);
        let items = top(&engine).as_list().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get_int32().expect("int"), 1);
    }

    #[test]
    fn test_newstruct_from_array_is_shallow_copy() {
        // PUSH2 NEWARRAY NEWSTRUCT
        let engine = run(&[0x52, 0xC5, 0xC6]);
        assert_eq!(engine.state(), VMState::HALT);
        let item = top(&engine);
        assert!(matches!(item, StackItem::Struct(_)));
        assert_eq!(item.as_list().expect("list").len(), 2);
    }

    #[test]
    fn test_keys_on_array_faults() {
        assert_eq!(run(&[0x51, 0xC5, 0xCC]).state(), VMState::FAULT);
    }
}
