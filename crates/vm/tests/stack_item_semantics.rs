//! Value and reference semantics of stack items as scripts observe them.

use neo_legacy_vm::{ExecutionEngine, OpCode, ScriptBuilder, StackItem, StackItemType, VMState};

fn run(sb: &ScriptBuilder) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new();
    engine.load_script(sb.to_array(), -1).expect("loads");
    assert_eq!(engine.execute(10_000), VMState::HALT);
    engine
}

fn equal_after(build: impl Fn(&mut ScriptBuilder)) -> bool {
    let mut sb = ScriptBuilder::new();
    build(&mut sb);
    sb.emit_opcode(OpCode::EQUAL);
    run(&sb).result_stack().peek(0).expect("result").get_boolean()
}

#[test]
fn test_structs_compare_by_value() {
    assert!(equal_after(|sb| {
        sb.emit_push_int(2)
            .emit_opcode(OpCode::NEWSTRUCT)
            .emit_push_int(2)
            .emit_opcode(OpCode::NEWSTRUCT);
    }));
}

#[test]
fn test_arrays_compare_by_identity() {
    assert!(!equal_after(|sb| {
        sb.emit_push_int(2)
            .emit_opcode(OpCode::NEWARRAY)
            .emit_push_int(2)
            .emit_opcode(OpCode::NEWARRAY);
    }));
    assert!(equal_after(|sb| {
        sb.emit_push_int(2)
            .emit_opcode(OpCode::NEWARRAY)
            .emit_opcode(OpCode::DUP);
    }));
}

#[test]
fn test_primitives_compare_by_bytes() {
    assert!(equal_after(|sb| {
        sb.emit_push_int(1).emit_push(&[0x01]);
    }));
    assert!(equal_after(|sb| {
        sb.emit_push_bool(false).emit_push(&[]);
    }));
    assert!(!equal_after(|sb| {
        sb.emit_push_int(1).emit_push(&[0x01, 0x00]);
    }));
}

#[test]
fn test_dup_shares_the_container() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(0)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::DUP);
    let engine = run(&sb);

    let top = engine.result_stack().peek(0).expect("array");
    assert_eq!(top.item_type(), StackItemType::Array);
    assert_eq!(top.claims(), 2);
}

#[test]
fn test_newstruct_from_array_copies_shallowly() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(1)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::DUP)
        .emit_opcode(OpCode::NEWSTRUCT)
        .emit_opcode(OpCode::DUP)
        .emit_push_int(0)
        .emit_push_int(5)
        .emit_opcode(OpCode::SETITEM);
    let engine = run(&sb);

    let converted = engine.result_stack().peek(0).expect("struct");
    assert_eq!(converted.item_type(), StackItemType::Struct);
    assert!(converted.as_list().expect("items")[0].equals(&StackItem::from_int(5)));

    let original = engine.result_stack().peek(1).expect("array");
    assert_eq!(original.item_type(), StackItemType::Array);
    assert!(matches!(
        original.as_list().expect("items")[0],
        StackItem::Boolean(false)
    ));
}

#[test]
fn test_unpack_then_pack_preserves_order() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(3)
        .emit_push_int(2)
        .emit_push_int(1)
        .emit_push_int(3)
        .emit_opcode(OpCode::PACK)
        .emit_opcode(OpCode::UNPACK)
        .emit_opcode(OpCode::PACK);
    let engine = run(&sb);

    let items = engine
        .result_stack()
        .peek(0)
        .expect("array")
        .as_list()
        .expect("items");
    let values: Vec<i32> = items
        .iter()
        .map(|item| item.get_int32().expect("integer"))
        .collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_pushed_item_round_trips_through_builder() {
    let map = StackItem::new_map();
    if let StackItem::Map(inner) = &map {
        inner.set(StackItem::from_int(1), StackItem::from_bytes(b"one".to_vec()));
        inner.set(
            StackItem::from_bytes(b"list".to_vec()),
            StackItem::new_struct(vec![StackItem::from_bool(true), StackItem::from_int(-7)]),
        );
    }

    let mut sb = ScriptBuilder::new();
    sb.emit_push_stack_item(&map).expect("pushable");
    let engine = run(&sb);

    let rebuilt = engine.result_stack().peek(0).expect("map");
    let StackItem::Map(rebuilt) = rebuilt else {
        panic!("expected a map, got {rebuilt:?}");
    };
    assert_eq!(rebuilt.len(), 2);
    let one = rebuilt.get(&StackItem::from_int(1)).expect("entry");
    assert!(one.equals(&StackItem::from_bytes(b"one".to_vec())));
    let list = rebuilt
        .get(&StackItem::from_bytes(b"list".to_vec()))
        .expect("entry");
    assert!(list.equals(&StackItem::new_struct(vec![
        StackItem::from_bool(true),
        StackItem::from_int(-7),
    ])));
}

#[test]
fn test_self_containing_array_freed_with_engine() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(0)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::DUP)
        .emit_opcode(OpCode::DUP)
        .emit_opcode(OpCode::APPEND);
    let engine = run(&sb);

    let handle = engine.result_stack().peek(0).expect("array").clone();
    // Ours, the result stack and the array's own slot.
    assert_eq!(handle.claims(), 3);

    drop(engine);
    assert_eq!(handle.claims(), 1);
    assert!(handle.as_list().expect("items").is_empty());
}

#[test]
fn test_cycle_through_map_freed_on_clean() {
    // map[1] = array, array.append(map)
    let mut sb = ScriptBuilder::new();
    sb.emit_opcode(OpCode::NEWMAP)
        .emit_push_int(0)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::OVER)
        .emit_push_int(1)
        .emit_push_int(2)
        .emit_opcode(OpCode::PICK)
        .emit_opcode(OpCode::SETITEM)
        .emit_opcode(OpCode::OVER)
        .emit_opcode(OpCode::APPEND);
    let mut engine = run(&sb);

    let map = engine.result_stack().peek(0).expect("map").clone();
    assert_eq!(map.item_type(), StackItemType::Map);
    assert_eq!(map.claims(), 3);

    engine.clean(1);
    assert_eq!(map.claims(), 1);
}

#[test]
fn test_acyclic_results_survive_engine_drop() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(0)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::DUP)
        .emit_push_int(0)
        .emit_opcode(OpCode::NEWARRAY)
        .emit_opcode(OpCode::APPEND);
    let engine = run(&sb);

    let outer = engine.result_stack().peek(0).expect("outer").clone();
    drop(engine);
    assert_eq!(outer.claims(), 1);
    assert_eq!(outer.as_list().expect("items").len(), 1);
}

#[test]
fn test_host_registered_cycle_freed() {
    let array = StackItem::new_array(Vec::new());
    let mut engine = ExecutionEngine::new();
    if let StackItem::Array(inner) = &array {
        inner.add(array.clone());
    }
    engine.track_container(&array);
    assert_eq!(array.claims(), 2);

    drop(engine);
    assert_eq!(array.claims(), 1);
}
