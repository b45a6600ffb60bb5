//! Cross-script calls and host callbacks.

use neo_legacy_crypto::hash::hash160;
use neo_legacy_vm::{ExecutionEngine, OpCode, ScriptBuilder, StackItem, VMState};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// PUSH3 ADD
const ADD_THREE: [u8; 2] = [0x53, 0x93];

fn result_ints(engine: &ExecutionEngine) -> Vec<i32> {
    engine
        .result_stack()
        .iter()
        .map(|item| item.get_int32().expect("integer result"))
        .collect()
}

/// Registers a loader that serves `script` for any hash and counts its calls.
fn serve(engine: &mut ExecutionEngine, script: &[u8]) -> Rc<Cell<usize>> {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let script = script.to_vec();
    engine.set_load_script(move |engine, _hash, _dynamic, rvcount| {
        counter.set(counter.get() + 1);
        engine.load_script(script.clone(), rvcount).is_ok()
    });
    calls
}

#[test]
fn test_appcall_loads_through_host_then_cache() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(2)
        .emit_app_call(Some(&hash), false)
        .emit_app_call(Some(&hash), false);

    let mut engine = ExecutionEngine::new();
    let calls = serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![8]);
    assert_eq!(calls.get(), 1);
    assert_eq!(engine.script_count(), 2);
}

#[test]
fn test_appcall_gas_price() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(2).emit_app_call(Some(&hash), false);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    // PUSH2, APPCALL (10), PUSH3, ADD, two RETs.
    assert_eq!(engine.gas_consumed(), 15);
}

#[test]
fn test_dynamic_appcall_pops_hash() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(4)
        .emit_push(&hash)
        .emit_app_call(None, false);

    let seen = Rc::new(RefCell::new(None));
    let record = Rc::clone(&seen);
    let mut engine = ExecutionEngine::new();
    engine.set_load_script(move |engine, hash, dynamic, rvcount| {
        *record.borrow_mut() = Some((*hash, dynamic));
        engine.load_script(ADD_THREE.to_vec(), rvcount).is_ok()
    });
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![7]);
    assert_eq!(*seen.borrow(), Some((hash, true)));
}

#[test]
fn test_unresolved_script_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_app_call(Some(&[0x11; 20]), false);

    let mut engine = ExecutionEngine::new();
    engine.load_script(sb.to_array(), -1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::FAULT);

    let mut engine = ExecutionEngine::new();
    engine.set_load_script(|_, _, _, _| false);
    engine.load_script(sb.to_array(), -1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::FAULT);
}

#[test]
fn test_loader_must_push_exactly_one_context() {
    let mut sb = ScriptBuilder::new();
    sb.emit_app_call(Some(&[0x22; 20]), false);

    let mut engine = ExecutionEngine::new();
    engine.set_load_script(|engine, _, _, rvcount| {
        engine.load_script(vec![0x61], rvcount).is_ok()
            && engine.load_script(vec![0x61, 0x61], rvcount).is_ok()
    });
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::FAULT);
}

#[test]
fn test_tailcall_replaces_caller() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    // The PUSH9 after the tail call never runs.
    sb.emit_push_int(2)
        .emit_app_call(Some(&hash), true)
        .emit_push_int(9);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![5]);
}

#[test]
fn test_call_e_passes_only_parameters() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(1)
        .emit_push_int(2)
        .emit_call_e(Some(&hash), 1, 1, false);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![1, 5]);
}

#[test]
fn test_call_e_return_count_enforced() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(1)
        .emit_push_int(2)
        .emit_call_e(Some(&hash), 2, 1, false);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::FAULT);
}

#[test]
fn test_call_et_requires_matching_return_count() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(2).emit_call_e(Some(&hash), 1, 1, true);
    let script = sb.to_array();

    let mut engine = ExecutionEngine::new();
    let calls = serve(&mut engine, &ADD_THREE);
    engine.load_script(script.clone(), -1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::FAULT);
    assert_eq!(calls.get(), 0);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(script, 1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![5]);
}

#[test]
fn test_call_ed_pops_hash() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(6)
        .emit_push(&hash)
        .emit_call_e(None, 1, 1, false);

    let mut engine = ExecutionEngine::new();
    serve(&mut engine, &ADD_THREE);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![9]);
}

#[test]
fn test_call_i_runs_local_function() {
    // 0: PUSH4
    // 1: CALL_I rv=1 p=1 +4 -> 7
    // 6: RET
    // 7: DUP ADD RET
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(4)
        .emit_call_i(1, 1, 4)
        .emit_opcode(OpCode::RET)
        .emit_opcode(OpCode::DUP)
        .emit_opcode(OpCode::ADD)
        .emit_opcode(OpCode::RET);

    let mut engine = ExecutionEngine::new();
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![8]);
}

#[test]
fn test_syscall_reaches_host() {
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(5)
        .emit_syscall("Test.Double")
        .expect("valid name");

    let names = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&names);
    let mut engine = ExecutionEngine::new();
    engine.set_invoke_interop(move |engine, method| {
        log.borrow_mut().push(String::from_utf8_lossy(method).into_owned());
        let Some(context) = engine.current_context_mut() else {
            return false;
        };
        match context.pop().and_then(|item| item.get_int32()) {
            Ok(value) => {
                context.push(StackItem::from_int(value * 2));
                true
            }
            Err(_) => false,
        }
    });
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![10]);
    assert_eq!(*names.borrow(), vec!["Test.Double".to_string()]);
}

#[test]
fn test_failed_syscall_faults() {
    let mut sb = ScriptBuilder::new();
    sb.emit_syscall("Test.Fail").expect("valid name");

    let mut engine = ExecutionEngine::new();
    engine.set_invoke_interop(|_, _| false);
    engine.load_script(sb.to_array(), -1).expect("loads");

    assert_eq!(engine.execute(1_000), VMState::FAULT);
}

#[test]
fn test_callbacks_survive_clean() {
    let hash = hash160(&ADD_THREE);
    let mut sb = ScriptBuilder::new();
    sb.emit_push_int(2).emit_app_call(Some(&hash), false);
    let script = sb.to_array();

    let mut engine = ExecutionEngine::new();
    let calls = serve(&mut engine, &ADD_THREE);

    engine.load_script(script.clone(), -1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::HALT);

    engine.clean(1);
    assert_eq!(engine.state(), VMState::NONE);
    assert_eq!(engine.script_count(), 0);
    assert_eq!(engine.iteration(), 1);

    engine.load_script(script, -1).expect("loads");
    assert_eq!(engine.execute(1_000), VMState::HALT);
    assert_eq!(result_ints(&engine), vec![5]);
    // The cache went away with the old session.
    assert_eq!(calls.get(), 2);
}
