//! JSON report of a finished run.

use neo_legacy_vm::{ExecutionEngine, StackItem, VMState};
use serde::Serialize;
use serde_json::{json, Value};

/// Containers nested deeper than this are elided. Scripts can build cycles.
const MAX_NESTING: usize = 16;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub state: String,
    pub gas_consumed: u64,
    /// Top of the result stack first.
    pub stack: Vec<Value>,
}

impl RunReport {
    pub fn from_engine(engine: &ExecutionEngine) -> Self {
        Self {
            state: state_name(engine.state()).to_string(),
            gas_consumed: engine.gas_consumed(),
            stack: engine
                .result_stack()
                .iter()
                .rev()
                .map(|item| render_item(item, 0))
                .collect(),
        }
    }
}

pub fn state_name(state: VMState) -> &'static str {
    match state {
        VMState::NONE => "NONE",
        VMState::HALT => "HALT",
        VMState::FAULT => "FAULT",
        VMState::FAULT_BY_GAS => "FAULT_BY_GAS",
    }
}

/// Renders one stack item as `{"type": ..., "value": ...}`.
pub fn render_item(item: &StackItem, depth: usize) -> Value {
    let item_type = format!("{:?}", item.item_type());
    if depth >= MAX_NESTING {
        return json!({ "type": item_type, "value": Value::Null });
    }

    let value = match item {
        StackItem::Boolean(value) => json!(value),
        StackItem::Integer(value) => json!(value.to_string()),
        StackItem::ByteArray(bytes) => json!(hex::encode(bytes)),
        StackItem::Interop(handle) => json!(hex::encode(handle.data())),
        StackItem::Array(array) => render_list(&array.to_vec(), depth),
        StackItem::Struct(items) => render_list(&items.to_vec(), depth),
        StackItem::Map(map) => Value::Array(
            map.keys()
                .iter()
                .zip(map.values().iter())
                .map(|(key, value)| {
                    json!({
                        "key": render_item(key, depth + 1),
                        "value": render_item(value, depth + 1),
                    })
                })
                .collect(),
        ),
    };

    json!({ "type": item_type, "value": value })
}

fn render_list(items: &[StackItem], depth: usize) -> Value {
    Value::Array(items.iter().map(|item| render_item(item, depth + 1)).collect())
}
