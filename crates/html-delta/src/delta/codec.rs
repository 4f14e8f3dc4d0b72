//! JSON wire codec for deltas and conflicts.
//!
//! Field layout per operation kind:
//! - every op carries `type` (the literal kind string) and `path`;
//! - `position`, `key`, `old_value`, `new_value`, `node_data` appear only
//!   where meaningful and are omitted otherwise;
//! - an absent `new_value` on UPDATE_ATTR is the attribute-removal signal.

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::{Conflict, Delta, NodePath, Op};

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("unknown operation type: {0}")]
    UnknownOp(String),
    #[error("invalid delta: {0}")]
    InvalidDelta(String),
    #[error("malformed json: {0}")]
    Json(String),
}

impl Delta {
    pub fn to_json(&self) -> Value {
        json!({
            "base_hash": self.base_hash,
            "operations": self.operations.iter().map(op_to_json).collect::<Vec<_>>(),
            "timestamp": self.timestamp,
            "author": self.author,
        })
    }

    pub fn from_json(value: &Value) -> Result<Delta, CodecError> {
        let base_hash = field_str(value, "base_hash")?.to_string();
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| CodecError::InvalidDelta("timestamp must be an integer".into()))?;
        let author = field_str(value, "author")?.to_string();
        let operations = value
            .get("operations")
            .and_then(Value::as_array)
            .ok_or_else(|| CodecError::InvalidDelta("operations must be an array".into()))?
            .iter()
            .map(op_from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Delta {
            base_hash,
            operations,
            timestamp,
            author,
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn from_json_string(text: &str) -> Result<Delta, CodecError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| CodecError::Json(err.to_string()))?;
        Delta::from_json(&value)
    }
}

pub fn op_to_json(op: &Op) -> Value {
    let mut m = Map::new();
    m.insert("type".into(), json!(op.op_name()));
    m.insert("path".into(), encode_path(op.path()));
    match op {
        Op::InsertNode {
            position, node_data, ..
        } => {
            m.insert("position".into(), json!(position));
            m.insert("node_data".into(), json!(node_data));
        }
        Op::DeleteNode { .. } | Op::MoveNode { .. } => {}
        Op::UpdateAttr {
            key,
            old_value,
            new_value,
            ..
        } => {
            m.insert("key".into(), json!(key));
            if let Some(old) = old_value {
                m.insert("old_value".into(), json!(old));
            }
            if let Some(new) = new_value {
                m.insert("new_value".into(), json!(new));
            }
        }
        Op::UpdateText {
            old_value,
            new_value,
            ..
        } => {
            m.insert("old_value".into(), json!(old_value));
            m.insert("new_value".into(), json!(new_value));
        }
        Op::InsertText {
            position, new_value, ..
        } => {
            m.insert("position".into(), json!(position));
            m.insert("new_value".into(), json!(new_value));
        }
        Op::DeleteText {
            position, old_value, ..
        } => {
            m.insert("position".into(), json!(position));
            m.insert("old_value".into(), json!(old_value));
        }
    }
    Value::Object(m)
}

pub fn op_from_json(value: &Value) -> Result<Op, CodecError> {
    let kind = field_str(value, "type")?;
    let path = decode_path(value)?;
    match kind {
        "INSERT_NODE" => Ok(Op::InsertNode {
            path,
            position: field_usize(value, "position")?,
            node_data: field_str(value, "node_data")?.to_string(),
        }),
        "DELETE_NODE" => Ok(Op::DeleteNode { path }),
        "MOVE_NODE" => Ok(Op::MoveNode { path }),
        "UPDATE_ATTR" => Ok(Op::UpdateAttr {
            path,
            key: field_str(value, "key")?.to_string(),
            old_value: opt_field_str(value, "old_value"),
            new_value: opt_field_str(value, "new_value"),
        }),
        "UPDATE_TEXT" => Ok(Op::UpdateText {
            path,
            old_value: field_str(value, "old_value")?.to_string(),
            new_value: field_str(value, "new_value")?.to_string(),
        }),
        "INSERT_TEXT" => Ok(Op::InsertText {
            path,
            position: field_usize(value, "position")?,
            new_value: field_str(value, "new_value")?.to_string(),
        }),
        "DELETE_TEXT" => Ok(Op::DeleteText {
            path,
            position: field_usize(value, "position")?,
            old_value: field_str(value, "old_value")?.to_string(),
        }),
        other => Err(CodecError::UnknownOp(other.to_string())),
    }
}

pub fn conflict_to_json(conflict: &Conflict) -> Value {
    json!({
        "type": conflict.kind.as_str(),
        "description": conflict.description,
        "path": encode_path(&conflict.path),
        "ops": [op_to_json(&conflict.ops.0), op_to_json(&conflict.ops.1)],
    })
}

fn encode_path(path: &NodePath) -> Value {
    Value::Array(path.iter().map(|&i| json!(i)).collect())
}

fn decode_path(value: &Value) -> Result<NodePath, CodecError> {
    value
        .get("path")
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::InvalidDelta("path must be an array".into()))?
        .iter()
        .map(|step| {
            step.as_u64()
                .map(|i| i as usize)
                .ok_or_else(|| CodecError::InvalidDelta("path steps must be non-negative".into()))
        })
        .collect()
}

fn field_str<'a>(value: &'a Value, name: &str) -> Result<&'a str, CodecError> {
    value
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidDelta(format!("missing string field: {name}")))
}

fn opt_field_str(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

fn field_usize(value: &Value, name: &str) -> Result<usize, CodecError> {
    value
        .get(name)
        .and_then(Value::as_u64)
        .map(|i| i as usize)
        .ok_or_else(|| CodecError::InvalidDelta(format!("missing integer field: {name}")))
}
