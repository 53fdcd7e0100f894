use serde_json::Value;

use crate::domain::error::{AppError, Result};
use crate::domain::RawCell;

/// Decode a JSON array of objects into keys (first-seen order) and aligned rows
pub fn decode_json_rows(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<RawCell>>)> {
    let parsed: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::UnreadableDocument(format!("Failed to parse JSON: {}", e)))?;

    let items = match parsed {
        Value::Array(items) => items,
        other => {
            return Err(AppError::UnreadableDocument(format!(
                "Expected a JSON array of objects, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut keys: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => {
                for key in map.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
                objects.push(map);
            }
            other => {
                return Err(AppError::UnreadableDocument(format!(
                    "Element {} is {}, expected an object",
                    index,
                    json_kind(&other)
                )))
            }
        }
    }

    let rows = objects
        .into_iter()
        .map(|mut map| {
            keys.iter()
                .map(|key| map.remove(key).map(raw_cell).unwrap_or(RawCell::Blank))
                .collect()
        })
        .collect();

    Ok((keys, rows))
}

fn raw_cell(value: Value) -> RawCell {
    match value {
        Value::Null => RawCell::Blank,
        Value::Bool(flag) => RawCell::Bool(flag),
        Value::Number(number) => number
            .as_f64()
            .map(RawCell::Number)
            .unwrap_or(RawCell::Blank),
        Value::String(text) => RawCell::Text(text),
        nested @ (Value::Array(_) | Value::Object(_)) => RawCell::Structured(nested),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
