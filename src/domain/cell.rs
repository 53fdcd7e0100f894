// ============================================================
// CELL VALUES
// ============================================================
// Raw cells as decoded from a source document, and the cleaned
// value graph that flows through the rest of the pipeline

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Largest magnitude at which an integral f64 is still exact
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single cell exactly as the decoder produced it
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date or datetime coming from a typed spreadsheet cell, in ISO form
    DateText(String),
    /// Nested array/object, only produced by the JSON decoder
    Structured(serde_json::Value),
}

impl RawCell {
    /// Null, or text that is empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Blank => true,
            RawCell::Text(text) | RawCell::DateText(text) => text.trim().is_empty(),
            RawCell::Structured(serde_json::Value::Null) => true,
            _ => false,
        }
    }

    pub fn into_value(self) -> CellValue {
        match self {
            RawCell::Blank => CellValue::Null,
            RawCell::Text(text) | RawCell::DateText(text) => CellValue::Text(text),
            RawCell::Number(number) => CellValue::Number(number),
            RawCell::Bool(flag) => CellValue::Bool(flag),
            RawCell::Structured(value) => CellValue::from(value),
        }
    }
}

/// Cleaned value of a field
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<CellValue>),
    Record(Record),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::List(_) => "list",
            CellValue::Record(_) => "record",
        }
    }

    /// Flat string form used for delimited output.
    ///
    /// Nested values are rendered as compact JSON. Must only be called on
    /// values that passed validation, since a cyclic record never terminates.
    pub fn to_field_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(flag) => flag.to_string(),
            CellValue::Number(number) => format_number(*number),
            CellValue::Text(text) => text.clone(),
            CellValue::List(_) | CellValue::Record(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Deep copy onto fresh record nodes, keyed by source node so that
    /// sharing and cycles inside the value are reproduced, not unrolled.
    pub(crate) fn detach(&self, copies: &mut HashMap<usize, Record>) -> CellValue {
        match self {
            CellValue::List(items) => {
                CellValue::List(items.iter().map(|item| item.detach(copies)).collect())
            }
            CellValue::Record(record) => CellValue::Record(record.detach(copies)),
            other => other.clone(),
        }
    }
}

/// Integral numbers print without a fractional part
pub fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < MAX_EXACT_INTEGER {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Number(a), CellValue::Number(b)) => a == b,
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::List(a), CellValue::List(b)) => a == b,
            (CellValue::Record(a), CellValue::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(flag) => CellValue::Bool(flag),
            serde_json::Value::Number(number) => {
                number.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null)
            }
            serde_json::Value::String(text) => CellValue::Text(text),
            serde_json::Value::Array(items) => {
                CellValue::List(items.into_iter().map(CellValue::from).collect())
            }
            serde_json::Value::Object(map) => CellValue::Record(Record::from_entries(
                map.into_iter()
                    .map(|(key, value)| (key, CellValue::from(value)))
                    .collect(),
            )),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Bool(flag) => serializer.serialize_bool(*flag),
            CellValue::Number(number) => {
                if number.fract() == 0.0 && number.abs() < MAX_EXACT_INTEGER {
                    serializer.serialize_i64(*number as i64)
                } else {
                    serializer.serialize_f64(*number)
                }
            }
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::List(items) => items.serialize(serializer),
            CellValue::Record(record) => record.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(CellValue::from)
    }
}

/// Shared, ordered key/value node.
///
/// Clones share the same node, so a record can be referenced from several
/// places, including (when built programmatically) from inside itself.
#[derive(Clone, Default)]
pub struct Record(Arc<RwLock<Vec<(String, CellValue)>>>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(String, CellValue)>) -> Self {
        Self(Arc::new(RwLock::new(entries)))
    }

    /// Insert or replace a key, keeping first-insertion order
    pub(crate) fn insert(&self, key: impl Into<String>, value: CellValue) {
        let key = key.into();
        let mut entries = self.0.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<CellValue> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    /// Snapshot of the entries; nested records in the snapshot still share their nodes
    pub fn entries(&self) -> Vec<(String, CellValue)> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the underlying node
    pub fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn same_node(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn detach(&self, copies: &mut HashMap<usize, Record>) -> Record {
        if let Some(copy) = copies.get(&self.node_id()) {
            return copy.clone();
        }

        let copy = Record::new();
        copies.insert(self.node_id(), copy.clone());
        for (key, value) in self.entries() {
            let value = value.detach(copies);
            copy.insert(key, value);
        }
        copy
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.same_node(other) || self.entries() == other.entries()
    }
}

// Keys only: a cyclic record would make a derived Debug recurse forever.
impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.entries().into_iter().map(|(key, _)| key).collect();
        f.debug_struct("Record")
            .field("node", &format_args!("{:#x}", self.node_id()))
            .field("keys", &keys)
            .finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
