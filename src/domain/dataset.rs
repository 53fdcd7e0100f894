// ============================================================
// DATASET TYPES
// ============================================================
// Header, raw rows as loaded, and the cleaned dataset

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::ops::Deref;

use super::{CellValue, HeaderCollisionPolicy, RawCell};

/// Normalize a raw header label: trim, whitespace runs to `_`, lower-case
pub fn normalize_header_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn placeholder_name(position: usize) -> String {
    format!("column_{}", position + 1)
}

/// Ordered, unique field names
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Header(Vec<String>);

/// Header plus the header slot every source column lands in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub header: Header,
    /// `targets[source_column] = header position`
    pub targets: Vec<usize>,
}

impl Header {
    /// Build a header from already-normalized unique names
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Build a header from the first non-blank row of a document
    pub fn from_cells(cells: &[RawCell], policy: HeaderCollisionPolicy) -> HeaderLayout {
        let labels: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                RawCell::Text(text) if !text.trim().is_empty() => Some(text.clone()),
                _ => None,
            })
            .collect();
        Self::from_labels(&labels, policy)
    }

    /// Build a header from optional labels; `None` means the label was not text
    pub fn from_labels(labels: &[Option<String>], policy: HeaderCollisionPolicy) -> HeaderLayout {
        let mut names: Vec<String> = Vec::with_capacity(labels.len());
        let mut targets = Vec::with_capacity(labels.len());

        for (position, label) in labels.iter().enumerate() {
            let base = match label {
                Some(text) => normalize_header_name(text),
                None => placeholder_name(position),
            };

            match names.iter().position(|existing| *existing == base) {
                None => {
                    targets.push(names.len());
                    names.push(base);
                }
                Some(existing) => match policy {
                    HeaderCollisionPolicy::Overwrite => {
                        tracing::warn!(
                            field = %base,
                            column = position + 1,
                            "Header collision, later column overwrites earlier one"
                        );
                        targets.push(existing);
                    }
                    HeaderCollisionPolicy::Suffix => {
                        let mut suffix = 2;
                        let mut candidate = format!("{}_{}", base, suffix);
                        while names.contains(&candidate) {
                            suffix += 1;
                            candidate = format!("{}_{}", base, suffix);
                        }
                        tracing::warn!(
                            field = %base,
                            renamed = %candidate,
                            column = position + 1,
                            "Header collision, column renamed"
                        );
                        targets.push(names.len());
                        names.push(candidate);
                    }
                },
            }
        }

        HeaderLayout {
            header: Header(names),
            targets,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|existing| existing == name)
    }
}

/// One row of raw cells aligned to the header
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow(pub Vec<RawCell>);

impl RawRow {
    pub fn cells(&self) -> &[RawCell] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(RawCell::is_blank)
    }
}

/// Loader output: header plus header-aligned rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub header: Header,
    pub rows: Vec<RawRow>,
}

/// A cleaned row, one entry per header name in header order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanedRow {
    fields: Vec<(String, CellValue)>,
}

impl CleanedRow {
    pub fn new(fields: Vec<(String, CellValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, name: &str, value: CellValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(field, _)| field == name) {
            slot.1 = value;
        }
    }

    pub fn fields(&self) -> &[(String, CellValue)] {
        &self.fields
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut CellValue> {
        self.fields.iter_mut().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for CleanedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Cleaned rows plus the header they are keyed by
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    header: Header,
    rows: Vec<CleanedRow>,
}

impl Dataset {
    pub fn new(header: Header, rows: Vec<CleanedRow>) -> Self {
        Self { header, rows }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows(&self) -> &[CleanedRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [CleanedRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy whose records are fresh nodes nobody else holds. Sharing between
    /// cells, and cycles, are reproduced in the copy.
    pub fn detached(&self) -> Dataset {
        let mut copies = HashMap::new();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                CleanedRow::new(
                    row.fields()
                        .iter()
                        .map(|(name, value)| (name.clone(), value.detach(&mut copies)))
                        .collect(),
                )
            })
            .collect();
        Dataset::new(self.header.clone(), rows)
    }

    /// Rebuild a dataset from a JSON array of row objects.
    ///
    /// The header starts as `expected` so a zero-row document keeps its columns;
    /// keys outside it are appended in first-seen order. Keys a row lacks become null.
    pub fn from_json_rows(
        value: serde_json::Value,
        expected: &Header,
    ) -> std::result::Result<Self, String> {
        let items = match value {
            serde_json::Value::Array(items) => items,
            _ => return Err("expected a JSON array of row objects".to_string()),
        };

        let mut names: Vec<String> = expected.names().to_vec();
        let mut objects = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                serde_json::Value::Object(map) => {
                    for key in map.keys() {
                        if !names.contains(key) {
                            names.push(key.clone());
                        }
                    }
                    objects.push(map);
                }
                _ => return Err(format!("row {} is not an object", index)),
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut map| {
                CleanedRow::new(
                    names
                        .iter()
                        .map(|name| {
                            let value = map.remove(name).map(CellValue::from).unwrap_or(CellValue::Null);
                            (name.clone(), value)
                        })
                        .collect(),
                )
            })
            .collect();

        Ok(Self::new(Header::new(names), rows))
    }
}

/// Serializes as a JSON array of row objects
impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

/// A dataset the validator accepted. Only the validator can create one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDataset(Dataset);

impl ValidatedDataset {
    pub(crate) fn accept(dataset: Dataset) -> Self {
        Self(dataset)
    }

    pub fn into_inner(self) -> Dataset {
        self.0
    }
}

impl Deref for ValidatedDataset {
    type Target = Dataset;

    fn deref(&self) -> &Dataset {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> RawCell {
        RawCell::Text(value.to_string())
    }

    #[test]
    fn test_normalize_header_name() {
        assert_eq!(normalize_header_name("  Birth   Date "), "birth_date");
        assert_eq!(normalize_header_name("Tarikh Lahir"), "tarikh_lahir");
        assert_eq!(normalize_header_name("ID"), "id");
    }

    #[test]
    fn test_non_text_headers_get_positional_names() {
        let cells = vec![text("Name"), RawCell::Number(2024.0), RawCell::Blank, text("  ")];
        let layout = Header::from_cells(&cells, HeaderCollisionPolicy::Suffix);

        assert_eq!(
            layout.header.names(),
            &["name", "column_2", "column_3", "column_4"]
        );
    }

    #[test]
    fn test_collision_suffix_policy() {
        let cells = vec![text("Name"), text("name"), text("NAME")];
        let layout = Header::from_cells(&cells, HeaderCollisionPolicy::Suffix);

        assert_eq!(layout.header.names(), &["name", "name_2", "name_3"]);
        assert_eq!(layout.targets, vec![0, 1, 2]);
    }

    #[test]
    fn test_collision_overwrite_policy() {
        let cells = vec![text("Name"), text("Age"), text("name")];
        let layout = Header::from_cells(&cells, HeaderCollisionPolicy::Overwrite);

        assert_eq!(layout.header.names(), &["name", "age"]);
        assert_eq!(layout.targets, vec![0, 1, 0]);
    }

    #[test]
    fn test_dataset_serializes_as_array_of_objects() {
        let header = Header::new(vec!["a".to_string(), "b".to_string()]);
        let row = CleanedRow::new(vec![
            ("a".to_string(), CellValue::text("x")),
            ("b".to_string(), CellValue::Null),
        ]);
        let dataset = Dataset::new(header, vec![row]);

        let json = serde_json::to_string(&dataset).unwrap();
        assert_eq!(json, r#"[{"a":"x","b":null}]"#);
    }

    #[test]
    fn test_from_json_rows_fills_missing_keys() {
        let value = serde_json::json!([{"b": 1, "a": "x"}, {"c": true}]);
        let dataset = Dataset::from_json_rows(value, &Header::default()).unwrap();

        assert_eq!(dataset.header().names(), &["b", "a", "c"]);
        assert_eq!(dataset.rows()[1].get("a"), Some(&CellValue::Null));
        assert_eq!(dataset.rows()[1].get("c"), Some(&CellValue::Bool(true)));
        assert!(Dataset::from_json_rows(serde_json::json!([1]), &Header::default()).is_err());
    }

    #[test]
    fn test_from_json_rows_keeps_expected_header() {
        let header = Header::new(vec!["name".to_string(), "age".to_string()]);

        let empty = Dataset::from_json_rows(serde_json::json!([]), &header).unwrap();
        assert_eq!(empty.header(), &header);
        assert!(empty.is_empty());

        let extra = Dataset::from_json_rows(serde_json::json!([{"zip": "1"}]), &header).unwrap();
        assert_eq!(extra.header().names(), &["name", "age", "zip"]);
        assert_eq!(extra.rows()[0].get("name"), Some(&CellValue::Null));
    }
}
