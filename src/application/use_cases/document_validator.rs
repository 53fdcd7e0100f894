// ============================================================
// DOCUMENT VALIDATOR
// ============================================================
// Cycle detection and canonical JSON round-trip

use std::collections::HashSet;

use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::domain::{CellValue, Dataset, ValidatedDataset, ValidationIssue, ValidationReport};

pub struct DocumentValidator;

impl DocumentValidator {
    pub fn validate(dataset: &Dataset) -> ValidationReport {
        let cycles = find_cycles(dataset);
        // A cyclic graph cannot be serialized, so the round-trip only runs on acyclic data
        if !cycles.is_empty() {
            return ValidationReport::from_issues(cycles);
        }

        let issues = match round_trip(dataset) {
            Ok(()) => Vec::new(),
            Err(message) => vec![ValidationIssue::SerializationFailed { message }],
        };
        ValidationReport::from_issues(issues)
    }

    /// The only way to obtain a `ValidatedDataset`.
    ///
    /// The accepted rows are a detached copy, so record aliases kept by the
    /// caller cannot reach the data after validation.
    pub fn accept(dataset: Dataset) -> Result<ValidatedDataset> {
        let dataset = dataset.detached();
        let report = Self::validate(&dataset);
        if !report.valid {
            warn!(issues = report.errors.len(), "Dataset failed validation");
            return Err(AppError::ValidationFailed(report.errors));
        }
        Ok(ValidatedDataset::accept(dataset))
    }
}

fn find_cycles(dataset: &Dataset) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut finished = HashSet::new();

    for (index, row) in dataset.rows().iter().enumerate() {
        for (field, value) in row.fields() {
            let mut location = vec![format!("rows[{}].{}", index, field)];
            let mut stack = Vec::new();
            if let Some(path) = find_cycle(value, &mut location, &mut stack, &mut finished) {
                issues.push(ValidationIssue::CircularReference { path });
            }
        }
    }
    issues
}

/// Depth-first walk keyed by record identity. Only nodes on the current path
/// count as a cycle; nodes already fully explored are skipped.
fn find_cycle(
    value: &CellValue,
    location: &mut Vec<String>,
    stack: &mut Vec<usize>,
    finished: &mut HashSet<usize>,
) -> Option<String> {
    match value {
        CellValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                location.push(format!("[{}]", index));
                if let Some(path) = find_cycle(item, location, stack, finished) {
                    return Some(path);
                }
                location.pop();
            }
            None
        }
        CellValue::Record(record) => {
            let id = record.node_id();
            if stack.contains(&id) {
                return Some(location.concat());
            }
            if finished.contains(&id) {
                return None;
            }

            stack.push(id);
            for (key, entry) in record.entries() {
                location.push(format!(".{}", key));
                if let Some(path) = find_cycle(&entry, location, stack, finished) {
                    return Some(path);
                }
                location.pop();
            }
            stack.pop();
            finished.insert(id);
            None
        }
        _ => None,
    }
}

fn round_trip(dataset: &Dataset) -> std::result::Result<(), String> {
    let serialized = serde_json::to_string(dataset).map_err(|e| e.to_string())?;
    let parsed: serde_json::Value = serde_json::from_str(&serialized).map_err(|e| e.to_string())?;
    let restored = Dataset::from_json_rows(parsed, dataset.header())?;

    if restored.header() != dataset.header() {
        return Err(format!(
            "header changed from {:?} to {:?}",
            dataset.header().names(),
            restored.header().names()
        ));
    }

    if restored.len() != dataset.len() {
        return Err(format!(
            "row count changed from {} to {}",
            dataset.len(),
            restored.len()
        ));
    }

    for (index, (original, restored)) in dataset.rows().iter().zip(restored.rows()).enumerate() {
        if original == restored {
            continue;
        }
        let field = original
            .fields()
            .iter()
            .find(|(name, value)| restored.get(name) != Some(value))
            .map(|(name, _)| name.as_str())
            .unwrap_or("<row>");
        return Err(format!(
            "value of rows[{}].{} does not survive serialization",
            index, field
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanedRow, Header, Record};

    fn dataset_with(value: CellValue) -> Dataset {
        Dataset::new(
            Header::new(vec!["name".to_string(), "meta".to_string()]),
            vec![CleanedRow::new(vec![
                ("name".to_string(), CellValue::text("Ada")),
                ("meta".to_string(), value),
            ])],
        )
    }

    #[test]
    fn test_plain_dataset_is_valid() {
        let report = DocumentValidator::validate(&dataset_with(CellValue::Number(1.5)));
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_self_reference_detected() {
        let record = Record::new();
        record.insert("self", CellValue::Record(record.clone()));

        let report = DocumentValidator::validate(&dataset_with(CellValue::Record(record)));
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![ValidationIssue::CircularReference {
                path: "rows[0].meta.self".to_string()
            }]
        );
    }

    #[test]
    fn test_cycle_through_list_detected() {
        let outer = Record::new();
        let inner = Record::new();
        inner.insert("back", CellValue::List(vec![CellValue::Record(outer.clone())]));
        outer.insert("child", CellValue::Record(inner));

        let report = DocumentValidator::validate(&dataset_with(CellValue::Record(outer)));
        assert!(matches!(
            report.errors.as_slice(),
            [ValidationIssue::CircularReference { .. }]
        ));
    }

    #[test]
    fn test_shared_record_is_not_a_cycle() {
        let shared = Record::from_entries(vec![("k".to_string(), CellValue::text("v"))]);
        let value = CellValue::List(vec![
            CellValue::Record(shared.clone()),
            CellValue::Record(shared),
        ]);

        let report = DocumentValidator::validate(&dataset_with(value));
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_non_finite_number_fails_round_trip() {
        let report = DocumentValidator::validate(&dataset_with(CellValue::Number(f64::NAN)));
        assert!(matches!(
            report.errors.as_slice(),
            [ValidationIssue::SerializationFailed { .. }]
        ));
    }

    #[test]
    fn test_zero_rows_keep_header() {
        let dataset = Dataset::new(
            Header::new(vec!["name".to_string(), "age".to_string()]),
            Vec::new(),
        );
        let report = DocumentValidator::validate(&dataset);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_duplicate_field_names_fail_round_trip() {
        let dataset = Dataset::new(
            Header::new(vec!["a".to_string(), "a".to_string()]),
            vec![CleanedRow::new(vec![
                ("a".to_string(), CellValue::text("x")),
                ("a".to_string(), CellValue::text("y")),
            ])],
        );

        let report = DocumentValidator::validate(&dataset);
        assert!(matches!(
            report.errors.as_slice(),
            [ValidationIssue::SerializationFailed { message }] if message.contains("rows[0].a")
        ));
    }

    #[test]
    fn test_accepted_dataset_ignores_later_alias_writes() {
        let record = Record::from_entries(vec![("k".to_string(), CellValue::text("v"))]);
        let accepted =
            DocumentValidator::accept(dataset_with(CellValue::Record(record.clone()))).unwrap();

        record.insert("self", CellValue::Record(record.clone()));
        record.insert("k", CellValue::Null);

        assert!(DocumentValidator::validate(&accepted).valid);
        match accepted.rows()[0].get("meta") {
            Some(CellValue::Record(kept)) => {
                assert!(!kept.same_node(&record));
                assert_eq!(kept.entries(), vec![("k".to_string(), CellValue::text("v"))]);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_accept_rejects_invalid() {
        let record = Record::new();
        record.insert("self", CellValue::Record(record.clone()));

        let err = DocumentValidator::accept(dataset_with(CellValue::Record(record))).unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let accepted = DocumentValidator::accept(dataset_with(CellValue::Bool(true))).unwrap();
        assert_eq!(accepted.len(), 1);
    }
}
