// ============================================================
// EXPORTER
// ============================================================
// CSV / JSON materialization of a validated dataset

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::{BlankPolicy, CellValue, Dataset, Header, ValidatedDataset};

use super::document_validator::DocumentValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// How a blank cell reads in this target
    pub fn blank_policy(&self) -> BlankPolicy {
        match self {
            ExportFormat::Csv => BlankPolicy::Sentinel,
            ExportFormat::Json => BlankPolicy::Null,
        }
    }
}

/// Re-render top-level blank cells (null or the sentinel text) the way
/// `format` expects them. Nested values are left alone.
pub fn for_target(
    dataset: &ValidatedDataset,
    format: ExportFormat,
    sentinel: &str,
) -> Result<ValidatedDataset> {
    let blank = match format.blank_policy() {
        BlankPolicy::Sentinel => CellValue::text(sentinel),
        BlankPolicy::Null => CellValue::Null,
    };

    let mut rendered = dataset.clone().into_inner();
    for row in rendered.rows_mut() {
        for value in row.values_mut() {
            if value.is_null() || value.as_text() == Some(sentinel) {
                *value = blank.clone();
            }
        }
    }
    DocumentValidator::accept(rendered)
}

/// RFC 4180 text, header row first, quoting only where needed
pub fn to_csv(dataset: &ValidatedDataset) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer
        .write_record(dataset.header().names())
        .map_err(|e| AppError::IoError(format!("Failed to write CSV header: {}", e)))?;

    for (index, row) in dataset.rows().iter().enumerate() {
        let record: Vec<String> = dataset
            .header()
            .names()
            .iter()
            .map(|name| row.get(name).map(|value| value.to_field_string()).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| AppError::IoError(format!("Failed to write CSV row {}: {}", index, e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::IoError(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

/// Array of row objects, 2-space indentation
pub fn to_json(dataset: &ValidatedDataset) -> Result<String> {
    serde_json::to_string_pretty(&**dataset)
        .map_err(|e| AppError::Internal(format!("Failed to serialize dataset: {}", e)))
}

/// Parse exported JSON back into a dataset keyed by `header`.
///
/// JSON rows carry no column list of their own, so an export with zero rows
/// needs the header supplied to come back intact.
pub fn from_json(text: &str, header: &Header) -> Result<Dataset> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| AppError::UnreadableDocument(format!("Failed to parse JSON: {}", e)))?;
    Dataset::from_json_rows(value, header).map_err(AppError::UnreadableDocument)
}

/// `cleaned_<stem>.<ext>`
pub fn export_file_name(stem: &str, format: ExportFormat) -> String {
    let stem = stem.trim();
    let stem = if stem.is_empty() { "data" } else { stem };
    format!("cleaned_{}.{}", stem, format.extension())
}

pub fn write_export(
    dataset: &ValidatedDataset,
    out_dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Csv => to_csv(dataset)?,
        ExportFormat::Json => to_json(dataset)?,
    };

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(export_file_name(stem, format));
    std::fs::write(&path, content)?;

    info!(path = %path.display(), rows = dataset.len(), "Export written");
    Ok(path)
}
