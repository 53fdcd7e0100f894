use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::domain::error::{AppError, Result};
use crate::domain::RawCell;
use crate::shared::excel_date::serial_to_iso;

/// Read the first worksheet of a workbook into positional rows
pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<Vec<RawCell>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
        AppError::UnreadableDocument(format!("Failed to open Excel file: {}", e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::UnreadableDocument("No worksheet found".to_string()))?
        .map_err(|e| AppError::UnreadableDocument(format!("Failed to read Excel range: {}", e)))?;

    let rows: Vec<Vec<RawCell>> = range
        .rows()
        .map(|row| row.iter().map(raw_cell).collect())
        .collect();

    tracing::debug!(rows = rows.len(), "Worksheet decoded");
    Ok(rows)
}

fn raw_cell(cell: &Data) -> RawCell {
    #[allow(unreachable_patterns)]
    match cell {
        Data::Empty => RawCell::Blank,
        Data::String(text) => RawCell::Text(text.clone()),
        Data::Float(number) => RawCell::Number(*number),
        Data::Int(number) => RawCell::Number(*number as f64),
        Data::Bool(flag) => RawCell::Bool(*flag),
        Data::DateTime(datetime) => {
            let serial = datetime.as_f64();
            serial_to_iso(serial)
                .map(RawCell::DateText)
                .unwrap_or(RawCell::Number(serial))
        }
        Data::DateTimeIso(text) => RawCell::DateText(text.clone()),
        Data::DurationIso(text) => RawCell::Text(text.clone()),
        Data::Error(error) => RawCell::Text(error.to_string()),
        other => RawCell::Text(other.to_string()),
    }
}
