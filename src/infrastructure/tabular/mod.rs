// ============================================================
// TABULAR SOURCE LAYER
// ============================================================
// Scoped acquisition of document bytes and format decoders

mod csv_parser;
mod json_rows;
mod workbook;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::RawCell;

pub use csv_parser::CsvParser;
pub use json_rows::decode_json_rows;
pub use workbook::decode_workbook;

/// Container format of a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// xlsx / xlsm / xlsb / xls / ods, first worksheet only
    Workbook,
    /// Comma, semicolon, tab or pipe separated text
    Delimited,
    /// JSON array of objects
    Json,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            "csv" | "tsv" | "txt" => Some(SourceFormat::Delimited),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    /// Guess from content: zip/OLE signatures are workbooks, a leading `[` is JSON
    pub fn sniff(bytes: &[u8]) -> Self {
        const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
        const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            return SourceFormat::Workbook;
        }

        let first = bytes
            .iter()
            .copied()
            .find(|byte| !byte.is_ascii_whitespace() && *byte != 0xEF && *byte != 0xBB && *byte != 0xBF);
        match first {
            Some(b'[') => SourceFormat::Json,
            _ => SourceFormat::Delimited,
        }
    }
}

/// Raw document bytes together with where they came from
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Wrap bytes that were acquired elsewhere
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let format = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(SourceFormat::from_extension)
            .unwrap_or_else(|| SourceFormat::sniff(&bytes));

        Self {
            name,
            format,
            bytes,
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    /// Read a whole file. The handle is released when this returns, on every path.
    pub fn read(path: &Path, max_bytes: u64) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            AppError::IoError(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let declared = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        if declared > max_bytes {
            return Err(AppError::ValidationError(format!(
                "File {} is too large ({} bytes), maximum allowed: {}",
                path.display(),
                declared,
                max_bytes
            )));
        }

        let mut bytes = Vec::with_capacity(declared as usize);
        file.take(max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::IoError(format!("Failed to read file: {}", e)))?;

        if bytes.len() as u64 > max_bytes {
            return Err(AppError::ValidationError(format!(
                "File {} grew beyond the maximum allowed size ({} bytes)",
                path.display(),
                max_bytes
            )));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        debug!(file = %path.display(), bytes = bytes.len(), "Source document read");
        Ok(Self::from_bytes(name, bytes))
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// Decoder output before header extraction
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedTable {
    /// Positional rows; the header is the first non-blank row
    Grid(Vec<Vec<RawCell>>),
    /// Rows already keyed, with keys in first-seen order
    Keyed {
        keys: Vec<String>,
        rows: Vec<Vec<RawCell>>,
    },
}

/// Decode a source document according to its format
pub fn decode(document: &SourceDocument) -> Result<DecodedTable> {
    match document.format {
        SourceFormat::Workbook => decode_workbook(&document.bytes).map(DecodedTable::Grid),
        SourceFormat::Delimited => CsvParser::new()
            .parse_bytes(&document.bytes)
            .map(DecodedTable::Grid),
        SourceFormat::Json => {
            decode_json_rows(&document.bytes).map(|(keys, rows)| DecodedTable::Keyed { keys, rows })
        }
    }
}
