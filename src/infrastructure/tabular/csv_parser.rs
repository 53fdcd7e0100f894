// ============================================================
// CSV PARSER
// ============================================================
// Parse delimited text with encoding detection and light typing

use csv::{ReaderBuilder, Trim};
use encoding_rs::WINDOWS_1252;

use crate::domain::error::{AppError, Result};
use crate::domain::RawCell;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// CSV parser with encoding and delimiter detection
pub struct CsvParser {
    /// Delimiter character; `None` means sniff from content
    delimiter: Option<u8>,

    /// Infer numbers and booleans from cell text
    infer_types: bool,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: None,
            infer_types: true,
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Keep every cell as text
    pub fn with_infer_types(mut self, infer_types: bool) -> Self {
        self.infer_types = infer_types;
        self
    }

    /// Decode bytes and parse them into positional rows
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<Vec<RawCell>>> {
        let content = Self::decode_text(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<Vec<Vec<RawCell>>> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .trim(Trim::None)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::UnreadableDocument(format!(
                    "Failed to parse CSV row {}: {}",
                    index + 1,
                    e
                ))
            })?;

            let row = record
                .iter()
                .map(|field| {
                    if self.infer_types {
                        Self::infer_cell(field)
                    } else if field.trim().is_empty() {
                        RawCell::Blank
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }

    /// UTF-8 (BOM stripped) first, Windows-1252 as the fallback
    fn decode_text(bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        match std::str::from_utf8(bytes) {
            Ok(content) => content.to_string(),
            Err(_) => {
                let (content, _, had_errors) = WINDOWS_1252.decode(bytes);
                if had_errors {
                    tracing::warn!("CSV content is neither UTF-8 nor Windows-1252, some characters were replaced");
                }
                content.into_owned()
            }
        }
    }

    fn infer_cell(field: &str) -> RawCell {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return RawCell::Blank;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return RawCell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return RawCell::Bool(false);
        }
        if Self::is_numeric_value(trimmed) {
            if let Ok(number) = trimmed.parse::<f64>() {
                return RawCell::Number(number);
            }
        }
        RawCell::Text(field.to_string())
    }

    /// Finite decimal numbers; identifiers with leading zeros stay text
    fn is_numeric_value(value: &str) -> bool {
        let unsigned = value.trim_start_matches(['-', '+']);
        let leading_zero = unsigned.len() > 1
            && unsigned.starts_with('0')
            && !unsigned.starts_with("0.");

        !leading_zero
            && unsigned.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
            && value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        let sample_lines: Vec<_> = content.lines().take(10).collect();
        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,25,LA";
        let rows = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], RawCell::Text("name".to_string()));
        assert_eq!(rows[1][1], RawCell::Number(30.0));
        assert_eq!(rows[2][2], RawCell::Text("LA".to_string()));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\n1\t2"), b'\t');
        assert_eq!(CsvParser::detect_delimiter("a,b\n1,2"), b',');
    }

    #[test]
    fn test_type_inference() {
        let rows = CsvParser::new()
            .parse_content("id,score,active,note\n007,1.5,TRUE,  \n")
            .unwrap();

        assert_eq!(rows[1][0], RawCell::Text("007".to_string()));
        assert_eq!(rows[1][1], RawCell::Number(1.5));
        assert_eq!(rows[1][2], RawCell::Bool(true));
        assert_eq!(rows[1][3], RawCell::Blank);
    }

    #[test]
    fn test_nan_and_inf_stay_text() {
        let rows = CsvParser::new().parse_content("v\nNaN\ninf").unwrap();
        assert_eq!(rows[1][0], RawCell::Text("NaN".to_string()));
        assert_eq!(rows[2][0], RawCell::Text("inf".to_string()));
    }

    #[test]
    fn test_quoted_fields_keep_delimiters() {
        let rows = CsvParser::new()
            .parse_content("note,city\n\"hello, world\",\"New\nYork\"")
            .unwrap();

        assert_eq!(rows[1][0], RawCell::Text("hello, world".to_string()));
        assert_eq!(rows[1][1], RawCell::Text("New\nYork".to_string()));
    }

    #[test]
    fn test_bom_and_latin1_decoding() {
        let mut utf8 = UTF8_BOM.to_vec();
        utf8.extend_from_slice("name\nJosé".as_bytes());
        let rows = CsvParser::new().parse_bytes(&utf8).unwrap();
        assert_eq!(rows[0][0], RawCell::Text("name".to_string()));
        assert_eq!(rows[1][0], RawCell::Text("José".to_string()));

        // "José" in Windows-1252
        let latin = vec![b'n', b'\n', b'J', b'o', b's', 0xE9];
        let rows = CsvParser::new().parse_bytes(&latin).unwrap();
        assert_eq!(rows[1][0], RawCell::Text("José".to_string()));
    }

    #[test]
    fn test_ragged_rows_allowed() {
        let rows = CsvParser::new().parse_content("a,b,c\n1\n1,2,3,4").unwrap();
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[2].len(), 4);
    }
}
