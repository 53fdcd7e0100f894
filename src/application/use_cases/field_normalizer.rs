// ============================================================
// FIELD NORMALIZER
// ============================================================
// Deterministic per-cell cleaning: blanks, dates, whitespace

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{
    format_number, BlankPolicy, CellValue, CleaningConfig, FieldIssue, MonthAlias, Record,
};
use crate::shared::excel_date::serial_to_datetime;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y年%m月%d日",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// A normalized value plus the problem found while producing it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedField {
    pub value: CellValue,
    pub issue: Option<FieldIssue>,
}

pub struct FieldNormalizer {
    config: CleaningConfig,
    /// Longest alias first so `十一月` is replaced before `一月` can match inside it
    month_aliases: Vec<MonthAlias>,
}

impl FieldNormalizer {
    pub fn new(config: &CleaningConfig) -> Self {
        let mut month_aliases = config.month_names.clone();
        month_aliases.sort_by(|a, b| b.alias.chars().count().cmp(&a.alias.chars().count()));

        Self {
            config: config.clone(),
            month_aliases,
        }
    }

    pub fn normalize(&self, header: &str, value: &CellValue) -> CellValue {
        self.normalize_field(header, value).value
    }

    pub fn normalize_field(&self, header: &str, value: &CellValue) -> NormalizedField {
        let mut records = HashMap::new();
        self.normalize_inner(header, value, &mut records)
    }

    /// What a blank cell becomes under the configured policy
    pub fn blank_value(&self) -> CellValue {
        match self.config.blank_policy {
            BlankPolicy::Sentinel => CellValue::text(self.config.blank_sentinel.clone()),
            BlankPolicy::Null => CellValue::Null,
        }
    }

    pub fn is_date_field(&self, header: &str) -> bool {
        self.config.is_date_field(header)
    }

    fn normalize_inner(
        &self,
        header: &str,
        value: &CellValue,
        records: &mut HashMap<usize, Record>,
    ) -> NormalizedField {
        if is_blank(value) {
            return plain(self.blank_value());
        }

        if self.is_date_field(header) {
            return self.normalize_date(value);
        }

        match value {
            CellValue::Text(text) => plain(CellValue::Text(collapse_whitespace(text))),
            CellValue::List(items) => plain(CellValue::List(
                items
                    .iter()
                    .map(|item| self.normalize_inner(header, item, records).value)
                    .collect(),
            )),
            CellValue::Record(record) => plain(CellValue::Record(self.normalize_record(record, records))),
            other => plain(other.clone()),
        }
    }

    /// Rebuild a record with its keys acting as headers. Already-visited nodes map
    /// to the same rebuilt node, so shared and cyclic structure is preserved.
    fn normalize_record(&self, record: &Record, records: &mut HashMap<usize, Record>) -> Record {
        if let Some(rebuilt) = records.get(&record.node_id()) {
            return rebuilt.clone();
        }

        let rebuilt = Record::new();
        records.insert(record.node_id(), rebuilt.clone());

        for (key, value) in record.entries() {
            let normalized = self.normalize_inner(&key, &value, records).value;
            rebuilt.insert(key, normalized);
        }
        rebuilt
    }

    fn normalize_date(&self, value: &CellValue) -> NormalizedField {
        let canonical = match value {
            CellValue::Text(text) if self.config.is_marker(text) => return plain(value.clone()),
            CellValue::Text(text) => self.canonical_date(text),
            CellValue::Number(serial) => {
                serial_to_datetime(*serial).map(|datetime| datetime.format("%Y-%m-%d").to_string())
            }
            _ => None,
        };

        match canonical {
            Some(date) => plain(CellValue::Text(date)),
            None => NormalizedField {
                value: CellValue::text(self.config.invalid_date_marker.clone()),
                issue: Some(FieldIssue::InvalidDate {
                    raw: match value {
                        CellValue::Text(text) => text.clone(),
                        CellValue::Number(number) => format_number(*number),
                        other => format!("<{}>", other.type_name()),
                    },
                }),
            },
        }
    }

    /// `YYYY-MM-DD` for a recognizable date string, after month-name translation
    pub fn canonical_date(&self, raw: &str) -> Option<String> {
        let mut text = collapse_whitespace(raw);
        for alias in &self.month_aliases {
            if text.contains(alias.alias.as_str()) {
                text = text.replace(alias.alias.as_str(), &alias.month);
            }
        }

        parse_date(&text).map(|date| date.format("%Y-%m-%d").to_string())
    }
}

fn plain(value: CellValue) -> NormalizedField {
    NormalizedField { value, issue: None }
}

fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::Text(text) => text.trim().is_empty(),
        CellValue::Number(number) => !number.is_finite(),
        _ => false,
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::refinement_policy::RefinementPolicy;
    use crate::domain::SkipReason;

    fn normalizer() -> FieldNormalizer {
        FieldNormalizer::new(&CleaningConfig::default())
    }

    #[test]
    fn test_chinese_month_date() {
        let value = normalizer().normalize("birth_date", &CellValue::text("一月 5, 2020"));
        assert_eq!(value, CellValue::text("2020-01-05"));
    }

    #[test]
    fn test_longer_month_alias_wins() {
        let n = normalizer();
        assert_eq!(n.canonical_date("十一月 5, 2020").as_deref(), Some("2020-11-05"));
        assert_eq!(n.canonical_date("十二月 25, 2021").as_deref(), Some("2021-12-25"));
    }

    #[test]
    fn test_blank_becomes_sentinel() {
        let n = normalizer();
        assert_eq!(n.normalize("note", &CellValue::text("")), CellValue::text("Not Provided"));
        assert_eq!(n.normalize("note", &CellValue::text("   ")), CellValue::text("Not Provided"));
        assert_eq!(n.normalize("note", &CellValue::Null), CellValue::text("Not Provided"));
        assert_eq!(
            n.normalize("score", &CellValue::Number(f64::NAN)),
            CellValue::text("Not Provided")
        );
        // Blank wins over date handling
        assert_eq!(n.normalize("tarikh_mati", &CellValue::Null), CellValue::text("Not Provided"));
    }

    #[test]
    fn test_null_blank_policy() {
        let n = FieldNormalizer::new(&CleaningConfig {
            blank_policy: BlankPolicy::Null,
            ..Default::default()
        });
        assert_eq!(n.normalize("note", &CellValue::text(" ")), CellValue::Null);
    }

    #[test]
    fn test_invalid_date_reports_issue() {
        let field = normalizer().normalize_field("tarikh_lahir", &CellValue::text("sometime soon"));
        assert_eq!(field.value, CellValue::text("Invalid Date"));
        assert_eq!(
            field.issue,
            Some(FieldIssue::InvalidDate {
                raw: "sometime soon".to_string()
            })
        );

        let field = normalizer().normalize_field("date", &CellValue::Bool(true));
        assert_eq!(field.value, CellValue::text("Invalid Date"));
    }

    #[test]
    fn test_date_formats() {
        let n = normalizer();
        for raw in [
            "2020-01-05",
            "2020/01/05",
            "01/05/2020",
            "January 5, 2020",
            "Jan 5 2020",
            "5 January 2020",
            "2020-01-05T08:30:00Z",
            "2020-01-05 08:30:00",
            "2020年1月5日",
        ] {
            assert_eq!(n.canonical_date(raw).as_deref(), Some("2020-01-05"), "{}", raw);
        }
    }

    #[test]
    fn test_serial_number_in_date_column() {
        let value = normalizer().normalize("start_date", &CellValue::Number(43835.0));
        assert_eq!(value, CellValue::text("2020-01-05"));
    }

    #[test]
    fn test_text_whitespace_collapsed_and_types_kept() {
        let n = normalizer();
        assert_eq!(
            n.normalize("note", &CellValue::text("  hello \t  big\n world ")),
            CellValue::text("hello big world")
        );
        assert_eq!(n.normalize("age", &CellValue::Number(36.0)), CellValue::Number(36.0));
        assert_eq!(n.normalize("active", &CellValue::Bool(false)), CellValue::Bool(false));
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        let inputs = [
            ("birth_date", CellValue::text("一月 5, 2020")),
            ("birth_date", CellValue::text("garbage")),
            ("birth_date", CellValue::Number(43835.5)),
            ("note", CellValue::text("  a   b ")),
            ("note", CellValue::Null),
            ("note", CellValue::Number(f64::INFINITY)),
            ("tags", CellValue::List(vec![CellValue::text(" x "), CellValue::Null])),
        ];

        for (header, value) in inputs {
            let once = n.normalize(header, &value);
            let twice = n.normalize(header, &once);
            assert_eq!(once, twice, "{} {:?}", header, value);
        }
    }

    #[test]
    fn test_date_columns_agree_with_refinement_policy() {
        let config = CleaningConfig {
            date_field_markers: vec!["DOB".to_string()],
            ..Default::default()
        };
        let n = FieldNormalizer::new(&config);
        let policy = RefinementPolicy::new(&config);

        for header in ["dob", "DOB_utc", "name"] {
            let skipped = policy.evaluate(0, header, &CellValue::text("a long enough sentence"))
                == Err(SkipReason::DateField);
            assert_eq!(n.is_date_field(header), skipped, "{}", header);
        }
        assert_eq!(n.normalize("dob", &CellValue::text("2020/01/05")), CellValue::text("2020-01-05"));
    }

    #[test]
    fn test_records_use_keys_as_headers() {
        let record = Record::from_entries(vec![
            ("joined_date".to_string(), CellValue::text("Jan 5 2020")),
            ("note".to_string(), CellValue::text("  spaced   out ")),
            ("missing".to_string(), CellValue::Null),
        ]);

        match normalizer().normalize("meta", &CellValue::Record(record.clone())) {
            CellValue::Record(cleaned) => {
                assert!(!cleaned.same_node(&record));
                assert_eq!(cleaned.get("joined_date"), Some(CellValue::text("2020-01-05")));
                assert_eq!(cleaned.get("note"), Some(CellValue::text("spaced out")));
                assert_eq!(cleaned.get("missing"), Some(CellValue::text("Not Provided")));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_cyclic_record_terminates_and_keeps_cycle() {
        let record = Record::new();
        record.insert("name", CellValue::text(" loop "));
        record.insert("self", CellValue::Record(record.clone()));

        match normalizer().normalize("meta", &CellValue::Record(record)) {
            CellValue::Record(cleaned) => match cleaned.get("self") {
                Some(CellValue::Record(inner)) => assert!(inner.same_node(&cleaned)),
                other => panic!("expected record, got {:?}", other),
            },
            other => panic!("expected record, got {:?}", other),
        }
    }
}
