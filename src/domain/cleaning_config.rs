// ============================================================
// CLEANING CONFIGURATION
// ============================================================
// Tunables for normalization, refinement eligibility and progress

use serde::{Deserialize, Serialize};
use validator::Validate;

/// What a blank cell becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankPolicy {
    /// Replace with the configured sentinel text ("Not Provided")
    Sentinel,
    /// Keep as JSON null
    Null,
}

/// What happens when two raw headers normalize to the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderCollisionPolicy {
    /// Rename later columns `name_2`, `name_3`, ...
    Suffix,
    /// Later column silently replaces the earlier one
    Overwrite,
}

/// One month-name alias, replaced before date parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthAlias {
    pub alias: String,
    pub month: String,
}

impl MonthAlias {
    pub fn new(alias: &str, month: &str) -> Self {
        Self {
            alias: alias.to_string(),
            month: month.to_string(),
        }
    }
}

/// Chinese month names, one per month
pub fn default_month_aliases() -> Vec<MonthAlias> {
    vec![
        MonthAlias::new("一月", "January"),
        MonthAlias::new("二月", "February"),
        MonthAlias::new("三月", "March"),
        MonthAlias::new("四月", "April"),
        MonthAlias::new("五月", "May"),
        MonthAlias::new("六月", "June"),
        MonthAlias::new("七月", "July"),
        MonthAlias::new("八月", "August"),
        MonthAlias::new("九月", "September"),
        MonthAlias::new("十月", "October"),
        MonthAlias::new("十一月", "November"),
        MonthAlias::new("十二月", "December"),
    ]
}

/// Configuration for a cleaning run
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CleaningConfig {
    /// Text strictly longer than this many characters may be refined (default: 10)
    pub refine_length_threshold: usize,

    /// Only rows with an index below this may be refined (default: 5)
    pub row_budget: usize,

    /// Case-insensitive header substrings that mark date fields
    pub date_field_markers: Vec<String>,

    /// Month-name aliases translated to English before parsing
    pub month_names: Vec<MonthAlias>,

    /// Blank cells become the sentinel or null
    pub blank_policy: BlankPolicy,

    #[validate(length(min = 1))]
    pub blank_sentinel: String,

    #[validate(length(min = 1))]
    pub invalid_date_marker: String,

    pub header_collisions: HeaderCollisionPolicy,

    /// Emit a progress event every N rows (default: 1)
    #[validate(range(min = 1))]
    pub progress_every_rows: usize,

    /// Largest source document accepted, in bytes (default: 50 MiB)
    #[validate(range(min = 1))]
    pub max_document_bytes: u64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            refine_length_threshold: 10,
            row_budget: 5,
            date_field_markers: vec![
                "tarikh_lahir".to_string(),
                "tarikh_mati".to_string(),
                "date".to_string(),
            ],
            month_names: default_month_aliases(),
            blank_policy: BlankPolicy::Sentinel,
            blank_sentinel: "Not Provided".to_string(),
            invalid_date_marker: "Invalid Date".to_string(),
            header_collisions: HeaderCollisionPolicy::Suffix,
            progress_every_rows: 1,
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

impl CleaningConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable remote refinement entirely
    pub fn without_refinement(mut self) -> Self {
        self.row_budget = 0;
        self
    }

    /// Whether a normalized header names a date field
    pub fn is_date_field(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        self.date_field_markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .any(|marker| header.contains(&marker.to_lowercase()))
    }

    /// Whether a text is one of the markers the normalizer produces
    pub fn is_marker(&self, text: &str) -> bool {
        text == self.blank_sentinel || text == self.invalid_date_marker
    }

    /// Validate configuration values
    pub fn validate_settings(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;

        // Markers must already be in normalized form or a second pass would rewrite them
        for (name, value) in [
            ("blank_sentinel", &self.blank_sentinel),
            ("invalid_date_marker", &self.invalid_date_marker),
        ] {
            if value.split_whitespace().collect::<Vec<_>>().join(" ") != *value {
                return Err(format!(
                    "{} must not have leading, trailing or repeated whitespace (got {:?})",
                    name, value
                ));
            }
        }

        if let Some(alias) = self
            .month_names
            .iter()
            .find(|alias| alias.alias.trim().is_empty() || alias.month.trim().is_empty())
        {
            return Err(format!(
                "month_names entries need both alias and month (got {:?} -> {:?})",
                alias.alias, alias.month
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CleaningConfig::default();
        assert!(config.validate_settings().is_ok());
        assert_eq!(config.month_names.len(), 12);
    }

    #[test]
    fn test_date_field_detection() {
        let config = CleaningConfig::default();
        assert!(config.is_date_field("birth_date"));
        assert!(config.is_date_field("Tarikh_Lahir"));
        assert!(config.is_date_field("updated_date_utc"));
        assert!(!config.is_date_field("name"));
    }

    #[test]
    fn test_zero_progress_interval_rejected() {
        let config = CleaningConfig {
            progress_every_rows: 0,
            ..Default::default()
        };
        assert!(config.validate_settings().is_err());
    }

    #[test]
    fn test_blank_month_alias_rejected() {
        let mut config = CleaningConfig::default();
        config.month_names.push(MonthAlias::new(" ", "January"));
        let err = config.validate_settings().unwrap_err();
        assert!(err.contains("month_names"));
    }

    #[test]
    fn test_without_refinement_zeroes_budget() {
        let config = CleaningConfig::new().without_refinement();
        assert_eq!(config.row_budget, 0);
        assert_eq!(config.blank_policy, BlankPolicy::Sentinel);
    }

    #[test]
    fn test_padded_markers_rejected() {
        for sentinel in [" N/A ", "N/A ", "not  given"] {
            let config = CleaningConfig {
                blank_sentinel: sentinel.to_string(),
                ..Default::default()
            };
            let err = config.validate_settings().unwrap_err();
            assert!(err.contains("blank_sentinel"), "{}", err);
        }

        let config = CleaningConfig {
            invalid_date_marker: "bad\tdate".to_string(),
            ..Default::default()
        };
        assert!(config.validate_settings().is_err());

        let config = CleaningConfig {
            blank_sentinel: "N/A".to_string(),
            ..Default::default()
        };
        assert!(config.validate_settings().is_ok());
    }

    #[test]
    fn test_mixed_case_markers_match() {
        let config = CleaningConfig {
            date_field_markers: vec!["DOB".to_string(), String::new()],
            ..Default::default()
        };
        assert!(config.is_date_field("dob_utc"));
        assert!(!config.is_date_field("name"));
    }
}
