use serde::{Deserialize, Serialize};
use std::fmt;

/// A document-level problem found by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A record reaches itself through its own values
    CircularReference { path: String },
    /// The dataset does not survive a JSON round-trip unchanged
    SerializationFailed { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::CircularReference { path } => {
                write!(f, "Circular reference detected in data structure at {}", path)
            }
            ValidationIssue::SerializationFailed { message } => {
                write!(f, "JSON validation error: {}", message)
            }
        }
    }
}

/// Outcome of validating a dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
