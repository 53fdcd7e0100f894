use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::ValidationIssue;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    /// No non-blank row survived filtering
    EmptyDocument,
    /// Source bytes could not be decoded as the expected tabular format
    UnreadableDocument(String),
    /// Cleaned dataset was rejected by the document validator
    ValidationFailed(Vec<ValidationIssue>),
    ConfigError(String),
    ValidationError(String),
    LLMError(String),
    SecurityError(String),
    IoError(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EmptyDocument => write!(f, "Empty document: no valid data found"),
            AppError::UnreadableDocument(msg) => write!(f, "Unreadable document: {}", msg),
            AppError::ValidationFailed(issues) => {
                let joined = issues
                    .iter()
                    .map(|issue| issue.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Invalid dataset structure: {}", joined)
            }
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
