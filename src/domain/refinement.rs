// ============================================================
// REFINEMENT OUTCOMES
// ============================================================
// What happened to each cell with respect to remote refinement

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of considering one cell for refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RefinementOutcome {
    Refined(String),
    Skipped(SkipReason),
    Failed(RefinementFailure),
}

impl RefinementOutcome {
    pub fn is_refined(&self) -> bool {
        matches!(self, RefinementOutcome::Refined(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RefinementOutcome::Failed(_))
    }
}

/// Why a cell was not sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyInput,
    NotText,
    TooShort { length: usize, threshold: usize },
    OverRowBudget { row_index: usize, budget: usize },
    /// Blank sentinel or invalid-date marker
    Marker,
    DateField,
    Cancelled,
    RefinementDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementErrorKind {
    /// Endpoint answered with a non-success status
    HttpStatus,
    /// Request never completed (connect, timeout, body read)
    Transport,
    /// Body was not JSON, or carried no usable text
    MalformedResponse,
}

/// Diagnostic for a failed refinement call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementFailure {
    pub kind: RefinementErrorKind,
    pub status: Option<u16>,
    pub detail: String,
}

impl RefinementFailure {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: RefinementErrorKind::HttpStatus,
            status: Some(status),
            detail: body.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            kind: RefinementErrorKind::Transport,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn malformed(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            kind: RefinementErrorKind::MalformedResponse,
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RefinementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.status) {
            (RefinementErrorKind::HttpStatus, Some(status)) => {
                write!(f, "API error ({}): {}", status, self.detail)
            }
            (RefinementErrorKind::Transport, _) => write!(f, "Request failed: {}", self.detail),
            _ => write!(f, "Invalid response format: {}", self.detail),
        }
    }
}

/// Non-fatal problem found while normalizing a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FieldIssue {
    InvalidDate { raw: String },
}

/// Everything recorded about one cell during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOutcome {
    pub row_index: usize,
    pub field: String,
    pub refinement: RefinementOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<FieldIssue>,
}
