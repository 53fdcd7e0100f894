// ============================================================
// PIPELINE STATE
// ============================================================
// Run stages, progress events and the per-run report

use serde::{Deserialize, Serialize};

use super::CellOutcome;

/// Stage of a single document run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Loading,
    Normalizing,
    Refining,
    Validating,
    Exportable,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Exportable | PipelineStage::Failed)
    }

    /// Whether `next` is a legal forward step from this stage
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            // Only loading can fail the document
            PipelineStage::Failed => *self == PipelineStage::Loading,
            PipelineStage::Exportable => *self == PipelineStage::Validating,
            _ => next > *self,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Loading => "loading",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Refining => "refining",
            PipelineStage::Validating => "validating",
            PipelineStage::Exportable => "exportable",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Advisory progress signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub stage: PipelineStage,
    pub completed_rows: usize,
    pub total_rows: usize,
}

impl PipelineProgress {
    pub fn percent(&self) -> u8 {
        if self.total_rows == 0 {
            return 100;
        }
        ((self.completed_rows * 100) / self.total_rows).min(100) as u8
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub row_count: usize,
    pub column_count: usize,
    pub refinement_calls: usize,
    pub refined_cells: usize,
    pub failed_refinements: usize,
    pub invalid_dates: usize,
    pub cancelled: bool,
    pub cells: Vec<CellOutcome>,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        assert!(PipelineStage::Idle.can_advance_to(PipelineStage::Loading));
        assert!(PipelineStage::Loading.can_advance_to(PipelineStage::Normalizing));
        assert!(PipelineStage::Validating.can_advance_to(PipelineStage::Exportable));
        assert!(!PipelineStage::Refining.can_advance_to(PipelineStage::Normalizing));
        assert!(!PipelineStage::Exportable.can_advance_to(PipelineStage::Validating));
    }

    #[test]
    fn test_only_loading_fails() {
        assert!(PipelineStage::Loading.can_advance_to(PipelineStage::Failed));
        assert!(!PipelineStage::Refining.can_advance_to(PipelineStage::Failed));
        assert!(!PipelineStage::Validating.can_advance_to(PipelineStage::Failed));
    }

    #[test]
    fn test_progress_percent() {
        let progress = PipelineProgress {
            stage: PipelineStage::Normalizing,
            completed_rows: 1,
            total_rows: 4,
        };
        assert_eq!(progress.percent(), 25);
    }
}
