// ============================================================
// CLEANING PIPELINE
// ============================================================
// Loader -> Normalizer -> Policy -> Gateway -> Validator, one document per run

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};
use crate::domain::{
    CellOutcome, CellValue, CleanedRow, CleaningConfig, Dataset, FieldIssue, PipelineProgress,
    PipelineStage, RawCell, RawDocument, RefinementOutcome, RunReport, SkipReason,
    ValidatedDataset,
};
use crate::infrastructure::llm_clients::RefinementGateway;
use crate::infrastructure::tabular::SourceDocument;

use super::document_validator::DocumentValidator;
use super::field_normalizer::FieldNormalizer;
use super::refinement_policy::RefinementPolicy;
use super::tabular_loader::TabularLoader;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub dataset: ValidatedDataset,
    pub report: RunReport,
}

pub struct CleaningPipeline {
    config: CleaningConfig,
    gateway: Arc<dyn RefinementGateway + Send + Sync>,
    progress: Option<mpsc::Sender<PipelineProgress>>,
    cancel: Option<CancellationToken>,
}

/// Forward-only stage bookkeeping for a single run
struct StageTracker<'a> {
    stage: PipelineStage,
    progress: Option<&'a mpsc::Sender<PipelineProgress>>,
}

impl<'a> StageTracker<'a> {
    fn advance(&mut self, next: PipelineStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(AppError::Internal(format!(
                "Illegal pipeline transition {} -> {}",
                self.stage, next
            )));
        }
        debug!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
        Ok(())
    }

    /// Advisory only: a full or closed channel never stalls the run
    fn report(&self, completed_rows: usize, total_rows: usize) {
        let Some(sender) = self.progress else {
            return;
        };

        let event = PipelineProgress {
            stage: self.stage,
            completed_rows,
            total_rows,
        };
        match sender.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                debug!(stage = %self.stage, completed_rows, "Progress channel full, event dropped")
            }
        }
    }
}

impl CleaningPipeline {
    pub fn new(config: CleaningConfig, gateway: Arc<dyn RefinementGateway + Send + Sync>) -> Self {
        Self {
            config,
            gateway,
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, sender: mpsc::Sender<PipelineProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Load and clean one source document
    pub async fn run(&self, source: &SourceDocument) -> Result<PipelineRun> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("cleaning_run", run_id = %run_id, source = %source.name);

        async {
            let started = Instant::now();
            let mut tracker = self.tracker();

            tracker.advance(PipelineStage::Loading)?;
            tracker.report(0, 0);

            let loader = TabularLoader::new(self.config.header_collisions);
            let document = match loader.load(source) {
                Ok(document) => document,
                Err(e) => {
                    error!(error = %e, "Failed to load document");
                    tracker.advance(PipelineStage::Failed)?;
                    tracker.report(0, 0);
                    return Err(e);
                }
            };

            self.process(run_id, document, tracker, started).await
        }
        .instrument(span)
        .await
    }

    /// Clean an already-loaded document
    pub async fn run_document(&self, document: RawDocument) -> Result<PipelineRun> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("cleaning_run", run_id = %run_id);

        async {
            let started = Instant::now();
            let mut tracker = self.tracker();
            tracker.advance(PipelineStage::Loading)?;
            self.process(run_id, document, tracker, started).await
        }
        .instrument(span)
        .await
    }

    fn tracker(&self) -> StageTracker<'_> {
        StageTracker {
            stage: PipelineStage::Idle,
            progress: self.progress.as_ref(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    fn should_report(&self, completed: usize, total: usize) -> bool {
        completed == total || completed % self.config.progress_every_rows.max(1) == 0
    }

    async fn process(
        &self,
        run_id: String,
        document: RawDocument,
        mut tracker: StageTracker<'_>,
        started: Instant,
    ) -> Result<PipelineRun> {
        let RawDocument { header, rows } = document;
        let total = rows.len();
        let names = header.names().to_vec();

        info!(rows = total, columns = names.len(), "Cleaning started");

        // Normalize every cell
        tracker.advance(PipelineStage::Normalizing)?;
        let normalizer = FieldNormalizer::new(&self.config);
        let mut issues: Vec<Vec<Option<FieldIssue>>> = Vec::with_capacity(total);
        let mut cleaned_rows = Vec::with_capacity(total);

        for (index, row) in rows.into_iter().enumerate() {
            let mut fields = Vec::with_capacity(names.len());
            let mut row_issues = Vec::with_capacity(names.len());

            // Rows shorter than the header read as blank
            let cells = row.0.into_iter().chain(std::iter::repeat(RawCell::Blank));
            for (name, cell) in names.iter().zip(cells) {
                let normalized = normalizer.normalize_field(name, &cell.into_value());
                if let Some(FieldIssue::InvalidDate { raw }) = &normalized.issue {
                    debug!(row = index, field = %name, raw = %raw, "Invalid date");
                }
                fields.push((name.clone(), normalized.value));
                row_issues.push(normalized.issue);
            }

            cleaned_rows.push(CleanedRow::new(fields));
            issues.push(row_issues);

            if self.should_report(index + 1, total) {
                tracker.report(index + 1, total);
            }
        }

        let mut dataset = Dataset::new(header, cleaned_rows);

        // Refine eligible text cells, one gateway call at a time
        tracker.advance(PipelineStage::Refining)?;
        let policy = RefinementPolicy::new(&self.config);
        let mut report = RunReport {
            run_id,
            row_count: total,
            column_count: names.len(),
            ..Default::default()
        };

        for (index, (row, row_issues)) in dataset.rows_mut().iter_mut().zip(issues).enumerate() {
            for (column, issue) in row_issues.into_iter().enumerate() {
                let name = &names[column];
                let decision = match row.get(name) {
                    Some(value) => policy.evaluate(index, name, value).map(str::to_string),
                    None => Err(SkipReason::EmptyInput),
                };

                let refinement = match decision {
                    Err(reason) => RefinementOutcome::Skipped(reason),
                    Ok(_) if self.is_cancelled() => {
                        report.cancelled = true;
                        RefinementOutcome::Skipped(SkipReason::Cancelled)
                    }
                    Ok(text) => {
                        report.refinement_calls += 1;
                        let outcome = self.gateway.refine(&text).await;
                        match &outcome {
                            RefinementOutcome::Refined(refined) => {
                                report.refined_cells += 1;
                                row.set(name, CellValue::text(refined.clone()));
                            }
                            RefinementOutcome::Failed(failure) => {
                                report.failed_refinements += 1;
                                warn!(row = index, field = %name, error = %failure, "Refinement failed, keeping normalized value");
                            }
                            RefinementOutcome::Skipped(_) => {}
                        }
                        outcome
                    }
                };

                if issue.is_some() {
                    report.invalid_dates += 1;
                }
                report.cells.push(CellOutcome {
                    row_index: index,
                    field: name.clone(),
                    refinement,
                    issue,
                });
            }

            if self.should_report(index + 1, total) {
                tracker.report(index + 1, total);
            }
        }

        if report.cancelled {
            info!(calls = report.refinement_calls, "Run cancelled, remaining refinement skipped");
        }

        // Whole-document checks
        tracker.advance(PipelineStage::Validating)?;
        tracker.report(total, total);
        let dataset = DocumentValidator::accept(dataset).map_err(|e| {
            error!(error = %e, "Cleaned dataset failed validation");
            e
        })?;

        tracker.advance(PipelineStage::Exportable)?;
        tracker.report(total, total);

        report.processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            rows = report.row_count,
            calls = report.refinement_calls,
            refined = report.refined_cells,
            failed = report.failed_refinements,
            invalid_dates = report.invalid_dates,
            elapsed_ms = report.processing_time_ms,
            "Cleaning finished"
        );

        Ok(PipelineRun { dataset, report })
    }
}
