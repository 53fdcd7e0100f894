use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::{CellValue, CleaningConfig, RefinementOutcome};
use crate::infrastructure::llm_clients::RefinementGateway;

use super::field_normalizer::FieldNormalizer;

/// Paste-in free text cleaning: whitespace normalization, then one gateway call
pub struct TextCleaningUseCase {
    gateway: Arc<dyn RefinementGateway + Send + Sync>,
    normalizer: FieldNormalizer,
}

impl TextCleaningUseCase {
    pub fn new(gateway: Arc<dyn RefinementGateway + Send + Sync>, config: &CleaningConfig) -> Self {
        Self {
            gateway,
            normalizer: FieldNormalizer::new(config),
        }
    }

    pub async fn execute(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AppError::ValidationError("Text cannot be empty".to_string()));
        }

        let normalized = match self.normalizer.normalize("text", &CellValue::text(text)) {
            CellValue::Text(normalized) => normalized,
            other => other.to_field_string(),
        };

        match self.gateway.refine(&normalized).await {
            RefinementOutcome::Refined(refined) => {
                info!(input_chars = normalized.chars().count(), "Text refined");
                Ok(refined)
            }
            RefinementOutcome::Skipped(reason) => {
                warn!(reason = ?reason, "Refinement skipped, returning normalized text");
                Ok(normalized)
            }
            RefinementOutcome::Failed(failure) => Err(AppError::LLMError(failure.to_string())),
        }
    }
}
