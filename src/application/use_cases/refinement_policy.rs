use crate::domain::{CellValue, CleaningConfig, SkipReason};

/// Decides which normalized cells are worth a refinement call
#[derive(Debug, Clone)]
pub struct RefinementPolicy {
    config: CleaningConfig,
}

impl RefinementPolicy {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn row_budget(&self) -> usize {
        self.config.row_budget
    }

    /// `Ok(text)` when the cell may go to the gateway, otherwise why not.
    ///
    /// Checks run cheapest-first: row budget, value type, markers, date
    /// columns, then length.
    pub fn evaluate<'a>(
        &self,
        row_index: usize,
        header: &str,
        value: &'a CellValue,
    ) -> Result<&'a str, SkipReason> {
        let budget = self.config.row_budget;
        if row_index >= budget {
            return Err(SkipReason::OverRowBudget { row_index, budget });
        }

        let text = match value {
            CellValue::Text(text) => text.as_str(),
            _ => return Err(SkipReason::NotText),
        };

        if text.trim().is_empty() {
            return Err(SkipReason::EmptyInput);
        }

        if self.config.is_marker(text) {
            return Err(SkipReason::Marker);
        }

        if self.config.is_date_field(header) {
            return Err(SkipReason::DateField);
        }

        let length = text.chars().count();
        let threshold = self.config.refine_length_threshold;
        if length <= threshold {
            return Err(SkipReason::TooShort { length, threshold });
        }

        Ok(text)
    }
}
