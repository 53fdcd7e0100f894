pub mod use_cases;

pub use use_cases::cleaning_pipeline::{CleaningPipeline, PipelineRun};
pub use use_cases::document_validator::DocumentValidator;
pub use use_cases::exporter::ExportFormat;
pub use use_cases::field_normalizer::FieldNormalizer;
pub use use_cases::refinement_policy::RefinementPolicy;
pub use use_cases::tabular_loader::TabularLoader;
pub use use_cases::text_cleaning::TextCleaningUseCase;
