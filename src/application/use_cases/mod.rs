pub mod cleaning_pipeline;
pub mod document_validator;
pub mod exporter;
pub mod field_normalizer;
pub mod refinement_policy;
pub mod tabular_loader;
pub mod text_cleaning;
