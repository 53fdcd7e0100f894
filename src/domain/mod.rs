// ============================================================
// DOMAIN LAYER
// ============================================================
// Core types and value objects for the cleaning pipeline
// No I/O, no async

pub mod error;

mod cell;
mod cleaning_config;
mod dataset;
mod llm_config;
mod pipeline;
mod refinement;
mod validation;

pub use cell::{format_number, CellValue, RawCell, Record};
pub use cleaning_config::{
    default_month_aliases, BlankPolicy, CleaningConfig, HeaderCollisionPolicy, MonthAlias,
};
pub use dataset::{
    normalize_header_name, CleanedRow, Dataset, Header, HeaderLayout, RawDocument, RawRow,
    ValidatedDataset,
};
pub use llm_config::RefinementEndpointConfig;
pub use pipeline::{PipelineProgress, PipelineStage, RunReport};
pub use refinement::{
    CellOutcome, FieldIssue, RefinementErrorKind, RefinementFailure, RefinementOutcome,
    SkipReason,
};
pub use validation::{ValidationIssue, ValidationReport};
