pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

mod app;

pub use app::{init_logging, run};
pub use application::{CleaningPipeline, DocumentValidator, PipelineRun};
pub use domain::error::{AppError, Result};
