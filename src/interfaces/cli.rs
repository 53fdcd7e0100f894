use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::use_cases::exporter::{for_target, write_export, ExportFormat};
use crate::application::{CleaningPipeline, TextCleaningUseCase};
use crate::domain::error::{AppError, Result};
use crate::domain::PipelineProgress;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::build_gateway;
use crate::infrastructure::tabular::SourceDocument;

#[derive(Parser, Debug)]
#[command(name = "datacleaner")]
#[command(about = "Clean spreadsheet data and export it as CSV or JSON")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean a workbook, CSV or JSON file and write the exports
    #[command(after_help = "\
Examples:
  datacleaner clean people.xlsx
  datacleaner clean people.csv -o out --format json
  datacleaner clean people.json --no-refine --report run.json")]
    Clean {
        /// Input file (.xlsx, .xls, .ods, .csv, .json)
        input: PathBuf,

        /// Directory for cleaned_<name>.csv / .json
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Both)]
        format: OutputFormat,

        /// Skip the refinement endpoint entirely
        #[arg(long)]
        no_refine: bool,

        /// Only text longer than this many characters is refined
        #[arg(long)]
        threshold: Option<usize>,

        /// Only the first N rows are refined
        #[arg(long)]
        budget: Option<usize>,

        /// Write the run report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Clean a piece of free text
    RefineText {
        text: String,
    },

    /// Manage the API key kept in the OS keyring
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store an API key
    Set {
        #[arg(env = "HUGGINGFACE_API_KEY", hide_env_values = true)]
        key: String,
    },
    /// Remove the stored API key
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn export_formats(&self) -> Vec<ExportFormat> {
        match self {
            OutputFormat::Csv => vec![ExportFormat::Csv],
            OutputFormat::Json => vec![ExportFormat::Json],
            OutputFormat::Both => vec![ExportFormat::Csv, ExportFormat::Json],
        }
    }
}

impl Cli {
    pub fn config_service(&self) -> ConfigService {
        match &self.config {
            Some(path) => ConfigService::new().with_config_file(path),
            None => ConfigService::new(),
        }
    }
}

/// Fold command-line overrides into the loaded configuration
pub fn apply_overrides(
    mut config: AppConfig,
    no_refine: bool,
    threshold: Option<usize>,
    budget: Option<usize>,
) -> AppConfig {
    if let Some(threshold) = threshold {
        config.cleaning.refine_length_threshold = threshold;
    }
    if let Some(budget) = budget {
        config.cleaning.row_budget = budget;
    }
    if no_refine {
        config.refinement.enabled = false;
        config.cleaning = config.cleaning.without_refinement();
    }
    config
}

pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let service = cli.config_service();

    match cli.command {
        Commands::Clean {
            input,
            out_dir,
            format,
            no_refine,
            threshold,
            budget,
            report,
        } => {
            let config = apply_overrides(config, no_refine, threshold, budget);
            clean(input, out_dir, format, report, config).await
        }
        Commands::RefineText { text } => {
            let gateway = build_gateway(&config.refinement);
            let refined = TextCleaningUseCase::new(gateway, &config.cleaning)
                .execute(&text)
                .await?;
            println!("{}", refined);
            Ok(())
        }
        Commands::Key { action } => match action {
            KeyAction::Set { key } => {
                service.save_api_key(&key)?;
                println!("API key stored");
                Ok(())
            }
            KeyAction::Delete => {
                service.delete_api_key()?;
                println!("API key removed");
                Ok(())
            }
        },
    }
}

async fn clean(
    input: PathBuf,
    out_dir: PathBuf,
    format: OutputFormat,
    report_path: Option<PathBuf>,
    config: AppConfig,
) -> Result<()> {
    let max_bytes = config.cleaning.max_document_bytes;
    let sentinel = config.cleaning.blank_sentinel.clone();
    let source = tokio::task::spawn_blocking(move || SourceDocument::read(&input, max_bytes))
        .await
        .map_err(|e| AppError::Internal(format!("File read task failed: {}", e)))??;

    let (progress_tx, mut progress_rx) = mpsc::channel::<PipelineProgress>(64);
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            debug!(
                stage = %progress.stage,
                completed = progress.completed_rows,
                total = progress.total_rows,
                percent = progress.percent(),
                "Progress"
            );
        }
    });

    let token = CancellationToken::new();
    let interrupt = token.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, remaining refinement calls will be skipped");
            interrupt.cancel();
        }
    });

    let pipeline = CleaningPipeline::new(config.cleaning, build_gateway(&config.refinement))
        .with_progress(progress_tx)
        .with_cancellation(token);
    let result = pipeline.run(&source).await;

    signal_task.abort();
    drop(pipeline);
    let _ = progress_task.await;

    let run = result?;

    for export_format in format.export_formats() {
        let rendered = for_target(&run.dataset, export_format, &sentinel)?;
        let path = write_export(&rendered, &out_dir, source.stem(), export_format)?;
        println!("{}", path.display());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&run.report)
            .map_err(|e| AppError::Internal(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(&path, json)?;
    }

    println!(
        "{} rows cleaned, {} refined, {} refinement failures, {} invalid dates",
        run.report.row_count,
        run.report.refined_cells,
        run.report.failed_refinements,
        run.report.invalid_dates
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlankPolicy;

    #[test]
    fn test_parse_clean_command() {
        let cli = Cli::parse_from([
            "datacleaner",
            "clean",
            "people.csv",
            "--format",
            "json",
            "--threshold",
            "20",
            "--config",
            "settings.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("settings.toml")));
        match cli.command {
            Commands::Clean {
                input,
                format,
                threshold,
                no_refine,
                ..
            } => {
                assert_eq!(input, PathBuf::from("people.csv"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(threshold, Some(20));
                assert!(!no_refine);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let config = apply_overrides(AppConfig::default(), true, Some(3), Some(9));
        assert_eq!(config.cleaning.refine_length_threshold, 3);
        assert_eq!(config.cleaning.row_budget, 0);
        assert!(!config.refinement.enabled);
        assert_eq!(config.cleaning.blank_policy, BlankPolicy::Sentinel);

        let config = apply_overrides(AppConfig::default(), false, None, Some(9));
        assert_eq!(config.cleaning.row_budget, 9);
        assert!(config.refinement.enabled);
    }

    #[test]
    fn test_output_formats() {
        assert_eq!(
            OutputFormat::Both.export_formats(),
            vec![ExportFormat::Csv, ExportFormat::Json]
        );
    }

    #[tokio::test]
    async fn test_clean_writes_exports_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.csv");
        std::fs::write(&input, "Name,Birth Date,Notes\nAda,2020/01/05,\n").unwrap();
        let report = dir.path().join("report.json");

        let config = apply_overrides(AppConfig::default(), true, None, None);
        clean(
            input,
            dir.path().to_path_buf(),
            OutputFormat::Both,
            Some(report.clone()),
            config,
        )
        .await
        .unwrap();

        let csv = std::fs::read_to_string(dir.path().join("cleaned_people.csv")).unwrap();
        assert_eq!(csv, "name,birth_date,notes\r\nAda,2020-01-05,Not Provided\r\n");
        let json = std::fs::read_to_string(dir.path().join("cleaned_people.json")).unwrap();
        assert!(json.contains("\"notes\": null"), "{}", json);
        assert!(json.contains("\"birth_date\": \"2020-01-05\""));
        assert!(std::fs::read_to_string(report).unwrap().contains("\"row_count\": 1"));
    }

    #[tokio::test]
    async fn test_clean_json_only_keeps_header_for_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.csv");
        std::fs::write(&input, "Name,Age\n").unwrap();

        let config = apply_overrides(AppConfig::default(), true, None, None);
        clean(input, dir.path().to_path_buf(), OutputFormat::Json, None, config)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("cleaned_empty.json")).unwrap(),
            "[]"
        );
        assert!(!dir.path().join("cleaned_empty.csv").exists());
    }
}
