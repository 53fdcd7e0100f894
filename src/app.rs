use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::domain::error::Result;
use crate::interfaces::cli::{self, Cli};

/// `RUST_LOG` wins over the configured filter
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config_service().load() {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            tracing::error!(error = %err, "Failed to load configuration");
            return Err(err);
        }
    };
    init_logging(&config.logging.filter);

    cli::execute(cli, config).await
}
