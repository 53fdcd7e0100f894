use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::{CleaningConfig, RefinementEndpointConfig};
use crate::infrastructure::security::keyring::KeyringManager;

pub const ENV_PREFIX: &str = "DATACLEANER_";
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";
pub const KEYRING_SERVICE: &str = "datacleaner";
pub const KEYRING_ACCOUNT: &str = "huggingface";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter directive, overridden by `RUST_LOG`
    #[validate(length(min = 1))]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub cleaning: CleaningConfig,
    #[validate(nested)]
    pub refinement: RefinementEndpointConfig,
    #[validate(nested)]
    pub logging: LoggingConfig,
}

pub struct ConfigService {
    keyring: KeyringManager,
    config_file: Option<PathBuf>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Defaults, then the TOML file (if any), then `DATACLEANER_*` variables
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = &self.config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(&self) -> Result<AppConfig> {
        dotenvy::dotenv().ok();

        if let Some(path) = &self.config_file {
            if !Path::new(path).exists() {
                return Err(AppError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let mut config = Self::extract(self.figment())?;

        if config.refinement.api_key.is_none() {
            config.refinement.api_key = self.resolve_api_key();
        }

        debug!(
            threshold = config.cleaning.refine_length_threshold,
            budget = config.cleaning.row_budget,
            endpoint = %config.refinement.endpoint_url(),
            has_api_key = config.refinement.api_key.is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Extract and validate a configuration from any provider stack
    pub fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        config
            .cleaning
            .validate_settings()
            .map_err(AppError::ConfigError)?;
        check_endpoint_scheme(&config.refinement.base_url)?;

        Ok(config)
    }

    /// Environment first, then the OS keyring. Lookup failures are logged, not fatal.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        match self.keyring.find_secret(KEYRING_ACCOUNT) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, service = self.keyring.service(), "Keyring lookup failed");
                None
            }
        }
    }

    pub fn save_api_key(&self, key: &str) -> Result<()> {
        self.keyring.set_secret(KEYRING_ACCOUNT, key)
    }

    pub fn delete_api_key(&self) -> Result<()> {
        self.keyring.delete_secret(KEYRING_ACCOUNT)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn check_endpoint_scheme(base_url: &str) -> Result<()> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid refinement base_url: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::ConfigError(format!(
            "Unsupported refinement base_url scheme: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlankPolicy;
    use std::io::Write;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    #[test]
    fn test_defaults_extract() {
        let config = ConfigService::extract(defaults()).unwrap();
        assert_eq!(config.cleaning.refine_length_threshold, 10);
        assert_eq!(config.cleaning.row_budget, 5);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = defaults().merge(Toml::string(
            r#"
            [cleaning]
            refine_length_threshold = 20
            blank_policy = "null"

            [refinement]
            model = "facebook/bart-large"
            "#,
        ));

        let config = ConfigService::extract(figment).unwrap();
        assert_eq!(config.cleaning.refine_length_threshold, 20);
        assert_eq!(config.cleaning.blank_policy, BlankPolicy::Null);
        assert_eq!(config.cleaning.row_budget, 5);
        assert_eq!(config.refinement.model, "facebook/bart-large");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let figment = defaults().merge(Toml::string(
            r#"
            [refinement]
            timeout_secs = 0
            "#,
        ));
        assert!(matches!(
            ConfigService::extract(figment),
            Err(AppError::ConfigError(_))
        ));

        let figment = defaults().merge(Toml::string(
            r#"
            [refinement]
            base_url = "ftp://example.com/models"
            "#,
        ));
        assert!(matches!(
            ConfigService::extract(figment),
            Err(AppError::ConfigError(_))
        ));

        let figment = defaults().merge(Toml::string(
            r#"
            [cleaning]
            blank_sentinel = " N/A "
            "#,
        ));
        assert!(matches!(
            ConfigService::extract(figment),
            Err(AppError::ConfigError(message)) if message.contains("blank_sentinel")
        ));
    }

    #[test]
    fn test_config_file_is_merged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cleaning]\nrow_budget = 2").unwrap();

        let service = ConfigService::new().with_config_file(file.path());
        let config = ConfigService::extract(service.figment()).unwrap();
        assert_eq!(config.cleaning.row_budget, 2);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let service = ConfigService::new().with_config_file("/definitely/not/here.toml");
        assert!(matches!(service.load(), Err(AppError::ConfigError(_))));
    }
}
