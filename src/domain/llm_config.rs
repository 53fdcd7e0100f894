use serde::{Deserialize, Serialize};
use validator::Validate;

/// Connection settings for the text-refinement endpoint
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct RefinementEndpointConfig {
    /// Turn remote refinement off without touching the row budget
    pub enabled: bool,
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    /// Task prefix prepended to every input, e.g. "clean: "
    pub instruction_prefix: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl Default for RefinementEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            model: "google-t5/t5-base".to_string(),
            instruction_prefix: "clean: ".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl RefinementEndpointConfig {
    /// Full request URL for the configured model
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.model.trim().trim_start_matches('/')
        )
    }

    pub fn prompt_for(&self, text: &str) -> String {
        format!("{}{}", self.instruction_prefix, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_model() {
        let config = RefinementEndpointConfig {
            base_url: "http://localhost:8080/models/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:8080/models/google-t5/t5-base"
        );
    }

    #[test]
    fn test_prompt_prefix() {
        let config = RefinementEndpointConfig::default();
        assert_eq!(config.prompt_for("teh cat"), "clean: teh cat");
    }

    #[test]
    fn test_default_is_valid() {
        assert!(RefinementEndpointConfig::default().validate().is_ok());
    }
}
