use super::RefinementGateway;
use crate::domain::{
    RefinementEndpointConfig, RefinementFailure, RefinementOutcome, SkipReason,
};
use crate::infrastructure::response::clean_refined_text;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Hosted inference endpoint client (text-to-text models)
pub struct HuggingFaceClient {
    client: reqwest::Client,
    config: RefinementEndpointConfig,
}

impl HuggingFaceClient {
    pub fn new(config: RefinementEndpointConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }
}

/// First `generated_text` found, in array-wrapped or bare-object form
pub fn extract_generated_text(result: &Value) -> Option<&str> {
    let candidate = match result {
        Value::Array(items) => items.first().and_then(|first| first.get("generated_text")),
        Value::Object(_) => result.get("generated_text"),
        _ => None,
    };
    candidate.and_then(Value::as_str)
}

#[async_trait]
impl RefinementGateway for HuggingFaceClient {
    async fn refine(&self, text: &str) -> RefinementOutcome {
        if text.trim().is_empty() {
            return RefinementOutcome::Skipped(SkipReason::EmptyInput);
        }

        let url = self.config.endpoint_url();
        let body = json!({ "inputs": self.config.prompt_for(text) });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %url, error = %e, "Refinement request failed");
                return RefinementOutcome::Failed(RefinementFailure::transport(e.to_string()));
            }
        };

        let status = response.status();
        let payload = match response.text().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(endpoint = %url, error = %e, "Failed to read refinement response");
                return RefinementOutcome::Failed(RefinementFailure::transport(format!(
                    "Failed to read response body: {}",
                    e
                )));
            }
        };

        if !status.is_success() {
            warn!(
                endpoint = %url,
                status = status.as_u16(),
                body = %payload,
                "Refinement endpoint returned an error"
            );
            return RefinementOutcome::Failed(RefinementFailure::http(status.as_u16(), payload));
        }

        let result: Value = match serde_json::from_str(&payload) {
            Ok(result) => result,
            Err(e) => {
                warn!(endpoint = %url, error = %e, "Refinement response is not JSON");
                return RefinementOutcome::Failed(RefinementFailure::malformed(
                    Some(status.as_u16()),
                    format!("Failed to parse JSON: {}", e),
                ));
            }
        };

        match extract_generated_text(&result) {
            Some(generated) => {
                let cleaned = clean_refined_text(generated, &self.config.instruction_prefix);
                if cleaned.is_empty() {
                    RefinementOutcome::Failed(RefinementFailure::malformed(
                        Some(status.as_u16()),
                        "No result generated",
                    ))
                } else {
                    debug!(chars = cleaned.chars().count(), "Refinement succeeded");
                    RefinementOutcome::Refined(cleaned)
                }
            }
            // Unknown shape: hand back the body itself rather than dropping it
            None => RefinementOutcome::Refined(result.to_string()),
        }
    }
}
