pub mod huggingface;

use std::sync::Arc;

use async_trait::async_trait;
use huggingface::HuggingFaceClient;
use tracing::warn;

use crate::domain::{RefinementEndpointConfig, RefinementOutcome, SkipReason};

/// One remote refinement attempt per call; implementations keep no state between calls
#[async_trait]
pub trait RefinementGateway {
    async fn refine(&self, text: &str) -> RefinementOutcome;
}

/// Gateway used when refinement is switched off
pub struct DisabledGateway;

#[async_trait]
impl RefinementGateway for DisabledGateway {
    async fn refine(&self, _text: &str) -> RefinementOutcome {
        RefinementOutcome::Skipped(SkipReason::RefinementDisabled)
    }
}

/// Pick the gateway for an endpoint configuration
pub fn build_gateway(config: &RefinementEndpointConfig) -> Arc<dyn RefinementGateway + Send + Sync> {
    if !config.enabled {
        return Arc::new(DisabledGateway);
    }

    if config.api_key.is_none() {
        warn!(
            endpoint = %config.endpoint_url(),
            "No API key configured, refinement requests will be sent unauthenticated"
        );
    }

    Arc::new(HuggingFaceClient::new(config.clone()))
}
