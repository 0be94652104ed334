//! Read-only adapter onto the externally-owned policy lifecycle controller.
//!
//! The controller compiles and persists `ActivityPolicy` objects in a
//! durable key-value store (spec §3, §9); this crate never writes to it.
//! `PolicyFeedConsumer` exposes the one operation the query engine needs —
//! "give me every policy document currently active" — over the
//! controller's HTTP changefeed endpoint, mirroring the teacher's
//! `PolicyEngineConsumer` adapter shape.

use super::{EcosystemConsumer, UpstreamConfig};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A policy document as served by the lifecycle controller, deliberately
/// untyped past `rules` — the query engine owns compiling match/summary
/// expressions out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPolicyDocument {
    pub name: String,
    pub api_group: String,
    pub kind: String,
    pub rules: Value,
}

/// Consumer adapter for the policy lifecycle controller's changefeed.
pub struct PolicyFeedConsumer {
    config: UpstreamConfig,
    client: reqwest::Client,
}

impl PolicyFeedConsumer {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build policy feed client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Fetch every currently-active policy document.
    pub async fn list_policies(&self) -> Result<Vec<RawPolicyDocument>> {
        let url = format!("{}/v1/policies", self.config.base_url);
        let mut request = self.client.get(&url);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("policy feed request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Unavailable(format!(
                "policy feed returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("failed to parse policy feed response: {e}")))
    }
}

#[async_trait]
impl EcosystemConsumer for PolicyFeedConsumer {
    fn service_name(&self) -> &'static str {
        "policy-lifecycle-controller"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_timeout() {
        let config = UpstreamConfig::default();
        assert_eq!(config.timeout_ms, 30_000);
    }
}
