//! Consumer adapters for external collaborators.
//!
//! The policy lifecycle controller, the ingestion pipeline, and the
//! control-plane front-door are explicitly out of scope for this
//! repository (spec §1). This module gives the rest of the crate a thin,
//! read-only seam onto the one external collaborator it actually calls
//! out to at runtime: the durable policy store the lifecycle controller
//! owns. Ingestion and auth are consumed purely through message-bus
//! subjects or trusted request headers and need no adapter of their own.

pub mod policy_feed;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Common trait for adapters onto upstream services this crate does not own.
#[async_trait]
pub trait EcosystemConsumer: Send + Sync {
    /// Returns the name of the upstream service.
    fn service_name(&self) -> &'static str;

    /// Checks whether the upstream service is reachable.
    async fn health_check(&self) -> Result<bool>;
}

/// Configuration for connecting to an upstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub retry_count: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_ms: 30_000,
            retry_count: 3,
        }
    }
}
