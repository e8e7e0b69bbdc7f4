//! Provider adapter seam.
//!
//! The engine never talks to a model backend directly; it goes through this
//! trait. Each adapter hides its own wire protocol, so the executor treats
//! all backends uniformly.

use async_trait::async_trait;
use serde_json::Value;
use simforge_core::ProviderId;
use std::sync::Arc;
use thiserror::Error;

/// Transport-level failures raised by adapters.
///
/// Timeouts are not represented here: the per-attempt budget is enforced by
/// the executor, not the adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The adapter has no backend registered under this id.
    #[error("Unknown provider: {0}")]
    UnknownProvider(ProviderId),

    /// Network or protocol failure talking to the backend.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The backend answered, but not with a JSON payload.
    #[error("Malformed provider payload: {0}")]
    Malformed(String),
}

/// Shared handle to a provider adapter.
pub type SharedProviderAdapter = Arc<dyn ProviderAdapter>;

/// Uniform interface over model-provider backends.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Invoke a provider with an opaque prompt, returning its raw JSON
    /// payload. The caller bounds this with its own timeout.
    async fn invoke(&self, provider: &ProviderId, prompt: &str) -> Result<Value, TransportError>;
}
