//! The reqwest-backed provider adapter.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use simforge_core::ProviderId;
use simforge_engine::{ProviderAdapter, TransportError};

use crate::config::{EndpointConfig, GatewayConfig};
use crate::error::GatewayError;

/// HTTP+JSON adapter over a table of model endpoints.
///
/// POSTs `{"model", "prompt"}` to `{base_url}/v1/generate` and returns the
/// response payload. Endpoints that wrap their payload in an `output` field
/// are unwrapped; anything else is returned as-is. Timeout budgets are
/// enforced by the executor, not here.
pub struct HttpProviderGateway {
    endpoints: HashMap<String, EndpointConfig>,
    http: reqwest::Client,
}

impl HttpProviderGateway {
    /// Create a gateway with no endpoints.
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a gateway from a parsed config file.
    pub fn from_config(config: GatewayConfig) -> Self {
        Self {
            endpoints: config.endpoints,
            http: reqwest::Client::new(),
        }
    }

    /// Builder method to register an endpoint under a provider id.
    pub fn with_endpoint(mut self, provider: impl Into<String>, endpoint: EndpointConfig) -> Self {
        self.endpoints.insert(provider.into(), endpoint);
        self
    }

    /// Provider ids with a configured endpoint.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    async fn generate(&self, endpoint: &EndpointConfig, prompt: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/v1/generate", endpoint.base_url);
        debug!(url = %url, model = %endpoint.model, prompt_len = prompt.len(), "POST generate");

        let mut request = self.http.post(&url).json(&json!({
            "model": endpoint.model,
            "prompt": prompt,
        }));

        if let Some(var) = &endpoint.api_key_env {
            let key =
                std::env::var(var).map_err(|_| GatewayError::MissingApiKey(var.clone()))?;
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        // Endpoints may wrap the structured payload in an `output` field.
        Ok(match payload {
            Value::Object(mut object) if object.contains_key("output") => {
                object.remove("output").unwrap_or(Value::Null)
            }
            other => other,
        })
    }
}

impl Default for HttpProviderGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderGateway {
    async fn invoke(&self, provider: &ProviderId, prompt: &str) -> Result<Value, TransportError> {
        let endpoint = self
            .endpoints
            .get(provider.as_str())
            .ok_or_else(|| TransportError::UnknownProvider(provider.clone()))?;

        self.generate(endpoint, prompt).await.map_err(|e| match e {
            GatewayError::Decode(message) => TransportError::Malformed(message),
            other => TransportError::Transport(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_provider_fails_before_network() {
        let gateway = HttpProviderGateway::new();
        let err = gateway
            .invoke(&ProviderId::new("ghost"), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_reported() {
        let gateway = HttpProviderGateway::new().with_endpoint(
            "apex-pro",
            EndpointConfig::new("http://localhost:9", "apex-pro-1")
                .with_api_key_env("SIMFORGE_TEST_KEY_THAT_IS_NOT_SET"),
        );

        let err = gateway
            .invoke(&ProviderId::new("apex-pro"), "hello")
            .await
            .unwrap_err();

        match err {
            TransportError::Transport(message) => {
                assert!(message.contains("SIMFORGE_TEST_KEY_THAT_IS_NOT_SET"));
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_registered_providers_listed() {
        let gateway = HttpProviderGateway::new()
            .with_endpoint("flash", EndpointConfig::new("http://localhost:8080", "flash-mini"));
        let providers: Vec<&str> = gateway.providers().collect();
        assert_eq!(providers, vec!["flash"]);
    }
}
