//! Endpoint configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One HTTP model endpoint behind a ladder provider id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the endpoint, without a trailing slash.
    pub base_url: String,

    /// Model name sent in the request body.
    pub model: String,

    /// Environment variable holding the bearer token, when required.
    pub api_key_env: Option<String>,
}

impl EndpointConfig {
    /// Create a new EndpointConfig.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key_env: None,
        }
    }

    /// Builder method to require a bearer token from the environment.
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }
}

/// Serializable endpoint table, loadable from a JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Endpoints keyed by ladder provider id.
    pub endpoints: HashMap<String, EndpointConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let endpoint = EndpointConfig::new("https://models.example.com/", "flash-1");
        assert_eq!(endpoint.base_url, "https://models.example.com");
    }

    #[test]
    fn test_config_parses_from_json() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{
                "endpoints": {
                    "apex-pro": {
                        "base_url": "https://models.example.com",
                        "model": "apex-pro-1",
                        "api_key_env": "APEX_API_KEY"
                    },
                    "flash": {
                        "base_url": "http://localhost:8080",
                        "model": "flash-mini",
                        "api_key_env": null
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(
            config.endpoints["apex-pro"].api_key_env.as_deref(),
            Some("APEX_API_KEY")
        );
        assert!(config.endpoints["flash"].api_key_env.is_none());
    }
}
