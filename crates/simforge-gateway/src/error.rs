//! Gateway error types.

use thiserror::Error;

/// Errors that can occur while talking to an HTTP model endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No endpoint is configured for the requested provider id.
    #[error("No endpoint configured for provider '{0}'")]
    UnknownProvider(String),

    /// The endpoint requires an API key but the environment variable is
    /// unset.
    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    /// Request-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Endpoint returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The endpoint's body was not usable JSON.
    #[error("Failed to decode endpoint response: {0}")]
    Decode(String),
}
