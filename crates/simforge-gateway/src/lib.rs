//! HTTP+JSON provider gateway for Simforge
//!
//! This crate implements the engine's [`ProviderAdapter`] seam over plain
//! HTTP+JSON model endpoints. Each ladder provider id maps to an
//! [`EndpointConfig`]; the gateway hides the wire protocol so the executor
//! treats every backend uniformly.
//!
//! # Example
//!
//! ```rust,no_run
//! use simforge_gateway::{EndpointConfig, HttpProviderGateway};
//!
//! let gateway = HttpProviderGateway::new()
//!     .with_endpoint(
//!         "apex-pro",
//!         EndpointConfig::new("https://models.example.com", "apex-pro-1")
//!             .with_api_key_env("APEX_API_KEY"),
//!     );
//! ```
//!
//! [`ProviderAdapter`]: simforge_engine::ProviderAdapter

mod config;
mod error;
mod http;

// Re-export main types
pub use config::{EndpointConfig, GatewayConfig};
pub use error::GatewayError;
pub use http::HttpProviderGateway;
