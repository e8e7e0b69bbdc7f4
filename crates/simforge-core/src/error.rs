//! Task failure taxonomy.
//!
//! Failures are data: the executor and admission layers never raise across
//! the API boundary, they return a `TaskError` inside the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskErrorKind {
    /// The request's category maps to no ladder entry. Configuration error,
    /// fatal to that request only.
    NoProviderConfigured,
    /// A provider attempt exceeded its per-attempt budget.
    Timeout,
    /// Transport-level provider failure.
    ProviderError,
    /// Provider responded but the payload failed contract validation.
    SchemaInvalid,
    /// Every provider and attempt was exhausted without success.
    Exhausted,
    /// The admission wait exceeded the maximum; no provider was invoked.
    Saturated,
    /// The run-level cancellation token fired at a retry boundary.
    Cancelled,
}

impl TaskErrorKind {
    /// Wire/display name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProviderConfigured => "NO_PROVIDER_CONFIGURED",
            Self::Timeout => "TIMEOUT",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::Exhausted => "EXHAUSTED",
            Self::Saturated => "SATURATED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ProviderError | Self::Exhausted | Self::Saturated
        )
    }
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task failure, surfaced to callers inside `TaskResult`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TaskError {
    /// Failure kind.
    pub kind: TaskErrorKind,

    /// Human-readable detail.
    pub message: String,
}

impl TaskError {
    /// Create a new TaskError.
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
