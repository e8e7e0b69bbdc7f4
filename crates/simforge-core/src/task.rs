//! Task request, attempt records, and result types.

use crate::contract::OutputContract;
use crate::error::{TaskError, TaskErrorKind};
use crate::event::ProgressSink;
use crate::ids::TaskId;
use crate::provider::ProviderId;
use crate::TaskCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// An immutable unit of work submitted to the executor.
#[derive(Clone)]
pub struct TaskRequest {
    /// Unique task identifier.
    pub id: TaskId,

    /// Category, used to resolve the provider ladder.
    pub category: TaskCategory,

    /// Opaque instruction payload forwarded to the provider.
    pub prompt: String,

    /// Declared shape of the provider's output.
    pub contract: OutputContract,

    /// Provider to try first when present in the resolved ladder.
    pub preferred_provider: Option<ProviderId>,

    /// Callback receiving per-attempt events, for caller-side logging.
    pub progress_sink: Option<Arc<dyn ProgressSink>>,
}

impl TaskRequest {
    /// Create a new TaskRequest.
    pub fn new(
        category: TaskCategory,
        prompt: impl Into<String>,
        contract: OutputContract,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            category,
            prompt: prompt.into(),
            contract,
            preferred_provider: None,
            progress_sink: None,
        }
    }

    /// Builder method to prefer a specific provider.
    pub fn with_preferred_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }

    /// Builder method to attach a progress sink.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("prompt_len", &self.prompt.len())
            .field("contract", &self.contract.name)
            .field("preferred_provider", &self.preferred_provider)
            .field("has_progress_sink", &self.progress_sink.is_some())
            .finish()
    }
}

/// Outcome of a single provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// Response validated against the contract.
    Success,
    /// Response arrived but failed validation.
    SchemaInvalid,
    /// Transport-level failure.
    ProviderError,
    /// Per-attempt budget exceeded.
    Timeout,
}

/// Record of one provider attempt within an executor invocation.
///
/// Ephemeral: owned by a single invocation and discarded with the result;
/// only aggregate counts are ever logged to the blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Provider that was invoked.
    pub provider_id: ProviderId,

    /// When the attempt started.
    pub started_at: DateTime<Utc>,

    /// How long the attempt took, in milliseconds.
    pub duration_ms: u64,

    /// What happened.
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    /// Create a new AttemptRecord.
    pub fn new(
        provider_id: ProviderId,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            provider_id,
            started_at,
            duration_ms,
            outcome,
        }
    }
}

/// Final outcome of a task execution.
///
/// `output` is present iff `success`; `error` is present iff `!success`.
/// The constructors enforce both invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether any provider produced a contract-valid payload.
    pub success: bool,

    /// Validated payload, present on success.
    pub output: Option<Value>,

    /// Every attempt made, in order.
    pub attempts: Vec<AttemptRecord>,

    /// Failure detail, present on failure.
    pub error: Option<TaskError>,
}

impl TaskResult {
    /// Build a successful result.
    pub fn ok(output: Value, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            success: true,
            output: Some(output),
            attempts,
            error: None,
        }
    }

    /// Build a failed result.
    pub fn err(
        kind: TaskErrorKind,
        message: impl Into<String>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: false,
            output: None,
            attempts,
            error: Some(TaskError::new(kind, message)),
        }
    }

    /// Failure kind, when failed.
    pub fn error_kind(&self) -> Option<TaskErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Count attempts with the given outcome.
    pub fn count_outcome(&self, outcome: AttemptOutcome) -> usize {
        self.attempts.iter().filter(|a| a.outcome == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::OutputContract;

    #[test]
    fn test_result_invariants() {
        let ok = TaskResult::ok(serde_json::json!({"x": 1}), vec![]);
        assert!(ok.success && ok.output.is_some() && ok.error.is_none());

        let err = TaskResult::err(TaskErrorKind::Exhausted, "no luck", vec![]);
        assert!(!err.success && err.output.is_none());
        assert_eq!(err.error_kind(), Some(TaskErrorKind::Exhausted));
    }

    #[test]
    fn test_request_builder() {
        let request = TaskRequest::new(
            TaskCategory::Reflex,
            "translate this",
            OutputContract::new("translation"),
        )
        .with_preferred_provider("flash");

        assert_eq!(request.category, TaskCategory::Reflex);
        assert_eq!(
            request.preferred_provider.as_ref().map(|p| p.as_str()),
            Some("flash")
        );
    }
}
