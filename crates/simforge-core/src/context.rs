//! Blackboard context value types and the merge algebra.
//!
//! The context itself is plain data; the engine wraps it in a lock. Keeping
//! `apply` here makes the merge rules independently testable: sequences
//! append, scalars replace, `extra` shallow-merges.

use crate::category::TaskCategory;
use crate::ids::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Severity of a mission log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Routine progress.
    Info,
    /// A sub-task or run completed successfully.
    Success,
    /// Recoverable degradation (failed sub-task, truncated plan).
    Warn,
    /// Unexpected condition worth operator attention.
    Trap,
}

/// One entry in the append-only mission log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,

    /// Component that produced the entry.
    pub source: String,

    /// Human-readable message.
    pub message: String,

    /// Severity.
    pub level: LogLevel,
}

impl LogEntry {
    /// Create a new LogEntry stamped with the current time.
    pub fn new(source: impl Into<String>, message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            message: message.into(),
            level,
        }
    }
}

/// A world entity manifested from a validated task output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Unique entity identifier.
    pub id: EntityId,

    /// Display name.
    pub name: String,

    /// Category of the task that produced it.
    pub category: TaskCategory,

    /// The validated output payload.
    pub payload: Value,
}

impl EntityRef {
    /// Create a new EntityRef.
    pub fn new(name: impl Into<String>, category: TaskCategory, payload: Value) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            category,
            payload,
        }
    }
}

/// Documented keys of the `extra` map.
pub mod extra_keys {
    /// Findings accumulated by research-shaped tasks.
    pub const RESEARCH_FINDINGS: &str = "researchFindings";
    /// Telemetry reported by concurrent task batches.
    pub const SWARM_TELEMETRY: &str = "swarmTelemetry";
}

/// The process-wide shared context, as a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardContext {
    /// Append-only mission log.
    pub mission_logs: Vec<LogEntry>,

    /// Entities manifested during the current run. Append-only during a
    /// run, replaced wholesale only by `reset`.
    pub manifested_entities: Vec<EntityRef>,

    /// Run progress in [0, 1].
    pub streaming_progress: f64,

    /// Task-specific findings keyed by documented names (see
    /// [`extra_keys`]); open-ended by design.
    pub extra: HashMap<String, Value>,
}

impl Default for BlackboardContext {
    fn default() -> Self {
        Self {
            mission_logs: Vec::new(),
            manifested_entities: Vec::new(),
            streaming_progress: 0.0,
            extra: HashMap::new(),
        }
    }
}

impl BlackboardContext {
    /// Merge a patch into this context.
    ///
    /// Sequence fields append (existing order preserved, new items after
    /// old), `streaming_progress` replaces clamped to [0, 1], and `extra`
    /// shallow-merges: object values merge key-wise one level, anything
    /// else replaces the whole key.
    pub fn apply(&mut self, patch: ContextPatch) {
        self.mission_logs.extend(patch.mission_logs);
        self.manifested_entities.extend(patch.manifested_entities);

        if let Some(progress) = patch.streaming_progress {
            // NaN degrades to 0.0 rather than panicking.
            self.streaming_progress = progress.max(0.0).min(1.0);
        }

        for (key, value) in patch.extra {
            match (self.extra.get_mut(&key), value) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    for (k, v) in incoming {
                        existing.insert(k, v);
                    }
                }
                (_, value) => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

/// A partial update to the blackboard context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPatch {
    /// Log entries to append.
    pub mission_logs: Vec<LogEntry>,

    /// Entities to append.
    pub manifested_entities: Vec<EntityRef>,

    /// New progress value, when set.
    pub streaming_progress: Option<f64>,

    /// Findings to merge into `extra`.
    pub extra: HashMap<String, Value>,
}

impl ContextPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to append a log entry.
    pub fn with_log(mut self, entry: LogEntry) -> Self {
        self.mission_logs.push(entry);
        self
    }

    /// Builder method to append an entity.
    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.manifested_entities.push(entity);
        self
    }

    /// Builder method to set progress.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.streaming_progress = Some(progress);
        self
    }

    /// Builder method to merge a finding into `extra`.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.mission_logs.is_empty()
            && self.manifested_entities.is_empty()
            && self.streaming_progress.is_none()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logs_append_in_order() {
        let mut ctx = BlackboardContext::default();
        ctx.apply(ContextPatch::new().with_log(LogEntry::new("a", "first", LogLevel::Info)));
        ctx.apply(ContextPatch::new().with_log(LogEntry::new("b", "second", LogLevel::Warn)));

        assert_eq!(ctx.mission_logs.len(), 2);
        assert_eq!(ctx.mission_logs[0].message, "first");
        assert_eq!(ctx.mission_logs[1].message, "second");
    }

    #[test]
    fn test_progress_replaces_and_clamps() {
        let mut ctx = BlackboardContext::default();
        ctx.apply(ContextPatch::new().with_progress(0.4));
        assert_eq!(ctx.streaming_progress, 0.4);

        ctx.apply(ContextPatch::new().with_progress(1.7));
        assert_eq!(ctx.streaming_progress, 1.0);
    }

    #[test]
    fn test_extra_object_values_shallow_merge() {
        let mut ctx = BlackboardContext::default();
        ctx.apply(ContextPatch::new().with_extra(
            extra_keys::SWARM_TELEMETRY,
            json!({"dispatched": 3, "failed": 0}),
        ));
        ctx.apply(
            ContextPatch::new().with_extra(extra_keys::SWARM_TELEMETRY, json!({"failed": 1})),
        );

        let telemetry = &ctx.extra[extra_keys::SWARM_TELEMETRY];
        assert_eq!(telemetry["dispatched"], 3);
        assert_eq!(telemetry["failed"], 1);
    }

    #[test]
    fn test_extra_scalar_replaces() {
        let mut ctx = BlackboardContext::default();
        ctx.apply(ContextPatch::new().with_extra("phase", json!("decompose")));
        ctx.apply(ContextPatch::new().with_extra("phase", json!("execute")));
        assert_eq!(ctx.extra["phase"], "execute");
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut ctx = BlackboardContext::default();
        ctx.apply(ContextPatch::new().with_progress(0.5));
        let before = ctx.clone();

        assert!(ContextPatch::new().is_empty());
        ctx.apply(ContextPatch::new());
        assert_eq!(ctx, before);
    }
}
