//! Goal decomposition and sub-task dispatch under admission control.
//!
//! The Orchestrator is the only component that writes execution results to
//! the Blackboard: the Apex Loop stays side-effect-free so it can be reused
//! by feature call sites directly.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use simforge_core::{
    context::extra_keys, ContextPatch, EntityRef, LogEntry, LogLevel, RunId, TaskCategory,
    TaskErrorKind, TaskRequest, TaskResult,
};

use crate::admission::AdmissionController;
use crate::blackboard::Blackboard;
use crate::executor::ApexLoop;
use crate::features;

/// Tuning knobs for sub-task dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    /// Interval between slot-acquisition polls.
    pub poll_interval: Duration,

    /// Maximum total wait for a slot before a sub-task fails `SATURATED`.
    pub max_slot_wait: Duration,

    /// Cap on sub-tasks per goal; larger plans are truncated.
    pub max_subtasks: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            max_slot_wait: Duration::from_secs(10),
            max_subtasks: 8,
        }
    }
}

/// How sub-tasks of one run are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// All sub-tasks in flight at once, bounded by admission control.
    Parallel,
    /// One sub-task at a time, in plan order.
    Serial,
}

/// One unit of a decomposed goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    /// Category routing the sub-task to a ladder.
    pub category: TaskCategory,

    /// What this sub-task should accomplish.
    pub objective: String,
}

impl SubTask {
    /// Create a new SubTask.
    pub fn new(category: TaskCategory, objective: impl Into<String>) -> Self {
        Self {
            category,
            objective: objective.into(),
        }
    }
}

/// Outcome of one sub-task within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskOutcome {
    /// Position in the plan, 0-based.
    pub index: usize,

    /// Category the sub-task ran under.
    pub category: TaskCategory,

    /// The sub-task's objective.
    pub objective: String,

    /// Full execution result.
    pub result: TaskResult,
}

/// Aggregated result of one Orchestrator run.
///
/// Partial success is acceptable and reported: the run succeeds when at
/// least one sub-task succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Unique run identifier.
    pub run_id: RunId,

    /// The goal as submitted.
    pub goal: String,

    /// Per-sub-task outcomes, in plan order.
    pub outcomes: Vec<SubTaskOutcome>,

    /// Number of successful sub-tasks.
    pub succeeded: usize,

    /// Number of failed sub-tasks.
    pub failed: usize,
}

impl AggregateResult {
    /// Whether at least one sub-task succeeded.
    pub fn success(&self) -> bool {
        self.succeeded > 0
    }
}

/// Decomposes goals and drives sub-tasks through the Apex Loop.
pub struct Orchestrator {
    apex: Arc<ApexLoop>,
    admission: Arc<AdmissionController>,
    blackboard: Arc<Blackboard>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new Orchestrator.
    pub fn new(
        apex: Arc<ApexLoop>,
        admission: Arc<AdmissionController>,
        blackboard: Arc<Blackboard>,
    ) -> Self {
        Self {
            apex,
            admission,
            blackboard,
            config: OrchestratorConfig::default(),
        }
    }

    /// Builder method to override the dispatch configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a goal to completion without external cancellation.
    pub async fn run(&self, goal: &str, context: &str, mode: RunMode) -> AggregateResult {
        self.run_with_cancellation(goal, context, mode, CancellationToken::new())
            .await
    }

    /// Run a goal to completion.
    ///
    /// Cancellation stops further slot acquisitions and reaches in-flight
    /// Apex Loops at their next retry boundary; held slots release normally.
    pub async fn run_with_cancellation(
        &self,
        goal: &str,
        context: &str,
        mode: RunMode,
        cancel: CancellationToken,
    ) -> AggregateResult {
        let run_id = RunId::generate();
        info!(run_id = %run_id, mode = ?mode, "Run started");

        self.blackboard
            .update(
                ContextPatch::new()
                    .with_progress(0.0)
                    .with_log(LogEntry::new(
                        "orchestrator",
                        format!("run {run_id} started: {goal}"),
                        LogLevel::Info,
                    )),
            )
            .await;

        let subtasks = self.decompose(goal, context, &cancel).await;
        let total = subtasks.len();
        self.blackboard
            .log(
                "orchestrator",
                format!("plan ready: {total} sub-task(s)"),
                LogLevel::Info,
            )
            .await;

        let mut by_index: Vec<Option<SubTaskOutcome>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;

        match mode {
            RunMode::Parallel => {
                let mut set = JoinSet::new();
                for (index, sub) in subtasks.into_iter().enumerate() {
                    let apex = Arc::clone(&self.apex);
                    let admission = Arc::clone(&self.admission);
                    let config = self.config;
                    let context = context.to_owned();
                    let cancel = cancel.clone();
                    set.spawn(async move {
                        let result =
                            execute_subtask(&apex, &admission, &config, &context, &sub, &cancel)
                                .await;
                        (index, sub, result)
                    });
                }

                while let Some(joined) = set.join_next().await {
                    let (index, sub, result) = match joined {
                        Ok(completion) => completion,
                        Err(join_error) => {
                            completed += 1;
                            self.blackboard
                                .log(
                                    "orchestrator",
                                    format!("sub-task unit failed to join: {join_error}"),
                                    LogLevel::Trap,
                                )
                                .await;
                            continue;
                        }
                    };
                    completed += 1;
                    self.record_completion(index, &sub, &result, completed, total)
                        .await;
                    by_index[index] = Some(SubTaskOutcome {
                        index,
                        category: sub.category,
                        objective: sub.objective,
                        result,
                    });
                }
            }
            RunMode::Serial => {
                for (index, sub) in subtasks.into_iter().enumerate() {
                    let result = execute_subtask(
                        &self.apex,
                        &self.admission,
                        &self.config,
                        context,
                        &sub,
                        &cancel,
                    )
                    .await;
                    completed += 1;
                    self.record_completion(index, &sub, &result, completed, total)
                        .await;
                    by_index[index] = Some(SubTaskOutcome {
                        index,
                        category: sub.category,
                        objective: sub.objective,
                        result,
                    });
                }
            }
        }

        let outcomes: Vec<SubTaskOutcome> = by_index.into_iter().flatten().collect();
        let succeeded = outcomes.iter().filter(|o| o.result.success).count();
        let failed = outcomes.len() - succeeded;

        self.blackboard
            .update(
                ContextPatch::new()
                    .with_extra(
                        extra_keys::SWARM_TELEMETRY,
                        json!({
                            "dispatched": total,
                            "succeeded": succeeded,
                            "failed": failed,
                        }),
                    )
                    .with_log(LogEntry::new(
                        "orchestrator",
                        format!("run {run_id} finished: {succeeded}/{total} sub-task(s) succeeded"),
                        if succeeded > 0 {
                            LogLevel::Success
                        } else {
                            LogLevel::Warn
                        },
                    )),
            )
            .await;

        info!(run_id = %run_id, succeeded, failed, "Run finished");

        AggregateResult {
            run_id,
            goal: goal.to_owned(),
            outcomes,
            succeeded,
            failed,
        }
    }

    /// Decompose a goal into sub-tasks via one provider-driven plan call.
    ///
    /// Any decomposition failure degrades to a single PHYSICS task covering
    /// the whole goal.
    async fn decompose(
        &self,
        goal: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Vec<SubTask> {
        let request = TaskRequest::new(
            TaskCategory::Reflex,
            features::build_plan_prompt(goal, context),
            features::task_plan_contract(),
        );
        let result = self.apex.execute_with_cancellation(&request, cancel).await;

        let Some(items) = result
            .output
            .as_ref()
            .and_then(|o| o.get("tasks"))
            .and_then(Value::as_array)
        else {
            self.blackboard
                .log(
                    "orchestrator",
                    "decomposition failed; treating goal as a single task",
                    LogLevel::Warn,
                )
                .await;
            return vec![SubTask::new(TaskCategory::Physics, goal)];
        };

        let mut subtasks: Vec<SubTask> = items
            .iter()
            .filter_map(|item| {
                let objective = item.get("objective").and_then(Value::as_str)?;
                let category = item
                    .get("category")
                    .and_then(Value::as_str)
                    .and_then(TaskCategory::parse)
                    .unwrap_or(TaskCategory::Physics);
                Some(SubTask::new(category, objective))
            })
            .collect();

        if subtasks.is_empty() {
            self.blackboard
                .log(
                    "orchestrator",
                    "plan contained no usable tasks; treating goal as a single task",
                    LogLevel::Warn,
                )
                .await;
            return vec![SubTask::new(TaskCategory::Physics, goal)];
        }

        if subtasks.len() > self.config.max_subtasks {
            warn!(
                planned = subtasks.len(),
                cap = self.config.max_subtasks,
                "Plan truncated"
            );
            self.blackboard
                .log(
                    "orchestrator",
                    format!(
                        "plan truncated from {} to {} sub-tasks",
                        subtasks.len(),
                        self.config.max_subtasks
                    ),
                    LogLevel::Warn,
                )
                .await;
            subtasks.truncate(self.config.max_subtasks);
        }

        subtasks
    }

    /// Record one sub-task completion: log line, manifested entity on
    /// success, and a monotone progress step toward 1.0.
    async fn record_completion(
        &self,
        index: usize,
        sub: &SubTask,
        result: &TaskResult,
        completed: usize,
        total: usize,
    ) {
        let progress = completed as f64 / total.max(1) as f64;
        let mut patch = ContextPatch::new().with_progress(progress);

        if result.success {
            let output = result.output.clone().unwrap_or(Value::Null);
            let name = output
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| sub.objective.chars().take(48).collect());
            patch = patch
                .with_entity(EntityRef::new(name, sub.category, output))
                .with_log(LogEntry::new(
                    "orchestrator",
                    format!("sub-task {} complete: {}", index + 1, sub.objective),
                    LogLevel::Success,
                ));
        } else {
            let kind = result
                .error_kind()
                .map(|k| k.as_str())
                .unwrap_or("UNKNOWN");
            patch = patch.with_log(LogEntry::new(
                "orchestrator",
                format!("sub-task {} failed ({kind}): {}", index + 1, sub.objective),
                LogLevel::Warn,
            ));
        }

        self.blackboard.update(patch).await;
    }
}

/// The per-sub-task unit of work: acquire a slot (polling with backoff up
/// to the max wait), execute, and let the slot guard release on every exit
/// path.
async fn execute_subtask(
    apex: &ApexLoop,
    admission: &AdmissionController,
    config: &OrchestratorConfig,
    context: &str,
    sub: &SubTask,
    cancel: &CancellationToken,
) -> TaskResult {
    let deadline = Instant::now() + config.max_slot_wait;

    let _slot = loop {
        if cancel.is_cancelled() {
            return TaskResult::err(
                TaskErrorKind::Cancelled,
                "cancelled while waiting for a worker slot",
                Vec::new(),
            );
        }
        if let Some(slot) = admission.try_acquire(sub.category) {
            break slot;
        }
        if Instant::now() >= deadline {
            return TaskResult::err(
                TaskErrorKind::Saturated,
                format!(
                    "no worker slot within {}ms",
                    config.max_slot_wait.as_millis()
                ),
                Vec::new(),
            );
        }
        tokio::time::sleep(config.poll_interval).await;
    };

    let prompt = if context.is_empty() {
        sub.objective.clone()
    } else {
        format!("{}\n\nShared context:\n{}", sub.objective, context)
    };
    let request = TaskRequest::new(sub.category, prompt, features::contract_for(sub.category));

    apex.execute_with_cancellation(&request, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_backoff, ScriptedAdapter};
    use simforge_core::{CostClass, LadderRegistry, ProviderDescriptor};

    fn registry() -> LadderRegistry {
        let provider = |id: &str| {
            ProviderDescriptor::new(id, CostClass::Standard)
                .with_timeout(Duration::from_secs(1))
        };
        LadderRegistry::new()
            .with_ladder(TaskCategory::Reflex, vec![provider("planner")])
            .with_ladder(TaskCategory::Physics, vec![provider("worldsmith")])
    }

    fn plan(objectives: &[&str]) -> Value {
        json!({
            "tasks": objectives
                .iter()
                .map(|o| json!({"category": "PHYSICS", "objective": o}))
                .collect::<Vec<_>>()
        })
    }

    fn world(name: &str) -> Value {
        json!({"name": name, "description": "a place", "physics": {"gravity": 9.8}})
    }

    fn orchestrator(
        adapter: Arc<ScriptedAdapter>,
        max_workers: u32,
    ) -> (Orchestrator, Arc<Blackboard>) {
        let apex = Arc::new(ApexLoop::new(adapter, registry()).with_backoff(fast_backoff()));
        let admission = Arc::new(AdmissionController::new(max_workers));
        let blackboard = Arc::new(Blackboard::new());
        (
            Orchestrator::new(apex, admission, Arc::clone(&blackboard)).with_config(
                OrchestratorConfig {
                    poll_interval: Duration::from_millis(2),
                    max_slot_wait: Duration::from_millis(100),
                    max_subtasks: 8,
                },
            ),
            blackboard,
        )
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        // Scenario: 5 sub-tasks, #3 exhausts its providers. The aggregate
        // reports 4 successes and 1 failure; progress ends at 1.0.
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_payload("planner", plan(&["a", "b", "c", "d", "e"]))
                .with_payload("worldsmith", world("a"))
                .with_payload("worldsmith", world("b"))
                .with_error("worldsmith", "backend down")
                .with_payload("worldsmith", world("d"))
                .with_payload("worldsmith", world("e")),
        );
        let (orchestrator, blackboard) = orchestrator(adapter, 8);

        let aggregate = orchestrator.run("build a world", "", RunMode::Serial).await;

        assert!(aggregate.success());
        assert_eq!(aggregate.succeeded, 4);
        assert_eq!(aggregate.failed, 1);
        assert_eq!(aggregate.outcomes.len(), 5);
        assert!(!aggregate.outcomes[2].result.success);

        let context = blackboard.context().await;
        assert_eq!(context.streaming_progress, 1.0);
        assert_eq!(context.manifested_entities.len(), 4);
        assert!(context
            .mission_logs
            .iter()
            .any(|e| e.level == LogLevel::Warn && e.message.contains("sub-task 3")));
        assert_eq!(
            context.extra[extra_keys::SWARM_TELEMETRY]["succeeded"],
            json!(4)
        );
    }

    #[tokio::test]
    async fn test_decomposition_failure_falls_back_to_single_task() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_default_error("planner", "planner offline")
                .with_payload("worldsmith", world("fallback")),
        );
        let (orchestrator, blackboard) = orchestrator(adapter, 8);

        let aggregate = orchestrator
            .run("make a tidal lagoon", "", RunMode::Parallel)
            .await;

        assert_eq!(aggregate.outcomes.len(), 1);
        assert_eq!(aggregate.outcomes[0].category, TaskCategory::Physics);
        assert_eq!(aggregate.outcomes[0].objective, "make a tidal lagoon");
        assert!(aggregate.success());

        let context = blackboard.context().await;
        assert!(context
            .mission_logs
            .iter()
            .any(|e| e.message.contains("single task")));
    }

    #[tokio::test]
    async fn test_parallel_mode_completes_all_subtasks() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_payload("planner", plan(&["a", "b", "c", "d"]))
                .with_default_payload("worldsmith", world("w")),
        );
        let (orchestrator, blackboard) = orchestrator(adapter, 2);

        let aggregate = orchestrator.run("goal", "shared notes", RunMode::Parallel).await;

        assert_eq!(aggregate.succeeded, 4);
        assert_eq!(blackboard.context().await.streaming_progress, 1.0);
        // Outcomes are reported in plan order regardless of completion order.
        let indices: Vec<usize> = aggregate.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_saturated_when_no_slot_frees() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_payload("planner", plan(&["only"]))
                .with_default_payload("worldsmith", world("w")),
        );
        let (orchestrator, _blackboard) = orchestrator(adapter, 1);

        // Hold the single slot for the whole run.
        let admission = Arc::clone(&orchestrator.admission);
        let _held = admission.try_acquire(TaskCategory::Math).unwrap();

        let aggregate = orchestrator.run("goal", "", RunMode::Serial).await;

        assert!(!aggregate.success());
        assert_eq!(
            aggregate.outcomes[0].result.error_kind(),
            Some(TaskErrorKind::Saturated)
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_subtasks() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_payload("planner", plan(&["a", "b"]))
                .with_default_payload("worldsmith", world("w")),
        );
        let (orchestrator, _blackboard) = orchestrator(adapter, 8);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let aggregate = orchestrator
            .run_with_cancellation("goal", "", RunMode::Serial, cancel)
            .await;

        assert!(!aggregate.success());
        // Decomposition was cancelled too, so the fallback single task is
        // what gets (immediately) cancelled.
        assert_eq!(
            aggregate.outcomes[0].result.error_kind(),
            Some(TaskErrorKind::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_plan_truncated_to_cap() {
        let objectives: Vec<String> = (0..12).map(|i| format!("task {i}")).collect();
        let refs: Vec<&str> = objectives.iter().map(String::as_str).collect();
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_payload("planner", plan(&refs))
                .with_default_payload("worldsmith", world("w")),
        );
        let (orchestrator, blackboard) = orchestrator(adapter, 8);

        let aggregate = orchestrator.run("big goal", "", RunMode::Serial).await;

        assert_eq!(aggregate.outcomes.len(), 8);
        assert!(blackboard
            .context()
            .await
            .mission_logs
            .iter()
            .any(|e| e.message.contains("truncated")));
    }
}
