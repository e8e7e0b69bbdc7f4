//! The Apex Loop: resilient task execution over a provider ladder.
//!
//! `execute` never returns an error and never panics; every failure mode is
//! encoded in the returned [`TaskResult`]. The loop walks the category's
//! ladder in priority order, bounding each attempt with the provider's
//! timeout, backing off between same-provider retries, and failing over on
//! transport errors and schema violations.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use simforge_core::{
    AttemptEvent, AttemptOutcome, AttemptRecord, LadderRegistry, ProviderDescriptor,
    TaskErrorKind, TaskRequest, TaskResult,
};

use crate::provider::SharedProviderAdapter;
use crate::validate::validate;

/// Exponential backoff between same-provider retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,

    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            cap: Duration::from_secs(4),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1-based), doubling from the base,
    /// capped, with ±25% jitter.
    fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let raw = self.base.saturating_mul(1u32 << exponent);
        let capped = raw.min(self.cap);
        capped.mul_f64(rand::thread_rng().gen_range(0.75..=1.25))
    }
}

/// Resilient task executor.
///
/// Holds the static ladder configuration and the injected provider adapter;
/// cheap to share behind an `Arc` across concurrent tasks.
pub struct ApexLoop {
    adapter: SharedProviderAdapter,
    ladders: LadderRegistry,
    backoff: BackoffPolicy,
}

impl ApexLoop {
    /// Create a new ApexLoop.
    pub fn new(adapter: SharedProviderAdapter, ladders: LadderRegistry) -> Self {
        Self {
            adapter,
            ladders,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Builder method to override the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// The configured ladder registry.
    pub fn ladders(&self) -> &LadderRegistry {
        &self.ladders
    }

    /// Execute a task without external cancellation.
    pub async fn execute(&self, request: &TaskRequest) -> TaskResult {
        self.execute_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Execute a task, honoring a run-level cancellation token.
    ///
    /// Cancellation is observed at retry boundaries only, never
    /// mid-provider-call.
    pub async fn execute_with_cancellation(
        &self,
        request: &TaskRequest,
        cancel: &CancellationToken,
    ) -> TaskResult {
        let ladder = self.resolve_ladder(request);
        if ladder.is_empty() {
            warn!(
                task_id = %request.id,
                category = %request.category,
                "No provider configured for category"
            );
            return TaskResult::err(
                TaskErrorKind::NoProviderConfigured,
                format!("no provider ladder for category {}", request.category),
                Vec::new(),
            );
        }

        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for (ladder_index, provider) in ladder.iter().enumerate() {
            let mut schema_failures = 0u32;

            for attempt in 1..=provider.max_attempts {
                if cancel.is_cancelled() {
                    return TaskResult::err(
                        TaskErrorKind::Cancelled,
                        "cancelled at retry boundary",
                        attempts,
                    );
                }

                if attempt > 1 {
                    let delay = self.backoff.delay(attempt - 1);
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return TaskResult::err(
                                TaskErrorKind::Cancelled,
                                "cancelled at retry boundary",
                                attempts,
                            );
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }

                let started_at = Utc::now();
                let start = Instant::now();
                let response = tokio::time::timeout(
                    provider.per_attempt_timeout,
                    self.adapter.invoke(&provider.id, &request.prompt),
                )
                .await;
                let duration_ms = start.elapsed().as_millis() as u64;

                let outcome = match response {
                    Err(_) => {
                        debug!(
                            task_id = %request.id,
                            provider = %provider.id,
                            attempt,
                            timeout_ms = provider.per_attempt_timeout.as_millis() as u64,
                            "Attempt timed out"
                        );
                        AttemptOutcome::Timeout
                    }
                    Ok(Err(transport)) => {
                        debug!(
                            task_id = %request.id,
                            provider = %provider.id,
                            attempt,
                            error = %transport,
                            "Provider transport error"
                        );
                        AttemptOutcome::ProviderError
                    }
                    Ok(Ok(payload)) => match validate(&payload, &request.contract) {
                        Ok(validated) => {
                            record_attempt(
                                request,
                                &mut attempts,
                                provider,
                                ladder_index,
                                attempt,
                                started_at,
                                duration_ms,
                                AttemptOutcome::Success,
                            );
                            info!(
                                task_id = %request.id,
                                provider = %provider.id,
                                attempts = attempts.len(),
                                duration_ms,
                                "Task succeeded"
                            );
                            return TaskResult::ok(validated.into_inner(), attempts);
                        }
                        Err(invalid) => {
                            debug!(
                                task_id = %request.id,
                                provider = %provider.id,
                                attempt,
                                error = %invalid,
                                "Schema validation failed"
                            );
                            AttemptOutcome::SchemaInvalid
                        }
                    },
                };

                record_attempt(
                    request,
                    &mut attempts,
                    provider,
                    ladder_index,
                    attempt,
                    started_at,
                    duration_ms,
                    outcome,
                );

                // Retrying identical input rarely fixes structural errors:
                // a second consecutive schema failure from one provider
                // advances the ladder immediately.
                if outcome == AttemptOutcome::SchemaInvalid {
                    schema_failures += 1;
                    if schema_failures >= 2 {
                        break;
                    }
                } else {
                    schema_failures = 0;
                }
            }
        }

        info!(
            task_id = %request.id,
            category = %request.category,
            attempts = attempts.len(),
            "Task exhausted all providers"
        );
        TaskResult::err(
            TaskErrorKind::Exhausted,
            format!(
                "{} attempts across {} providers failed",
                attempts.len(),
                ladder.len()
            ),
            attempts,
        )
    }

    /// Resolve the ladder for a request, moving the preferred provider to
    /// the front when it is present.
    fn resolve_ladder(&self, request: &TaskRequest) -> Vec<ProviderDescriptor> {
        let mut ladder = self.ladders.resolve(request.category).to_vec();
        if let Some(preferred) = &request.preferred_provider {
            if let Some(position) = ladder.iter().position(|p| &p.id == preferred) {
                let descriptor = ladder.remove(position);
                ladder.insert(0, descriptor);
            }
        }
        ladder
    }
}

#[allow(clippy::too_many_arguments)]
fn record_attempt(
    request: &TaskRequest,
    attempts: &mut Vec<AttemptRecord>,
    provider: &ProviderDescriptor,
    ladder_index: usize,
    attempt: u32,
    started_at: DateTime<Utc>,
    duration_ms: u64,
    outcome: AttemptOutcome,
) {
    attempts.push(AttemptRecord::new(
        provider.id.clone(),
        started_at,
        duration_ms,
        outcome,
    ));

    if let Some(sink) = &request.progress_sink {
        sink.on_attempt(&AttemptEvent {
            task_id: request.id.clone(),
            provider_id: provider.id.clone(),
            ladder_index,
            attempt,
            outcome,
            duration_ms,
        });
    }
}
