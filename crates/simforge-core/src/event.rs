//! Per-attempt progress events delivered to a caller-supplied sink.

use crate::ids::TaskId;
use crate::provider::ProviderId;
use crate::task::AttemptOutcome;
use serde::{Deserialize, Serialize};

/// One attempt's outcome, forwarded to the request's progress sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// Task this attempt belongs to.
    pub task_id: TaskId,

    /// Provider that was invoked.
    pub provider_id: ProviderId,

    /// Position of the provider in the resolved ladder, 0-based.
    pub ladder_index: usize,

    /// Attempt number against this provider, 1-based.
    pub attempt: u32,

    /// What happened.
    pub outcome: AttemptOutcome,

    /// Attempt duration in milliseconds.
    pub duration_ms: u64,
}

/// Receiver of per-attempt events.
///
/// Implementations must be cheap and non-blocking; the executor calls them
/// synchronously between attempts. The executor itself never writes to the
/// blackboard, so this sink is the only side channel it has.
pub trait ProgressSink: Send + Sync {
    /// Called once per completed attempt, in attempt order.
    fn on_attempt(&self, event: &AttemptEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<AttemptEvent>>);

    impl ProgressSink for Recorder {
        fn on_attempt(&self, event: &AttemptEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_sink_receives_events() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let event = AttemptEvent {
            task_id: TaskId::generate(),
            provider_id: ProviderId::new("flash"),
            ladder_index: 0,
            attempt: 1,
            outcome: AttemptOutcome::Timeout,
            duration_ms: 125,
        };
        recorder.on_attempt(&event);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
