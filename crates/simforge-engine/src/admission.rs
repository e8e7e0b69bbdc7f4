//! Admission control: a fixed pool of worker slots bounding concurrency.
//!
//! The controller is an explicit instance passed by reference, never a
//! process-wide global, so tests can instantiate isolated pools.

use simforge_core::TaskCategory;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Default pool size.
pub const DEFAULT_MAX_WORKERS: u32 = 8;

/// Notification emitted when the pool rejects work at saturation, for
/// observability and autoscaling hooks outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleEvent {
    /// The pool was full when a task in this category asked for a slot.
    ScaleUp {
        /// Category that triggered saturation.
        category: TaskCategory,
    },
}

/// A held capacity token. At most one per task.
///
/// Dropping the slot releases it, so release happens on every exit path of
/// the holding scope; double-release is unrepresentable.
pub struct WorkerSlot {
    active: Arc<AtomicU32>,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-capacity gate for in-flight tasks.
pub struct AdmissionController {
    max_workers: u32,
    active: Arc<AtomicU32>,
    scale_tx: broadcast::Sender<ScaleEvent>,
}

impl AdmissionController {
    /// Create a controller with the given pool size (minimum 1).
    pub fn new(max_workers: u32) -> Self {
        let (scale_tx, _) = broadcast::channel(32);
        Self {
            max_workers: max_workers.max(1),
            active: Arc::new(AtomicU32::new(0)),
            scale_tx,
        }
    }

    /// Non-blocking acquisition. `None` means the pool is saturated;
    /// callers own the queue/backoff policy. A rejection broadcasts
    /// [`ScaleEvent::ScaleUp`] with the triggering category.
    pub fn try_acquire(&self, category: TaskCategory) -> Option<WorkerSlot> {
        let acquired = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < self.max_workers).then_some(active + 1)
            });

        match acquired {
            Ok(_) => Some(WorkerSlot {
                active: Arc::clone(&self.active),
            }),
            Err(_) => {
                debug!(
                    category = %category,
                    max_workers = self.max_workers,
                    "Admission rejected at saturation"
                );
                let _ = self.scale_tx.send(ScaleEvent::ScaleUp { category });
                None
            }
        }
    }

    /// Release a slot. Equivalent to dropping it.
    pub fn release(&self, slot: WorkerSlot) {
        drop(slot);
    }

    /// Number of slots currently held. Never exceeds `max_workers`.
    pub fn active_count(&self) -> u32 {
        self.active.load(Ordering::SeqCst)
    }

    /// Configured pool size.
    pub fn max_workers(&self) -> u32 {
        self.max_workers
    }

    /// Subscribe to saturation notifications.
    pub fn scale_events(&self) -> broadcast::Receiver<ScaleEvent> {
        self.scale_tx.subscribe()
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_at_capacity() {
        let controller = AdmissionController::new(2);
        let mut events = controller.scale_events();

        let s1 = controller.try_acquire(TaskCategory::Physics).unwrap();
        let _s2 = controller.try_acquire(TaskCategory::Physics).unwrap();
        assert_eq!(controller.active_count(), 2);

        assert!(controller.try_acquire(TaskCategory::Reflex).is_none());
        assert_eq!(controller.active_count(), 2);
        assert_eq!(
            events.try_recv().unwrap(),
            ScaleEvent::ScaleUp {
                category: TaskCategory::Reflex
            }
        );

        controller.release(s1);
        assert_eq!(controller.active_count(), 1);
        assert!(controller.try_acquire(TaskCategory::Math).is_some());
    }

    #[test]
    fn test_slot_releases_on_drop() {
        let controller = AdmissionController::new(1);
        {
            let _slot = controller.try_acquire(TaskCategory::Ingest).unwrap();
            assert_eq!(controller.active_count(), 1);
        }
        assert_eq!(controller.active_count(), 0);
    }

    #[test]
    fn test_pool_floor_is_one() {
        let controller = AdmissionController::new(0);
        assert_eq!(controller.max_workers(), 1);
        assert!(controller.try_acquire(TaskCategory::Physics).is_some());
    }

    #[tokio::test]
    async fn test_nine_tasks_eight_slots() {
        // Scenario: 9 submitted tasks against a pool of 8. Exactly 8 run
        // concurrently; the 9th starts only after a release.
        let controller = Arc::new(AdmissionController::new(8));
        let peak = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..9)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let slot = loop {
                        match controller.try_acquire(TaskCategory::Physics) {
                            Some(slot) => break slot,
                            None => tokio::time::sleep(Duration::from_millis(2)).await,
                        }
                    };
                    peak.fetch_max(controller.active_count(), Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    controller.release(slot);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(controller.active_count(), 0);
        assert_eq!(peak.load(Ordering::SeqCst), 8);
    }
}
