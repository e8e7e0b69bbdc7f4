//! Process-wide shared context.
//!
//! All mutation goes through [`Blackboard::update`], which applies the merge
//! algebra atomically under a single mutex: two concurrent tasks can never
//! interleave their merges. Reads are copy-on-read snapshots, so readers
//! never observe a partially-applied update.

use simforge_core::{BlackboardContext, ContextPatch, LogEntry, LogLevel};
use tokio::sync::{watch, Mutex};
use tracing::debug;

/// Shared mutable context for logs, entities, progress, and findings.
///
/// Passed by reference (`Arc<Blackboard>`) to whoever needs it; tests
/// instantiate isolated boards rather than sharing a process global.
pub struct Blackboard {
    inner: Mutex<BlackboardContext>,
    revision: watch::Sender<u64>,
}

impl Blackboard {
    /// Create an empty blackboard.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Mutex::new(BlackboardContext::default()),
            revision,
        }
    }

    /// Snapshot of the current context. Never a live reference.
    pub async fn context(&self) -> BlackboardContext {
        self.inner.lock().await.clone()
    }

    /// Atomically merge a patch into the live context.
    ///
    /// Updates are applied exactly once, in the order their calls reach the
    /// lock (first-come-first-applied).
    pub async fn update(&self, patch: ContextPatch) {
        if patch.is_empty() {
            return;
        }
        let mut guard = self.inner.lock().await;
        guard.apply(patch);
        drop(guard);
        self.revision.send_modify(|r| *r += 1);
    }

    /// Append a mission log entry.
    pub async fn log(&self, source: &str, message: impl Into<String>, level: LogLevel) {
        let message = message.into();
        debug!(source, level = ?level, "{message}");
        self.update(ContextPatch::new().with_log(LogEntry::new(source, message, level)))
            .await;
    }

    /// Clear logs, entities, progress, and findings.
    ///
    /// Used between independent scenario runs; idempotent.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        *guard = BlackboardContext::default();
        drop(guard);
        self.revision.send_modify(|r| *r += 1);
    }

    /// Revision counter bumped after every applied update.
    ///
    /// Subscribers may await changes (push) or keep polling
    /// [`context`](Self::context) snapshots.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}
