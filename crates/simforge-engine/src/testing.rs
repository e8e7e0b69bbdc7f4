//! Scripted provider adapters and ladder helpers shared by engine tests.

use async_trait::async_trait;
use serde_json::Value;
use simforge_core::{CostClass, LadderRegistry, ProviderDescriptor, ProviderId, TaskCategory};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::executor::BackoffPolicy;
use crate::provider::{ProviderAdapter, TransportError};

/// One scripted reaction to an invocation.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Respond with this payload.
    Payload(Value),
    /// Fail with a transport error.
    Error(String),
    /// Stall long enough for the caller's timeout to fire.
    Hang(Duration),
}

/// Test adapter that replays scripted responses per provider id.
///
/// Queued responses are consumed first; when a queue runs dry the
/// provider's default (if any) repeats forever. Unknown providers fail
/// with a transport error.
#[derive(Default)]
pub struct ScriptedAdapter {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: HashMap<String, Scripted>,
    invocations: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(self, provider: &str, payload: Value) -> Self {
        self.push(provider, Scripted::Payload(payload))
    }

    pub fn with_error(self, provider: &str, message: &str) -> Self {
        self.push(provider, Scripted::Error(message.to_owned()))
    }

    pub fn with_default_payload(mut self, provider: &str, payload: Value) -> Self {
        self.defaults
            .insert(provider.to_owned(), Scripted::Payload(payload));
        self
    }

    pub fn with_default_error(mut self, provider: &str, message: &str) -> Self {
        self.defaults
            .insert(provider.to_owned(), Scripted::Error(message.to_owned()));
        self
    }

    pub fn with_hang(mut self, provider: &str, duration: Duration) -> Self {
        self.defaults
            .insert(provider.to_owned(), Scripted::Hang(duration));
        self
    }

    /// Total invocations across all providers.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn push(self, provider: &str, scripted: Scripted) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(provider.to_owned())
            .or_default()
            .push_back(scripted);
        self
    }

    fn next_for(&self, provider: &str) -> Option<Scripted> {
        if let Some(scripted) = self
            .queues
            .lock()
            .unwrap()
            .get_mut(provider)
            .and_then(VecDeque::pop_front)
        {
            return Some(scripted);
        }
        self.defaults.get(provider).cloned()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn invoke(&self, provider: &ProviderId, _prompt: &str) -> Result<Value, TransportError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        match self.next_for(provider.as_str()) {
            Some(Scripted::Payload(payload)) => Ok(payload),
            Some(Scripted::Error(message)) => Err(TransportError::Transport(message)),
            Some(Scripted::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(Value::Null)
            }
            None => Err(TransportError::UnknownProvider(provider.clone())),
        }
    }
}

/// Build a single-category registry from `(id, max_attempts, timeout)` rows.
pub fn ladder_of(category: TaskCategory, providers: &[(&str, u32, Duration)]) -> LadderRegistry {
    LadderRegistry::new().with_ladder(
        category,
        providers
            .iter()
            .map(|(id, attempts, timeout)| {
                ProviderDescriptor::new(*id, CostClass::Standard)
                    .with_max_attempts(*attempts)
                    .with_timeout(*timeout)
            })
            .collect(),
    )
}

/// Backoff short enough to keep tests fast.
pub fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy {
        base: Duration::from_millis(1),
        cap: Duration::from_millis(2),
    }
}
