//! Simforge Execution Core
//!
//! The resilient task-execution engine behind the simulation sandbox. Every
//! feature call site funnels through the same machinery:
//!
//! - [`ApexLoop`] runs a task through its category's provider ladder with
//!   per-attempt timeouts, retry, and failover.
//! - [`validate`](validate::validate) is the trust boundary between raw
//!   provider payloads and the rest of the process.
//! - [`Blackboard`] is the shared mutable context: mission logs, manifested
//!   entities, streaming progress.
//! - [`AdmissionController`] caps concurrently in-flight tasks.
//! - [`Orchestrator`] decomposes a goal into sub-tasks and drives them
//!   through the loop under admission control.

pub mod admission;
pub mod blackboard;
pub mod executor;
pub mod features;
pub mod orchestrator;
pub mod provider;
pub mod validate;

#[cfg(test)]
mod testing;

// Re-export main types
pub use admission::{AdmissionController, ScaleEvent, WorkerSlot, DEFAULT_MAX_WORKERS};
pub use blackboard::Blackboard;
pub use executor::{ApexLoop, BackoffPolicy};
pub use orchestrator::{
    AggregateResult, Orchestrator, OrchestratorConfig, RunMode, SubTask, SubTaskOutcome,
};
pub use provider::{ProviderAdapter, SharedProviderAdapter, TransportError};
pub use validate::{validate, ValidatedOutput, ValidationError};
