//! Switchboard Core - Multi-Backend Task Orchestration
//!
//! This crate routes abstract tasks (prompt + intent metadata) across a set
//! of interchangeable remote inference backends. No single backend is always
//! the fastest, cheapest, or best suited for a given task shape, and remote
//! backends fail intermittently (rate limits, timeouts, outages) without
//! being allowed to take the whole system down. Switchboard picks a backend
//! by task characteristics and live health, fails over to alternates on
//! error, and keeps rolling performance and cost statistics.
//!
//! # Architecture
//!
//! ```text
//! caller ──> BatchScheduler ──┐            (one slot per item, in order)
//!   │         (grouped,       │
//!   │          bounded)       │
//!   └──────────────────────> ExecutionEngine
//!                              │   1. fresh Registry snapshot
//!                              │   2. Router orders candidates
//!                              │   3. invoke first untried client
//!                              │   4. on failure: cool down, next candidate
//!                              ▼
//!                        BackendClient (per backend, opaque)
//!                              │
//!                              ▼
//!               Registry health + MetricsAggregator
//! ```
//!
//! # Key Types
//!
//! - [`Switchboard`]: the composed facade exposing the three entry points
//! - [`TaskDescriptor`]: immutable description of one unit of work
//! - [`BackendClient`]: the boundary trait a backend integration implements
//! - [`BackendRegistry`]: configured backends and their live health
//! - [`ExecutionEngine`]: the per-task failover loop
//! - [`BatchScheduler`]: bounded-concurrency batch execution
//!
//! # What Lives Elsewhere
//!
//! Prompt construction, persistence, vendor client libraries, and credential
//! handling all belong to the composing application. This crate consumes
//! clients as opaque capabilities and hands back outcomes.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod client;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod task;

#[cfg(test)]
pub mod test_utils;

// Re-exports for convenience
pub use batch::{BatchOutcome, BatchRequest, BatchScheduler, FailureRecord};
pub use client::{BackendClient, BackendError, BackendResponse, HttpBackendClient};
pub use config::{
    default_config_path, load_config_from_path, BackendSpec, ConfigError, OrchestratorConfig,
    SwitchboardToml,
};
pub use engine::{ExecuteError, ExecutionEngine, Outcome, OutcomeMetadata};
pub use metrics::{BackendTally, MetricsAggregator, MetricsSnapshot};
pub use orchestrator::Switchboard;
pub use registry::{BackendDescriptor, BackendRegistry, ConfigurationError, DEFAULT_COOLDOWN};
pub use router::{candidates, CAP_CITATIONS, CAP_COMPLEX_EXTRACTION};
pub use task::{Complexity, TaskDescriptor, TaskKind};
