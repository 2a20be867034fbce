//! Execution Engine
//!
//! Drives exactly one task to completion or exhaustion. Each attempt asks the
//! router for a fresh ordering over a fresh registry snapshot, invokes the
//! first candidate not yet tried, and on failure marks that backend down
//! *before* the next routing decision, so a concurrently executing task
//! already sees the updated health and converges away from a failing backend
//! without any separate health-check process.
//!
//! Attempts are bounded by a small constant to keep a fully-down backend set
//! from turning into a retry storm. The client invocation is the only
//! suspension point; everything else in one task's execution is local state
//! on its own call stack and needs no synchronization.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::client::{BackendClient, BackendError};
use crate::config::OrchestratorConfig;
use crate::metrics::{estimate_units, MetricsAggregator};
use crate::registry::BackendRegistry;
use crate::router;
use crate::task::TaskDescriptor;

// ============================================================================
// Outcome
// ============================================================================

/// Result of one successfully executed task
#[derive(Clone, Debug)]
pub struct Outcome {
    /// The backend's response payload (opaque to this layer)
    pub content: String,

    /// Which backend served the request
    pub backend_id: String,

    /// Performance and cost accounting for the serving attempt
    pub metadata: OutcomeMetadata,
}

/// Accounting attached to an [`Outcome`]
#[derive(Clone, Copy, Debug)]
pub struct OutcomeMetadata {
    /// Latency of the serving call, in milliseconds
    pub latency_ms: u64,

    /// Output units consumed, exact when the backend reported them,
    /// otherwise estimated from the payload size
    pub estimated_units: u64,

    /// Estimated cost of the serving call; an approximation, not a
    /// billing-grade figure
    pub estimated_cost: f64,
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Errors surfaced to single-task callers
#[derive(Clone, Debug)]
pub enum ExecuteError {
    /// Every routable candidate was tried and failed
    AllBackendsFailed {
        /// The most recent backend error, for diagnostics; absent when no
        /// backend was routable at all
        last_error: Option<BackendError>,
    },
}

impl std::fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllBackendsFailed { last_error } => match last_error {
                Some(e) => write!(f, "All backends failed, last error: {e}"),
                None => write!(f, "All backends failed: no backend available"),
            },
        }
    }
}

impl std::error::Error for ExecuteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AllBackendsFailed { last_error } => last_error
                .as_ref()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}

// ============================================================================
// Execution Engine
// ============================================================================

/// Executes one task at a time against the registry's backends
///
/// Cheap to share: hold it in an `Arc` and call
/// [`execute`](Self::execute) from as many tasks as needed. Shared mutable
/// state is confined to the registry and the metrics aggregator.
pub struct ExecutionEngine {
    registry: Arc<BackendRegistry>,
    metrics: Arc<MetricsAggregator>,
    clients: HashMap<String, Arc<dyn BackendClient>>,
    config: OrchestratorConfig,
}

impl ExecutionEngine {
    /// Create an engine over the given registry, metrics, and clients
    ///
    /// `clients` must hold one entry per registered backend id; an id without
    /// a client is treated as a failed attempt at dispatch time.
    #[must_use]
    pub fn new(
        registry: Arc<BackendRegistry>,
        metrics: Arc<MetricsAggregator>,
        clients: HashMap<String, Arc<dyn BackendClient>>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            metrics,
            clients,
            config,
        }
    }

    /// Registry this engine routes over
    #[must_use]
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    /// Metrics aggregator this engine reports into
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsAggregator> {
        self.metrics.clone()
    }

    /// Execute one task to completion or exhaustion
    ///
    /// Counts as a single request in the global metrics however many backends
    /// end up attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::AllBackendsFailed`] once every routable
    /// candidate has been tried or the attempt bound is reached, carrying the
    /// most recent backend error.
    pub async fn execute(
        &self,
        prompt: &str,
        task: &TaskDescriptor,
    ) -> Result<Outcome, ExecuteError> {
        let request_id = Uuid::new_v4();
        self.metrics.record_task_start();

        let budget = task.effective_timeout(self.config.invoke_timeout());
        let mut attempted: HashSet<String> = HashSet::new();
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..self.config.max_attempts {
            let snapshot = self.registry.snapshot();
            let Some(id) = router::candidates(task, &snapshot)
                .into_iter()
                .find(|id| !attempted.contains(id))
            else {
                break;
            };
            attempted.insert(id.clone());

            tracing::debug!(%request_id, backend = %id, attempt, "Dispatching task");

            let Some(client) = self.clients.get(&id) else {
                // Registry/client desync; treat like any backend failure so
                // the task can still fail over.
                self.registry.mark_failure(&id);
                self.metrics.record_attempt_failure(&id);
                last_error = Some(BackendError::Internal(format!("no client for backend {id}")));
                continue;
            };

            match tokio::time::timeout(budget, client.invoke(prompt, task)).await {
                Ok(Ok(response)) => {
                    self.registry.mark_success(&id, response.latency_ms);

                    let units = response
                        .units
                        .map_or_else(|| estimate_units(&response.content), u64::from);
                    let cost_per_unit = snapshot
                        .iter()
                        .find(|d| d.id == id)
                        .map_or(0.0, |d| d.cost_per_unit);
                    let estimated_cost = units as f64 * cost_per_unit;

                    self.metrics
                        .record_success(&id, response.latency_ms, estimated_cost);
                    tracing::info!(
                        %request_id,
                        backend = %id,
                        latency_ms = response.latency_ms,
                        "Task served"
                    );

                    return Ok(Outcome {
                        content: response.content,
                        backend_id: id,
                        metadata: OutcomeMetadata {
                            latency_ms: response.latency_ms,
                            estimated_units: units,
                            estimated_cost,
                        },
                    });
                }
                Ok(Err(err)) => {
                    self.registry.mark_failure(&id);
                    self.metrics.record_attempt_failure(&id);
                    tracing::warn!(%request_id, backend = %id, error = %err, "Backend attempt failed");
                    last_error = Some(err);
                }
                Err(_elapsed) => {
                    self.registry.mark_failure(&id);
                    self.metrics.record_attempt_failure(&id);
                    tracing::warn!(
                        %request_id,
                        backend = %id,
                        budget_ms = budget.as_millis() as u64,
                        "Backend attempt timed out"
                    );
                    last_error = Some(BackendError::Timeout);
                }
            }
        }

        self.metrics.record_exhaustion();
        Err(ExecuteError::AllBackendsFailed { last_error })
    }
}
