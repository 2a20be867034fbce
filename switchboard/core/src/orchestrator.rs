//! Switchboard Facade
//!
//! Wires the registry, metrics aggregator, execution engine, and batch
//! scheduler into one explicitly constructed object, owned by whatever
//! composes the application. There is no ambient global: build one, share it
//! (it is cheap to clone behind an `Arc`), drop it when done.
//!
//! ```ignore
//! let backends = vec![
//!     (BackendSpec::new("alpha", 1, 0.00002), alpha_client),
//!     (BackendSpec::new("beta", 2, 0.00001), beta_client),
//! ];
//! let switchboard = Switchboard::new(backends, OrchestratorConfig::default())?;
//!
//! let outcome = switchboard.execute_task("...", &task).await?;
//! let snapshot = switchboard.metrics();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::batch::{BatchOutcome, BatchRequest, BatchScheduler};
use crate::client::BackendClient;
use crate::config::{BackendSpec, OrchestratorConfig};
use crate::engine::{ExecuteError, ExecutionEngine, Outcome};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::registry::{BackendRegistry, ConfigurationError};
use crate::task::TaskDescriptor;

/// The composed orchestration layer
///
/// Exposes the three entry points callers depend on: single-task execution,
/// batch execution, and the metrics snapshot.
pub struct Switchboard {
    registry: Arc<BackendRegistry>,
    metrics: Arc<MetricsAggregator>,
    engine: Arc<ExecutionEngine>,
    scheduler: BatchScheduler,
    config: OrchestratorConfig,
}

impl Switchboard {
    /// Compose the layer from backend specs paired with their clients
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoBackends`] for an empty backend list
    /// and [`ConfigurationError::DuplicateBackend`] for a repeated id. Both
    /// are fatal startup conditions, never per-request errors.
    pub fn new(
        backends: Vec<(BackendSpec, Arc<dyn BackendClient>)>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigurationError> {
        if backends.is_empty() {
            return Err(ConfigurationError::NoBackends);
        }

        let registry = Arc::new(BackendRegistry::with_cooldown(config.cooldown()));
        let metrics = Arc::new(MetricsAggregator::new());

        let mut clients: HashMap<String, Arc<dyn BackendClient>> = HashMap::new();
        for (spec, client) in backends {
            registry.register(spec.descriptor())?;
            clients.insert(spec.id.clone(), client);
        }

        let engine = Arc::new(ExecutionEngine::new(
            registry.clone(),
            metrics.clone(),
            clients,
            config.clone(),
        ));
        let scheduler = BatchScheduler::new(engine.clone());

        tracing::info!(backends = registry.len(), "Switchboard composed");

        Ok(Self {
            registry,
            metrics,
            engine,
            scheduler,
            config,
        })
    }

    /// Execute one task to completion or exhaustion
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::AllBackendsFailed`] when every routable
    /// candidate has been tried.
    pub async fn execute_task(
        &self,
        prompt: &str,
        task: &TaskDescriptor,
    ) -> Result<Outcome, ExecuteError> {
        self.engine.execute(prompt, task).await
    }

    /// Run a batch of tasks with a concurrency ceiling
    ///
    /// `concurrency_limit` falls back to the configured default when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoBackends`] when the registry is empty;
    /// individual item failures land in their result slots instead.
    pub async fn run_batch(
        &self,
        items: Vec<BatchRequest>,
        concurrency_limit: Option<usize>,
    ) -> Result<Vec<BatchOutcome>, ConfigurationError> {
        let limit = concurrency_limit.unwrap_or(self.config.batch_concurrency);
        self.scheduler.run_batch(items, limit).await
    }

    /// Point-in-time view of the aggregated metrics
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The backend registry, for observability
    #[must_use]
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }
}
