//! Batch Scheduler
//!
//! Runs N independent tasks with a bounded concurrency ceiling and
//! partial-failure tolerance: one result slot per input, in input order, and
//! a single item's exhaustion never aborts the batch.
//!
//! Items are partitioned into groups of the concurrency limit; each group is
//! driven concurrently and settles completely before the next group starts.
//! Grouping gives predictable completion-order semantics at a small
//! throughput cost versus a continuously refilling pool, which is the right
//! trade for a layer whose batches are short.

use std::sync::Arc;

use crate::engine::{ExecuteError, ExecutionEngine, Outcome};
use crate::registry::ConfigurationError;
use crate::task::TaskDescriptor;

/// One batch input: a prompt and its task descriptor
#[derive(Clone, Debug)]
pub struct BatchRequest {
    /// Prompt to execute
    pub prompt: String,

    /// Task shape for routing
    pub task: TaskDescriptor,
}

impl BatchRequest {
    /// Create a batch item
    #[must_use]
    pub fn new(prompt: impl Into<String>, task: TaskDescriptor) -> Self {
        Self {
            prompt: prompt.into(),
            task,
        }
    }
}

/// Placeholder for a batch item that exhausted its candidates
///
/// A value, not an error: batch callers never see exceptions for individual
/// items.
#[derive(Clone, Debug)]
pub struct FailureRecord {
    /// Why the item failed
    pub error: ExecuteError,

    /// Serving backend; always `"none"`, since a failed item was served by
    /// nobody
    pub backend_id: String,
}

/// One result slot of a batch run
#[derive(Clone, Debug)]
pub enum BatchOutcome {
    /// The item executed successfully
    Completed(Outcome),

    /// The item exhausted every candidate
    Failed(FailureRecord),
}

impl BatchOutcome {
    /// Whether this slot holds a successful outcome
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The outcome, if the item succeeded
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Failed(_) => None,
        }
    }

    /// The failure record, if the item failed
    #[must_use]
    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(record) => Some(record),
        }
    }
}

/// Drives batches of tasks through the execution engine
pub struct BatchScheduler {
    engine: Arc<ExecutionEngine>,
}

impl BatchScheduler {
    /// Create a scheduler over the given engine
    #[must_use]
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    /// Run every item and return one slot per input, in input order
    ///
    /// `concurrency_limit` is clamped to at least 1. Individual item failures
    /// land in their slots as [`FailureRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoBackends`] when the registry is empty
    /// before any item runs.
    pub async fn run_batch(
        &self,
        items: Vec<BatchRequest>,
        concurrency_limit: usize,
    ) -> Result<Vec<BatchOutcome>, ConfigurationError> {
        if self.engine.registry().is_empty() {
            return Err(ConfigurationError::NoBackends);
        }

        let limit = concurrency_limit.max(1);
        tracing::debug!(items = items.len(), limit, "Running batch");

        let mut results = Vec::with_capacity(items.len());
        for group in items.chunks(limit) {
            let settled = futures::future::join_all(
                group
                    .iter()
                    .map(|item| self.engine.execute(&item.prompt, &item.task)),
            )
            .await;

            for result in settled {
                results.push(match result {
                    Ok(outcome) => BatchOutcome::Completed(outcome),
                    Err(error) => BatchOutcome::Failed(FailureRecord {
                        error,
                        backend_id: "none".to_string(),
                    }),
                });
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::client::{BackendClient, BackendError, BackendResponse};
    use crate::config::{BackendSpec, OrchestratorConfig};
    use crate::metrics::MetricsAggregator;
    use crate::registry::BackendRegistry;
    use crate::task::{Complexity, TaskKind};
    use crate::test_utils::{CallLog, ScriptedClient};

    fn scheduler_with(client: Arc<dyn BackendClient>, spec: BackendSpec) -> BatchScheduler {
        // Zero cooldown keeps the backend in rotation across failing items
        let config = OrchestratorConfig {
            cooldown_ms: 0,
            ..Default::default()
        };
        let registry = Arc::new(BackendRegistry::with_cooldown(config.cooldown()));
        registry.register(spec.descriptor()).unwrap();
        let mut clients: HashMap<String, Arc<dyn BackendClient>> = HashMap::new();
        clients.insert(spec.id.clone(), client);
        let engine = Arc::new(ExecutionEngine::new(
            registry,
            Arc::new(MetricsAggregator::new()),
            clients,
            config,
        ));
        BatchScheduler::new(engine)
    }

    fn ok(content: &str) -> BackendResponse {
        BackendResponse {
            content: content.to_string(),
            latency_ms: 10,
            units: None,
        }
    }

    fn items(n: usize) -> Vec<BatchRequest> {
        (0..n)
            .map(|i| {
                BatchRequest::new(
                    format!("prompt {i}"),
                    TaskDescriptor::new(TaskKind::Summary, Complexity::Simple),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_preserves_length_and_order() {
        let log = CallLog::new();
        let client = ScriptedClient::new("alpha", &log)
            .ok(ok("r0"))
            .ok(ok("r1"))
            .err(BackendError::RequestFailed("down".into()))
            .ok(ok("r3"));
        let scheduler = scheduler_with(Arc::new(client), BackendSpec::new("alpha", 1, 0.001));

        let results = scheduler.run_batch(items(4), 2).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].outcome().unwrap().content, "r0");
        assert_eq!(results[1].outcome().unwrap().content, "r1");
        // Slot 2 failed but did not abort the batch
        let record = results[2].failure().unwrap();
        assert_eq!(record.backend_id, "none");
        assert_eq!(results[3].outcome().unwrap().content, "r3");
    }

    #[tokio::test]
    async fn test_empty_registry_rejected() {
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(BackendRegistry::new()),
            Arc::new(MetricsAggregator::new()),
            HashMap::new(),
            OrchestratorConfig::default(),
        ));
        let scheduler = BatchScheduler::new(engine);

        let result = scheduler.run_batch(items(2), 2).await;
        assert!(matches!(result, Err(ConfigurationError::NoBackends)));
    }

    #[tokio::test]
    async fn test_zero_limit_clamped() {
        let log = CallLog::new();
        let client = ScriptedClient::new("alpha", &log).ok(ok("fine"));
        let scheduler = scheduler_with(Arc::new(client), BackendSpec::new("alpha", 1, 0.001));

        let results = scheduler.run_batch(items(2), 0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(BatchOutcome::is_completed));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let log = CallLog::new();
        let client = ScriptedClient::new("alpha", &log).ok(ok("fine"));
        let scheduler = scheduler_with(Arc::new(client), BackendSpec::new("alpha", 1, 0.001));

        let results = scheduler.run_batch(Vec::new(), 3).await.unwrap();
        assert!(results.is_empty());
    }
}
