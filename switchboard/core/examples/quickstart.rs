//! Minimal composition demo: two stub backends, one flaky, routed through
//! the switchboard with failover and a small batch.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use switchboard_core::{
    BackendClient, BackendError, BackendResponse, BackendSpec, BatchRequest, Complexity,
    OrchestratorConfig, Switchboard, TaskDescriptor, TaskKind,
};

/// Stub backend that fails every other call, to show failover in action.
struct FlakyStub {
    name: String,
    calls: AtomicU64,
}

impl FlakyStub {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl BackendClient for FlakyStub {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        prompt: &str,
        _task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call % 2 == 1 {
            return Err(BackendError::RateLimited {
                retry_after_ms: Some(500),
            });
        }
        Ok(BackendResponse {
            content: format!("[{}] handled: {prompt}", self.name),
            latency_ms: 40,
            units: None,
        })
    }
}

/// Stub backend that always answers.
struct SteadyStub {
    name: String,
}

#[async_trait]
impl BackendClient for SteadyStub {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        prompt: &str,
        _task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError> {
        Ok(BackendResponse {
            content: format!("[{}] handled: {prompt}", self.name),
            latency_ms: 90,
            units: None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let backends: Vec<(BackendSpec, Arc<dyn BackendClient>)> = vec![
        (
            BackendSpec::new("alpha", 1, 0.00002),
            Arc::new(FlakyStub::new("alpha")),
        ),
        (
            BackendSpec::new("beta", 2, 0.00001),
            Arc::new(SteadyStub {
                name: "beta".to_string(),
            }),
        ),
    ];

    let config = OrchestratorConfig {
        cooldown_ms: 100,
        ..Default::default()
    };
    let switchboard = Switchboard::new(backends, config)?;

    let task = TaskDescriptor::new(TaskKind::Summary, Complexity::Simple);

    let outcome = switchboard
        .execute_task("condense the meeting notes", &task)
        .await?;
    println!("single task -> {} via {}", outcome.content, outcome.backend_id);

    let items: Vec<BatchRequest> = (1..=5)
        .map(|i| BatchRequest::new(format!("note {i}"), task))
        .collect();
    let results = switchboard.run_batch(items, Some(2)).await?;
    for (i, slot) in results.iter().enumerate() {
        match slot.outcome() {
            Some(outcome) => println!("batch[{i}] -> {}", outcome.backend_id),
            None => println!("batch[{i}] -> failed"),
        }
    }

    let metrics = switchboard.metrics();
    println!(
        "requests={} ok={} failed={} avg_latency={:.1}ms est_cost={:.6}",
        metrics.total_requests,
        metrics.successful_requests,
        metrics.failed_requests,
        metrics.avg_latency_ms(),
        metrics.estimated_total_cost,
    );

    Ok(())
}
