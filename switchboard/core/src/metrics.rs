//! Metrics Aggregation
//!
//! Process-scoped rolling statistics for the orchestration layer: global
//! request/latency/cost counters plus lightweight per-backend tallies. All
//! counters start at zero at process start; nothing is persisted across
//! restarts.
//!
//! The global request counter moves once per *task*, not once per backend
//! attempt, so a task that fails over across two backends still counts as a
//! single request for rate purposes. Per-attempt outcomes land in the
//! per-backend tallies instead.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Fixed-point scale for the cost accumulator (micro-units per unit)
const COST_SCALE: f64 = 1_000_000.0;

// ============================================================================
// Counter
// ============================================================================

/// A simple atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by one
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n`
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Cost Estimation
// ============================================================================

/// Approximate the output units consumed by a response payload.
///
/// One unit per four bytes, rounded up. This is an estimation heuristic for
/// cost tracking, not a billing-grade figure; backends that report exact
/// units take precedence over it.
#[must_use]
pub fn estimate_units(content: &str) -> u64 {
    (content.len() as u64).div_ceil(4)
}

// ============================================================================
// Per-Backend Tallies
// ============================================================================

#[derive(Debug, Default)]
struct BackendCounters {
    attempts: Counter,
    successes: Counter,
    failures: Counter,
}

/// Point-in-time attempt tallies for one backend
#[derive(Clone, Debug, Serialize)]
pub struct BackendTally {
    /// Which backend these tallies belong to
    pub backend_id: String,
    /// Invocations attempted
    pub attempts: u64,
    /// Invocations that succeeded
    pub successes: u64,
    /// Invocations that failed
    pub failures: u64,
}

// ============================================================================
// Metrics Aggregator
// ============================================================================

/// Rolling statistics for the orchestration layer
pub struct MetricsAggregator {
    total_requests: Counter,
    successful_requests: Counter,
    failed_requests: Counter,
    total_latency_ms: Counter,
    /// Cost sum in fixed-point micro-units; see [`COST_SCALE`]
    estimated_cost_fp: AtomicU64,
    backends: DashMap<String, BackendCounters>,
}

impl MetricsAggregator {
    /// Create an aggregator with everything at zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_requests: Counter::new(),
            successful_requests: Counter::new(),
            failed_requests: Counter::new(),
            total_latency_ms: Counter::new(),
            estimated_cost_fp: AtomicU64::new(0),
            backends: DashMap::new(),
        }
    }

    /// Count one task entering execution
    ///
    /// Called exactly once per task, before any backend attempt.
    pub fn record_task_start(&self) {
        self.total_requests.inc();
    }

    /// Count a task that completed successfully
    pub fn record_success(&self, backend_id: &str, latency_ms: u64, estimated_cost: f64) {
        self.successful_requests.inc();
        self.total_latency_ms.add(latency_ms);
        self.estimated_cost_fp
            .fetch_add((estimated_cost * COST_SCALE) as u64, Ordering::Relaxed);

        let entry = self.backends.entry(backend_id.to_string()).or_default();
        entry.attempts.inc();
        entry.successes.inc();
    }

    /// Count one failed attempt against a backend
    ///
    /// Per-backend only; the global failed counter moves in
    /// [`record_exhaustion`](Self::record_exhaustion).
    pub fn record_attempt_failure(&self, backend_id: &str) {
        let entry = self.backends.entry(backend_id.to_string()).or_default();
        entry.attempts.inc();
        entry.failures.inc();
    }

    /// Count a task that exhausted every candidate
    ///
    /// Called once per failed task, however many backends were attempted.
    pub fn record_exhaustion(&self) {
        self.failed_requests.inc();
    }

    /// Point-in-time view of all statistics
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut backends: Vec<BackendTally> = self
            .backends
            .iter()
            .map(|e| BackendTally {
                backend_id: e.key().clone(),
                attempts: e.value().attempts.get(),
                successes: e.value().successes.get(),
                failures: e.value().failures.get(),
            })
            .collect();
        backends.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));

        MetricsSnapshot {
            captured_at: Utc::now(),
            total_requests: self.total_requests.get(),
            successful_requests: self.successful_requests.get(),
            failed_requests: self.failed_requests.get(),
            total_latency_ms: self.total_latency_ms.get(),
            estimated_total_cost: self.estimated_cost_fp.load(Ordering::Relaxed) as f64
                / COST_SCALE,
            backends,
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable view of the aggregated statistics at a point in time
///
/// Stores only the raw counters; rates and averages are derived on access.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
    /// Tasks that entered execution
    pub total_requests: u64,
    /// Tasks that completed successfully
    pub successful_requests: u64,
    /// Tasks that exhausted every candidate
    pub failed_requests: u64,
    /// Summed latency of successful tasks, in milliseconds
    pub total_latency_ms: u64,
    /// Summed estimated cost of successful tasks
    pub estimated_total_cost: f64,
    /// Per-backend attempt tallies, sorted by backend id
    pub backends: Vec<BackendTally>,
}

impl MetricsSnapshot {
    /// Fraction of tasks that succeeded, 0.0 when nothing has run
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Mean latency of successful tasks in milliseconds
    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        if self.successful_requests == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.successful_requests as f64
        }
    }

    /// Mean estimated cost per task
    #[must_use]
    pub fn avg_cost_per_request(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.estimated_total_cost / self.total_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let c = Counter::new();
        c.inc();
        c.add(4);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn test_estimate_units() {
        assert_eq!(estimate_units(""), 0);
        assert_eq!(estimate_units("abc"), 1);
        assert_eq!(estimate_units("abcd"), 1);
        assert_eq!(estimate_units("abcde"), 2);
    }

    #[test]
    fn test_task_counters() {
        let metrics = MetricsAggregator::new();

        metrics.record_task_start();
        metrics.record_success("alpha", 120, 0.005);

        metrics.record_task_start();
        metrics.record_attempt_failure("alpha");
        metrics.record_attempt_failure("beta");
        metrics.record_exhaustion();

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.successful_requests, 1);
        // One exhausted task, not one per attempted backend
        assert_eq!(snap.failed_requests, 1);
        assert_eq!(snap.total_latency_ms, 120);
        assert!((snap.estimated_total_cost - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_derived_rates() {
        let metrics = MetricsAggregator::new();

        // Nothing recorded: all derived values are zero, no division panics
        let empty = metrics.snapshot();
        assert!((empty.success_rate()).abs() < f64::EPSILON);
        assert!((empty.avg_latency_ms()).abs() < f64::EPSILON);
        assert!((empty.avg_cost_per_request()).abs() < f64::EPSILON);

        metrics.record_task_start();
        metrics.record_success("alpha", 100, 0.01);
        metrics.record_task_start();
        metrics.record_success("alpha", 300, 0.03);

        let snap = metrics.snapshot();
        assert!((snap.success_rate() - 1.0).abs() < 1e-9);
        assert!((snap.avg_latency_ms() - 200.0).abs() < 1e-9);
        assert!((snap.avg_cost_per_request() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_per_backend_tallies() {
        let metrics = MetricsAggregator::new();

        metrics.record_task_start();
        metrics.record_attempt_failure("alpha");
        metrics.record_success("beta", 80, 0.001);

        let snap = metrics.snapshot();
        assert_eq!(snap.backends.len(), 2);

        let alpha = &snap.backends[0];
        assert_eq!(alpha.backend_id, "alpha");
        assert_eq!(alpha.attempts, 1);
        assert_eq!(alpha.failures, 1);
        assert_eq!(alpha.successes, 0);

        let beta = &snap.backends[1];
        assert_eq!(beta.backend_id, "beta");
        assert_eq!(beta.attempts, 1);
        assert_eq!(beta.successes, 1);
    }
}
