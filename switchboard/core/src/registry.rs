//! Backend Registry
//!
//! Owns the set of configured backend descriptors and their live health.
//! Built once at startup from available credentials; mutated by the execution
//! engine as invocations succeed or fail.
//!
//! # Cooldown Model
//!
//! A failed backend is taken out of rotation (`available = false`) and comes
//! back automatically once its cooldown window has elapsed. Expiry is
//! evaluated lazily inside [`BackendRegistry::snapshot`] rather than by a
//! background timer, so behavior is deterministic under a short cooldown in
//! tests and nothing leaks across restarts.
//!
//! # Thread Safety
//!
//! Descriptors live in a [`DashMap`]; each update locks only the entry it
//! touches. Two tasks racing to update different backends never contend, and
//! two racing on the same backend interleave whole updates (the statistics
//! are advisory, used for future routing preference).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

/// How long a failed backend stays out of rotation
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

// ============================================================================
// Backend Descriptor
// ============================================================================

/// One remote backend's identity, cost model, and live health
#[derive(Clone, Debug)]
pub struct BackendDescriptor {
    /// Stable identifier, unique within the registry
    pub id: String,

    /// Routing preference; lower is preferred
    pub priority: u8,

    /// Cost per output unit, used only for cost estimation
    pub cost_per_unit: f64,

    /// Static capability tags consulted by the router's overrides
    pub capabilities: HashSet<String>,

    /// Whether the backend is currently in rotation
    pub available: bool,

    /// When the backend last failed; set whenever `available` goes false
    pub last_failure_at: Option<Instant>,

    /// Rolling success estimate in [0, 1]
    pub success_rate: f64,

    /// Rolling average latency of successful calls, in milliseconds
    pub avg_latency_ms: f64,

    /// Invocations attempted against this backend
    pub attempts: u64,

    /// Invocations that succeeded
    pub successes: u64,
}

impl BackendDescriptor {
    /// Create a fresh descriptor, in rotation and with an optimistic record
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        priority: u8,
        cost_per_unit: f64,
        capabilities: HashSet<String>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            cost_per_unit,
            capabilities,
            available: true,
            last_failure_at: None,
            success_rate: 1.0,
            avg_latency_ms: 0.0,
            attempts: 0,
            successes: 0,
        }
    }

    /// Whether this backend carries the given capability tag
    #[must_use]
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.contains(tag)
    }

    /// Fold a successful invocation into the rolling record
    fn record_success(&mut self, latency_ms: u64) {
        self.attempts += 1;
        self.successes += 1;

        let prior = (self.successes - 1) as f64;
        self.avg_latency_ms = (self.avg_latency_ms * prior + latency_ms as f64) / self.successes as f64;

        let n = self.attempts as f64;
        self.success_rate = (self.success_rate * (n - 1.0) + 1.0) / n;

        self.available = true;
    }

    /// Fold a failed invocation into the rolling record
    fn record_failure(&mut self, now: Instant) {
        self.attempts += 1;

        let n = self.attempts as f64;
        self.success_rate = (self.success_rate * (n - 1.0)) / n;

        self.available = false;
        self.last_failure_at = Some(now);
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Fatal registry construction errors
///
/// These surface at startup and are never recovered automatically.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A backend id was registered twice
    #[error("backend id already registered: {0}")]
    DuplicateBackend(String),

    /// The registry ended up with no backends at all
    #[error("no backends configured")]
    NoBackends,
}

// ============================================================================
// Backend Registry
// ============================================================================

/// The set of configured backends and their health
pub struct BackendRegistry {
    descriptors: DashMap<String, BackendDescriptor>,
    cooldown: Duration,
}

impl BackendRegistry {
    /// Create an empty registry with the default cooldown window
    #[must_use]
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }

    /// Create an empty registry with a custom cooldown window
    #[must_use]
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            descriptors: DashMap::new(),
            cooldown,
        }
    }

    /// Add a backend to the registry
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateBackend`] if the id is already
    /// present.
    pub fn register(&self, descriptor: BackendDescriptor) -> Result<(), ConfigurationError> {
        let id = descriptor.id.clone();
        match self.descriptors.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ConfigurationError::DuplicateBackend(id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(descriptor);
                tracing::info!(backend = %id, "Registered backend");
                Ok(())
            }
        }
    }

    /// Number of registered backends
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry holds no backends
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Read-only copy of all descriptors, sorted by id
    ///
    /// Reactivates any backend whose cooldown has elapsed before copying, so
    /// the router always sees current availability. Sorting gives the router
    /// a deterministic tie order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendDescriptor> {
        self.reactivate_if_cooled_down();

        let mut out: Vec<BackendDescriptor> =
            self.descriptors.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Record a failed invocation: cool the backend down and decay its record
    pub fn mark_failure(&self, id: &str) {
        if let Some(mut entry) = self.descriptors.get_mut(id) {
            entry.record_failure(Instant::now());
            tracing::warn!(
                backend = %id,
                success_rate = entry.success_rate,
                "Backend failed, entering cooldown"
            );
        }
    }

    /// Record a successful invocation and return the backend to rotation
    pub fn mark_success(&self, id: &str, latency_ms: u64) {
        if let Some(mut entry) = self.descriptors.get_mut(id) {
            entry.record_success(latency_ms);
        }
    }

    /// Flip expired cooldowns back to available
    fn reactivate_if_cooled_down(&self) {
        let now = Instant::now();
        for mut entry in self.descriptors.iter_mut() {
            if entry.available {
                continue;
            }
            let expired = entry
                .last_failure_at
                .is_some_and(|at| now.duration_since(at) >= self.cooldown);
            if expired {
                entry.available = true;
                tracing::info!(backend = %entry.id, "Cooldown elapsed, backend back in rotation");
            }
        }
    }

    /// Fetch a copy of one descriptor
    #[must_use]
    pub fn get(&self, id: &str) -> Option<BackendDescriptor> {
        self.descriptors.get(id).map(|e| e.value().clone())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
