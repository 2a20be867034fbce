//! Configuration Types
//!
//! Everything the composing application supplies at construction time: the
//! list of backend specs (identity, priority, cost model, capability tags)
//! and the engine tuning knobs. A TOML loader is provided as a convenience
//! for binaries; the library itself never reads ambient configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! [orchestrator]
//! max_attempts = 3
//! cooldown_ms = 30000
//! batch_concurrency = 3
//!
//! [[backends]]
//! id = "alpha"
//! priority = 1
//! cost_per_unit = 0.00002
//! capabilities = ["citation-capable"]
//!
//! [[backends]]
//! id = "beta"
//! priority = 2
//! cost_per_unit = 0.00001
//! ```
//!
//! Loading is synchronous by design: it happens once, before the runtime
//! starts, in whatever composes the application.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::BackendDescriptor;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Structurally valid TOML with an invalid value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// ============================================================================
// Backend Specs
// ============================================================================

/// Static description of one backend, as supplied by the caller
///
/// The matching client object is paired with the spec at composition time;
/// credentials never pass through this layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Stable identifier, unique across the registry
    pub id: String,

    /// Routing preference; lower is preferred
    pub priority: u8,

    /// Cost per output unit, for cost estimation only
    #[serde(default)]
    pub cost_per_unit: f64,

    /// Capability tags consulted by routing overrides
    #[serde(default)]
    pub capabilities: HashSet<String>,
}

impl BackendSpec {
    /// Create a spec with no capabilities
    #[must_use]
    pub fn new(id: impl Into<String>, priority: u8, cost_per_unit: f64) -> Self {
        Self {
            id: id.into(),
            priority,
            cost_per_unit,
            capabilities: HashSet::new(),
        }
    }

    /// Add a capability tag
    #[must_use]
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.insert(tag.into());
        self
    }

    /// Build the registry descriptor for this spec
    #[must_use]
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::new(
            self.id.clone(),
            self.priority,
            self.cost_per_unit,
            self.capabilities.clone(),
        )
    }
}

// ============================================================================
// Engine Tuning
// ============================================================================

/// Tuning knobs for the execution engine and batch scheduler
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum backend attempts per task
    pub max_attempts: u32,

    /// How long a failed backend stays out of rotation, in milliseconds
    pub cooldown_ms: u64,

    /// Per-invocation timeout override in milliseconds
    ///
    /// When unset, each task kind's default budget applies.
    pub invoke_timeout_ms: Option<u64>,

    /// Default batch concurrency ceiling
    pub batch_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown_ms: 30_000, // 30s cooldown window
            invoke_timeout_ms: None,
            batch_concurrency: 3,
        }
    }
}

impl OrchestratorConfig {
    /// Cooldown window as a `Duration`
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Invocation timeout override as a `Duration`, if set
    #[must_use]
    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// TOML File Support
// ============================================================================

/// Orchestrator section of the TOML file; every field optional
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorToml {
    /// Maximum backend attempts per task
    pub max_attempts: Option<u32>,
    /// Cooldown window in milliseconds
    pub cooldown_ms: Option<u64>,
    /// Per-invocation timeout override in milliseconds
    pub invoke_timeout_ms: Option<u64>,
    /// Default batch concurrency ceiling
    pub batch_concurrency: Option<usize>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardToml {
    /// Engine tuning overrides
    pub orchestrator: OrchestratorToml,
    /// Configured backends
    pub backends: Vec<BackendSpec>,
}

impl SwitchboardToml {
    /// Resolve the file's overrides onto the defaults
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        OrchestratorConfig {
            max_attempts: self.orchestrator.max_attempts.unwrap_or(defaults.max_attempts),
            cooldown_ms: self.orchestrator.cooldown_ms.unwrap_or(defaults.cooldown_ms),
            invoke_timeout_ms: self
                .orchestrator
                .invoke_timeout_ms
                .or(defaults.invoke_timeout_ms),
            batch_concurrency: self
                .orchestrator
                .batch_concurrency
                .unwrap_or(defaults.batch_concurrency),
        }
    }

    /// Check the file for values that parse but cannot work
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero concurrency
    /// ceiling, zero attempts, or duplicate backend ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.batch_concurrency == Some(0) {
            return Err(ConfigError::ValidationError(
                "batch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.max_attempts == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.backends {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate backend id: {}",
                    spec.id
                )));
            }
        }
        Ok(())
    }
}

/// XDG-compliant default config file location
///
/// `$XDG_CONFIG_HOME/switchboard/switchboard.toml`, typically
/// `~/.config/switchboard/switchboard.toml`. `None` when the platform has no
/// config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("switchboard").join("switchboard.toml"))
}

/// Load and validate a configuration file
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or
/// validated.
pub fn load_config_from_path(path: &Path) -> Result<SwitchboardToml, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SwitchboardToml = toml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
