//! Task Descriptors
//!
//! A task describes *what kind* of work is needed, independent of which
//! backend ends up serving it. Descriptors are immutable: callers build one,
//! the router and execution engine consume it, and nothing in this layer
//! persists it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification of task intents for routing decisions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Open-ended analysis of provided material
    Analysis,

    /// Condensing material into a shorter form
    Summary,

    /// Pulling structured facts out of unstructured text
    Extraction,

    /// Free-form content generation
    Generation,

    /// Assigning material to one of a known set of labels
    Classification,
}

impl TaskKind {
    /// Default per-invocation timeout budget for this kind of task.
    ///
    /// Used when the engine configuration does not override the budget.
    /// Classification is expected to be quick; generation and analysis get
    /// the longest leash.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Analysis => Duration::from_secs(60),
            Self::Summary => Duration::from_secs(30),
            Self::Extraction => Duration::from_secs(45),
            Self::Generation => Duration::from_secs(60),
            Self::Classification => Duration::from_secs(15),
        }
    }
}

/// How demanding the task is expected to be
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Single-step, small input
    Simple,

    /// Multi-step or medium input
    Moderate,

    /// Long input or multi-document reasoning
    Complex,
}

/// Immutable description of one unit of work
///
/// Created by the caller, consumed by the router and the execution engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// What kind of work this is
    pub kind: TaskKind,

    /// Expected difficulty
    pub complexity: Complexity,

    /// Optional cap on response size, in output units
    pub max_output_units: Option<u32>,

    /// Whether the response must carry source citations
    pub requires_citations: bool,
}

impl TaskDescriptor {
    /// Create a descriptor with no output cap and no citation requirement
    #[must_use]
    pub fn new(kind: TaskKind, complexity: Complexity) -> Self {
        Self {
            kind,
            complexity,
            max_output_units: None,
            requires_citations: false,
        }
    }

    /// Cap the response size
    #[must_use]
    pub fn with_max_output_units(mut self, units: u32) -> Self {
        self.max_output_units = Some(units);
        self
    }

    /// Require source citations in the response
    #[must_use]
    pub fn with_citations(mut self) -> Self {
        self.requires_citations = true;
        self
    }

    /// Effective per-invocation timeout for this task
    #[must_use]
    pub fn effective_timeout(&self, override_budget: Option<Duration>) -> Duration {
        override_budget.unwrap_or_else(|| self.kind.default_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let task = TaskDescriptor::new(TaskKind::Extraction, Complexity::Complex)
            .with_max_output_units(500)
            .with_citations();

        assert_eq!(task.kind, TaskKind::Extraction);
        assert_eq!(task.complexity, Complexity::Complex);
        assert_eq!(task.max_output_units, Some(500));
        assert!(task.requires_citations);
    }

    #[test]
    fn test_defaults() {
        let task = TaskDescriptor::new(TaskKind::Summary, Complexity::Simple);
        assert_eq!(task.max_output_units, None);
        assert!(!task.requires_citations);
    }

    #[test]
    fn test_kind_timeouts() {
        assert!(TaskKind::Classification.default_timeout() < TaskKind::Summary.default_timeout());
        assert!(TaskKind::Summary.default_timeout() < TaskKind::Analysis.default_timeout());
    }

    #[test]
    fn test_effective_timeout_override() {
        let task = TaskDescriptor::new(TaskKind::Analysis, Complexity::Moderate);
        assert_eq!(task.effective_timeout(None), Duration::from_secs(60));
        assert_eq!(
            task.effective_timeout(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
    }
}
