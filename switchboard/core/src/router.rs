//! Routing Policy
//!
//! Produces a deterministic, total ordering of candidate backend ids for one
//! task, given a registry snapshot. Pure: no I/O, no clock, no shared state,
//! so every routing decision is unit-testable in isolation.
//!
//! # Decision Flow
//!
//! ```text
//! 1. Filter to available backends
//! 2. Sort: priority asc, then success rate desc, then latency asc
//! 3. Capability overrides reorder (never filter):
//!      citations        -> citation-capable backend to the front
//!      complex extract  -> complex-extraction-capable backend to the front
//!    Applied in that order, so the extraction override wins the front slot
//!    when both fire and the citation pick heads the remainder.
//! 4. Return ids in order; empty means nothing can serve right now
//! ```

use std::cmp::Ordering;

use crate::registry::BackendDescriptor;
use crate::task::{Complexity, TaskDescriptor, TaskKind};

/// Tag for backends trusted with complex extraction work
pub const CAP_COMPLEX_EXTRACTION: &str = "complex-extraction-capable";

/// Tag for backends that can attach source citations
pub const CAP_CITATIONS: &str = "citation-capable";

/// Order the available backends for one task
///
/// Returns each available backend's id exactly once, most preferred first.
/// An empty result means no backend can serve right now and the caller must
/// treat the task as unroutable until a cooldown expires.
#[must_use]
pub fn candidates(task: &TaskDescriptor, snapshot: &[BackendDescriptor]) -> Vec<String> {
    let mut ranked: Vec<&BackendDescriptor> =
        snapshot.iter().filter(|d| d.available).collect();

    ranked.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| {
                b.success_rate
                    .partial_cmp(&a.success_rate)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                a.avg_latency_ms
                    .partial_cmp(&b.avg_latency_ms)
                    .unwrap_or(Ordering::Equal)
            })
    });

    let mut ids: Vec<String> = ranked.iter().map(|d| d.id.clone()).collect();

    if task.requires_citations {
        promote_tagged(&mut ids, snapshot, CAP_CITATIONS);
    }
    if task.kind == TaskKind::Extraction && task.complexity == Complexity::Complex {
        promote_tagged(&mut ids, snapshot, CAP_COMPLEX_EXTRACTION);
    }

    ids
}

/// Move the best-ranked backend carrying `tag` to the front, if any
fn promote_tagged(ids: &mut Vec<String>, snapshot: &[BackendDescriptor], tag: &str) {
    let pos = ids.iter().position(|id| {
        snapshot
            .iter()
            .any(|d| d.id == *id && d.has_capability(tag))
    });
    if let Some(pos) = pos {
        let id = ids.remove(pos);
        ids.insert(0, id);
    }
}
