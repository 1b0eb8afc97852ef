//! Search Strategy (C6): pluggable frontier policy. `spec.md` §9 flags the
//! teacher's string-keyed tool registry as an anti-pattern for this seam;
//! here the two variants are a closed, tagged-enum factory instead
//! (`build`), not a name-keyed lookup table.

mod best_first;
mod beam;
mod factory;

pub use best_first::BestFirstSearch;
pub use beam::BeamSearch;
pub use factory::build;

use std::collections::HashSet;

use tot_graph::{NodeId, ThoughtGraph};

/// Result of one SELECT_PRUNE pass: the new frontier and, if a node strictly
/// better than anything seen before was found, its id.
#[derive(Debug, Clone, Default)]
pub struct FrontierUpdate {
    pub frontier: Vec<NodeId>,
    pub best_id: Option<NodeId>,
}

/// A pluggable frontier policy (`spec.md` §4.6). Implementations must not
/// mutate nodes — scores are already final by the time SELECT_PRUNE runs.
///
/// `expanded` is the engine's running set of node ids that have already been
/// passed to the Proposer at least once; it lets `best_first_search` exclude
/// them from its "unexpanded" global view without the thought graph itself
/// needing to track expansion state.
pub trait SearchStrategy: Send + Sync {
    fn update_frontier(&self, graph: &ThoughtGraph, evaluated_ids: &[NodeId], expanded: &HashSet<NodeId>) -> FrontierUpdate;
}

/// Global argmax over every node the graph has ever scored, using the same
/// tie-break rules as frontier selection.
pub(crate) fn global_best(graph: &ThoughtGraph) -> Option<NodeId> {
    graph
        .nodes()
        .values()
        .filter(|node| node.raw_scores.is_some())
        .max_by(|a, b| compare_candidates(a, b))
        .map(|node| node.id.clone())
}

/// Orders two evaluated nodes by score (desc), confidence (desc), depth
/// (asc), id (asc) — the full tie-break chain from `spec.md` §4.6.
pub(crate) fn compare_candidates(a: &tot_graph::Node, b: &tot_graph::Node) -> std::cmp::Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| confidence_of(a).total_cmp(&confidence_of(b)))
        .then_with(|| b.depth.cmp(&a.depth))
        .then_with(|| b.id.cmp(&a.id))
}

fn confidence_of(node: &tot_graph::Node) -> f64 {
    node.raw_scores.map(|r| r.confidence).unwrap_or(0.0)
}
