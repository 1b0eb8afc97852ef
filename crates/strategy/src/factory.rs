use tot_config::StrategyKind;

use crate::{BeamSearch, BestFirstSearch, SearchStrategy};

/// Builds the configured strategy. A closed match over `StrategyKind`
/// rather than a string-keyed registry (`spec.md` §9).
pub fn build(kind: StrategyKind, beam_width: u32) -> Box<dyn SearchStrategy> {
    match kind {
        StrategyKind::BeamSearch => Box::new(BeamSearch::new(beam_width)),
        StrategyKind::BestFirstSearch => Box::new(BestFirstSearch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tot_graph::ThoughtGraph;

    #[test]
    fn builds_beam_search_for_beam_search_kind() {
        let strategy = build(StrategyKind::BeamSearch, 3);
        let graph = ThoughtGraph::new("run-1");
        let update = strategy.update_frontier(&graph, &[], &HashSet::new());
        assert!(update.frontier.is_empty());
    }

    #[test]
    fn builds_best_first_for_best_first_kind() {
        let strategy = build(StrategyKind::BestFirstSearch, 3);
        let graph = ThoughtGraph::new("run-1");
        let update = strategy.update_frontier(&graph, &[], &HashSet::new());
        assert!(update.frontier.is_empty());
    }
}
