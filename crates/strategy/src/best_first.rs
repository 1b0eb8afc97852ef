use std::collections::HashSet;

use tot_graph::{NodeId, ThoughtGraph};

use crate::{FrontierUpdate, SearchStrategy, compare_candidates, global_best};

/// Maintains a global priority view over every non-terminal, evaluated,
/// not-yet-expanded node across the whole tree; the frontier is always the
/// single best such node (`spec.md` §4.6).
#[derive(Default)]
pub struct BestFirstSearch;

impl SearchStrategy for BestFirstSearch {
    fn update_frontier(&self, graph: &ThoughtGraph, _evaluated_ids: &[NodeId], expanded: &HashSet<NodeId>) -> FrontierUpdate {
        let best_unexpanded = graph
            .nodes()
            .values()
            .filter(|node| node.raw_scores.is_some() && !node.is_terminal && !expanded.contains(&node.id))
            .max_by(|a, b| compare_candidates(a, b))
            .map(|node| node.id.clone());

        FrontierUpdate {
            frontier: best_unexpanded.into_iter().collect(),
            best_id: global_best(graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_is_single_best_unexpanded_node() {
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let a = graph.add_child(&root, "a".to_string()).unwrap();
        let b = graph.add_child(&root, "b".to_string()).unwrap();
        graph.set_score(&a, 3.0, tot_graph::RawScores { progress: 3.0, promise: 3.0, confidence: 5.0 }, false).unwrap();
        graph.set_score(&b, 9.0, tot_graph::RawScores { progress: 9.0, promise: 9.0, confidence: 5.0 }, false).unwrap();

        let strategy = BestFirstSearch;
        let update = strategy.update_frontier(&graph, &[], &HashSet::new());
        assert_eq!(update.frontier, vec![b]);
    }

    #[test]
    fn expanded_nodes_are_excluded() {
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let a = graph.add_child(&root, "a".to_string()).unwrap();
        let b = graph.add_child(&root, "b".to_string()).unwrap();
        graph.set_score(&a, 3.0, tot_graph::RawScores { progress: 3.0, promise: 3.0, confidence: 5.0 }, false).unwrap();
        graph.set_score(&b, 9.0, tot_graph::RawScores { progress: 9.0, promise: 9.0, confidence: 5.0 }, false).unwrap();

        let mut expanded = HashSet::new();
        expanded.insert(b.clone());

        let strategy = BestFirstSearch;
        let update = strategy.update_frontier(&graph, &[], &expanded);
        assert_eq!(update.frontier, vec![a]);
    }

    #[test]
    fn terminal_nodes_are_excluded_from_the_frontier() {
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let a = graph.add_child(&root, "a".to_string()).unwrap();
        graph.set_score(&a, 9.0, tot_graph::RawScores { progress: 9.0, promise: 9.0, confidence: 5.0 }, false).unwrap();
        graph.mark_terminal(&a).unwrap();

        let strategy = BestFirstSearch;
        let update = strategy.update_frontier(&graph, &[], &HashSet::new());
        assert!(update.frontier.is_empty());
    }
}
