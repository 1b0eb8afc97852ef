use std::collections::HashSet;

use tot_graph::{NodeId, ThoughtGraph};

use crate::{FrontierUpdate, SearchStrategy, compare_candidates, global_best};

/// Keeps the top `beam_width` of this round's newly-evaluated nodes as the
/// next frontier (`spec.md` §4.6).
pub struct BeamSearch {
    beam_width: usize,
}

impl BeamSearch {
    pub fn new(beam_width: u32) -> Self {
        Self { beam_width: beam_width.max(1) as usize }
    }
}

impl SearchStrategy for BeamSearch {
    fn update_frontier(&self, graph: &ThoughtGraph, evaluated_ids: &[NodeId], _expanded: &HashSet<NodeId>) -> FrontierUpdate {
        let mut candidates: Vec<_> = evaluated_ids.iter().filter_map(|id| graph.get(id)).collect();
        candidates.sort_by(|a, b| compare_candidates(b, a));
        let frontier = candidates.into_iter().take(self.beam_width).map(|node| node.id.clone()).collect();
        FrontierUpdate { frontier, best_id: global_best(graph) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_three_children() -> (ThoughtGraph, NodeId, Vec<NodeId>) {
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let mut children = Vec::new();
        for (i, score) in [2.0, 8.0, 5.0].into_iter().enumerate() {
            let id = graph.add_child(&root, format!("child {i}")).unwrap();
            graph
                .set_score(&id, score, tot_graph::RawScores { progress: score, promise: score, confidence: 5.0 }, false)
                .unwrap();
            children.push(id);
        }
        (graph, root, children)
    }

    #[test]
    fn keeps_top_beam_width_by_score() {
        let (graph, _root, children) = graph_with_three_children();
        let strategy = BeamSearch::new(2);
        let update = strategy.update_frontier(&graph, &children, &HashSet::new());

        assert_eq!(update.frontier.len(), 2);
        assert_eq!(update.frontier[0], children[1]);
        assert_eq!(update.frontier[1], children[2]);
    }

    #[test]
    fn best_id_is_global_argmax() {
        let (graph, _root, children) = graph_with_three_children();
        let strategy = BeamSearch::new(1);
        let update = strategy.update_frontier(&graph, &children, &HashSet::new());
        assert_eq!(update.best_id, Some(children[1].clone()));
    }

    #[test]
    fn tie_break_prefers_higher_confidence_then_shallower_depth() {
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let a = graph.add_child(&root, "a".to_string()).unwrap();
        let b = graph.add_child(&root, "b".to_string()).unwrap();
        graph.set_score(&a, 5.0, tot_graph::RawScores { progress: 5.0, promise: 5.0, confidence: 3.0 }, false).unwrap();
        graph.set_score(&b, 5.0, tot_graph::RawScores { progress: 5.0, promise: 5.0, confidence: 9.0 }, false).unwrap();

        let strategy = BeamSearch::new(1);
        let update = strategy.update_frontier(&graph, &[a, b.clone()], &HashSet::new());
        assert_eq!(update.frontier, vec![b]);
    }
}
