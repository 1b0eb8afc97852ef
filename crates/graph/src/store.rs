use std::collections::HashMap;

use crate::schema::{Node, NodeId, RawScores};

/// Thought Graph Store (C3): an in-memory tree of [`Node`]s owned by a
/// single run. Not shared across runs (`spec.md` §4.3).
#[derive(Debug, Default)]
pub struct ThoughtGraph {
    run_id: String,
    nodes: HashMap<NodeId, Node>,
    root_id: Option<NodeId>,
    next_seq: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("root already created for this run")]
    RootAlreadyExists,
}

impl ThoughtGraph {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), nodes: HashMap::new(), root_id: None, next_seq: 0 }
    }

    fn next_id(&mut self) -> NodeId {
        let id = format!("{}-{}", self.run_id, self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Create the root node from the task instruction. May only be called
    /// once per store.
    pub fn create_root(&mut self, text: impl Into<String>) -> Result<NodeId, GraphError> {
        if self.root_id.is_some() {
            return Err(GraphError::RootAlreadyExists);
        }
        let id = self.next_id();
        let node = Node::root(id.clone(), text.into());
        self.root_id = Some(id.clone());
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    pub fn root_id(&self) -> Option<&NodeId> {
        self.root_id.as_ref()
    }

    /// Append a child thought under `parent_id`. Fails if the parent does
    /// not exist — callers are expected to have validated the parent via
    /// the current frontier, so this is an invariant check, not a routine
    /// control-flow path.
    pub fn add_child(&mut self, parent_id: &NodeId, text: String) -> Result<NodeId, GraphError> {
        let parent_depth = self
            .nodes
            .get(parent_id)
            .map(|n| n.depth)
            .ok_or_else(|| GraphError::NotFound(parent_id.clone()))?;
        let id = self.next_id();
        let node = Node::child(id.clone(), parent_id.clone(), parent_depth, text);
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Write the evaluator's composite score and raw dimensions back onto a
    /// node. The only permitted post-creation mutation besides
    /// `mark_terminal` (`spec.md` §3).
    pub fn set_score(
        &mut self,
        id: &NodeId,
        score: f64,
        raw_scores: RawScores,
        low_confidence: bool,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NotFound(id.clone()))?;
        node.score = score;
        node.raw_scores = Some(raw_scores);
        node.low_confidence = low_confidence;
        Ok(())
    }

    pub fn mark_terminal(&mut self, id: &NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NotFound(id.clone()))?;
        node.is_terminal = true;
        Ok(())
    }

    /// Reconstruct the sequence of thoughts root→id, inclusive.
    pub fn path_text(&self, id: &NodeId) -> Result<Vec<String>, GraphError> {
        let mut path = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let node = self.nodes.get(&current).ok_or_else(|| GraphError::NotFound(current.clone()))?;
            path.push(node.thought.clone());
            cursor = node.parent_id.clone();
        }
        path.reverse();
        Ok(path)
    }

    pub fn nodes(&self) -> &HashMap<NodeId, Node> {
        &self.nodes
    }

    /// Count of non-root nodes, i.e. `nodes_expanded` per `spec.md` §8.
    pub fn non_root_count(&self) -> usize {
        self.nodes.len().saturating_sub(if self.root_id.is_some() { 1 } else { 0 })
    }
}
