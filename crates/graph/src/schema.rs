use serde::{Deserialize, Serialize};

/// Opaque, globally-unique node identifier. Scoped by run id so two
/// concurrent runs never collide without coordination (`spec.md` §4.3).
pub type NodeId = String;

/// The three named scoring dimensions the Hybrid Evaluator (C5) writes,
/// each in `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawScores {
    pub progress: f64,
    pub promise: f64,
    pub confidence: f64,
}

/// One node in the thought tree. Immutable after creation except for
/// `score`, `raw_scores`, and `is_terminal` — all three are written exactly
/// once, by the evaluator (`score`/`raw_scores`) or by the proposer
/// (`is_terminal`), per `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub thought: String,
    pub depth: u32,
    pub score: f64,
    pub raw_scores: Option<RawScores>,
    /// Set when the evaluator flagged this node's `raw_scores` as a
    /// parse-failure fallback rather than a genuine LLM judgment (see
    /// `spec.md` §4.5 and the supplemented marker in `SPEC_FULL.md` §10).
    pub low_confidence: bool,
    pub is_terminal: bool,
}

impl Node {
    pub(crate) fn root(id: NodeId, thought: String) -> Self {
        Self {
            id,
            parent_id: None,
            thought,
            depth: 0,
            score: 0.0,
            raw_scores: None,
            low_confidence: false,
            is_terminal: false,
        }
    }

    pub(crate) fn child(id: NodeId, parent_id: NodeId, parent_depth: u32, thought: String) -> Self {
        Self {
            id,
            parent_id: Some(parent_id),
            thought,
            depth: parent_depth + 1,
            score: 0.0,
            raw_scores: None,
            low_confidence: false,
            is_terminal: false,
        }
    }
}
