//! Hybrid Evaluator (C5): scores a candidate node via cheap heuristics
//! first, an LLM value prompt otherwise, and writes a weighted composite
//! score back onto the node (`spec.md` §4.5).

mod error;
mod heuristics;
mod parse;

pub use error::EvaluatorError;
pub use heuristics::{declares_failure, heuristic_score};
pub use parse::parse_value_output;

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use tot_cache::SemanticCache;
use tot_config::{RunConfig, Task};
use tot_graph::{NodeId, RawScores, ThoughtGraph};
use tot_llm::{CancelToken, Gateway, GatewayError};
use tot_prompt::PromptTemplates;

/// The three named scoring dimensions, pre-clamp, pre-weighting.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedScores {
    pub progress: f64,
    pub promise: f64,
    pub confidence: f64,
}

impl From<ParsedScores> for RawScores {
    fn from(scores: ParsedScores) -> Self {
        RawScores { progress: scores.progress, promise: scores.promise, confidence: scores.confidence }
    }
}

/// Fallback used when the value prompt's output cannot be parsed at all
/// (`spec.md` §4.5); flagged `low_confidence` on the node.
const PARSE_FALLBACK: ParsedScores = ParsedScores { progress: 5.0, promise: 5.0, confidence: 3.0 };

#[derive(Debug, Clone)]
pub struct ModelTags {
    pub chat: String,
    pub embed: String,
}

pub struct Evaluator {
    gateway: Gateway,
    cache: Arc<SemanticCache>,
    templates: PromptTemplates,
    models: ModelTags,
}

impl Evaluator {
    pub fn new(gateway: Gateway, cache: Arc<SemanticCache>, templates: PromptTemplates, models: ModelTags) -> Self {
        Self { gateway, cache, templates, models }
    }

    /// Score `node_id` in `[0,10]`, writing `score`/`raw_scores`/`low_confidence`
    /// back onto it via the graph, and return the composite score.
    #[instrument(skip(self, graph, task, config, cancel), fields(node_id = %node_id))]
    pub async fn evaluate(
        &self,
        graph: &mut ThoughtGraph,
        node_id: &NodeId,
        task: &Task,
        config: &RunConfig,
        cancel: &CancelToken,
    ) -> Result<f64, EvaluatorError> {
        let thought = graph.get(node_id).ok_or_else(|| tot_graph::GraphError::NotFound(node_id.clone()))?.thought.clone();
        let path = graph.path_text(node_id)?;

        let (raw, low_confidence) = self.fetch_scores(task, config, &path, &thought, cancel).await;

        let weights = config.normalized_weights();
        let composite = (weights["progress"] * raw.progress
            + weights["promise"] * raw.promise
            + weights["confidence"] * raw.confidence)
            .clamp(0.0, 10.0);

        graph.set_score(node_id, composite, raw.into(), low_confidence)?;
        Ok(composite)
    }

    /// Heuristics-then-cache-then-LLM scoring with no graph dependency, so
    /// the engine can fan this out across a frontier's worth of nodes
    /// concurrently and write the results back sequentially afterward
    /// (`spec.md` §5).
    #[instrument(skip(self, task, config, path, thought, cancel))]
    pub async fn fetch_scores(
        &self,
        task: &Task,
        config: &RunConfig,
        path: &[String],
        thought: &str,
        cancel: &CancelToken,
    ) -> (ParsedScores, bool) {
        if let Some(scores) = heuristic_score(thought) {
            return (scores, false);
        }

        let cache_key = format!("evaluate | {} | {}", task.instruction, path.join(" / "));
        if let Some((payload, _similarity)) = self.cache.lookup("evaluate", &cache_key, cancel).await {
            if let Ok(scores) = serde_json::from_value::<ParsedScores>(payload) {
                return (scores, false);
            }
        }

        if cancel.is_cancelled() {
            return (PARSE_FALLBACK, true);
        }

        let prompt = self.templates.render_value(task, path);
        let result = match self.gateway.chat(&prompt, config.value_temp, &self.models.chat, cancel).await {
            Ok(raw) => raw,
            Err(GatewayError::Cancelled) => return (PARSE_FALLBACK, true),
            Err(err) => {
                warn!(error = %err, "value LLM call exhausted retries, falling back to low-confidence default");
                return (PARSE_FALLBACK, true);
            }
        };

        match parse_value_output(&result) {
            Some(scores) => {
                self.cache.insert("evaluate", &cache_key, json!(scores), cancel).await;
                (scores, false)
            }
            None => {
                warn!("value prompt output failed to parse, falling back to low-confidence default");
                (PARSE_FALLBACK, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use tot_graph::ThoughtGraph;
    use tot_llm::MockBackend;

    fn harness(dim: usize) -> (Evaluator, StdArc<MockBackend>) {
        let backend = StdArc::new(MockBackend::new(dim));
        let gateway = Gateway::new(backend.clone());
        let cache = Arc::new(SemanticCache::new(gateway.clone(), "mock-embed", 0.95, 64));
        let evaluator = Evaluator::new(
            gateway,
            cache,
            PromptTemplates::default(),
            ModelTags { chat: "mock-chat".into(), embed: "mock-embed".into() },
        );
        (evaluator, backend)
    }

    #[tokio::test]
    async fn short_thought_short_circuits_without_llm_call() {
        let (evaluator, backend) = harness(8);
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let child = graph.add_child(&root, "hi".to_string()).unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let score = evaluator.evaluate(&mut graph, &child, &task, &config, &cancel).await.unwrap();

        assert_eq!(backend.chat_call_count(), 0);
        assert!(!graph.get(&child).unwrap().low_confidence);
        assert!(score > 0.0);
    }

    #[tokio::test]
    async fn well_formed_llm_response_is_parsed_and_written() {
        let (evaluator, backend) = harness(8);
        backend.push_chat(Ok("progress: 8\npromise: 7\nconfidence: 9\njustification: good".into()));
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let child = graph.add_child(&root, "a reasonably sized candidate thought".to_string()).unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let score = evaluator.evaluate(&mut graph, &child, &task, &config, &cancel).await.unwrap();

        let node = graph.get(&child).unwrap();
        assert!(!node.low_confidence);
        assert_eq!(node.raw_scores.unwrap().progress, 8.0);
        assert!(score > 7.0);
    }

    #[tokio::test]
    async fn unparseable_llm_response_falls_back_to_low_confidence() {
        let (evaluator, backend) = harness(8);
        backend.push_chat(Ok("complete nonsense with no fields".into()));
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let child = graph.add_child(&root, "a reasonably sized candidate thought".to_string()).unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        evaluator.evaluate(&mut graph, &child, &task, &config, &cancel).await.unwrap();

        let node = graph.get(&child).unwrap();
        assert!(node.low_confidence);
        assert_eq!(node.raw_scores.unwrap().progress, 5.0);
    }
}
