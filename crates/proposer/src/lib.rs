//! Proposer (C4): expands a frontier node into up to `branching_factor`
//! candidate child thoughts, consulting the Semantic Cache before paying for
//! an LLM call (`spec.md` §4.4).

mod error;
mod parse;

pub use error::ProposerError;
pub use parse::{declares_solution, parse_candidates};

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use tot_cache::SemanticCache;
use tot_config::{RunConfig, Task};
use tot_graph::{NodeId, ThoughtGraph};
use tot_llm::{CancelToken, Gateway, GatewayError};
use tot_prompt::PromptTemplates;

/// Model tags identify which underlying model a `Gateway::chat`/`embed` call
/// should be routed to; the Proposer itself is model-agnostic.
#[derive(Debug, Clone)]
pub struct ModelTags {
    pub chat: String,
    pub embed: String,
}

pub struct Proposer {
    gateway: Gateway,
    cache: Arc<SemanticCache>,
    templates: PromptTemplates,
    models: ModelTags,
}

impl Proposer {
    pub fn new(gateway: Gateway, cache: Arc<SemanticCache>, templates: PromptTemplates, models: ModelTags) -> Self {
        Self { gateway, cache, templates, models }
    }

    /// Expand `node_id` into up to `config.branching_factor` children,
    /// returning their ids (the new frontier contribution for this node).
    /// Absorbs exhausted-LLM and parse failures internally: a node simply
    /// gets no children when the LLM call fails or returns nothing usable.
    #[instrument(skip(self, graph, task, config, cancel), fields(node_id = %node_id))]
    pub async fn propose(
        &self,
        graph: &mut ThoughtGraph,
        node_id: &NodeId,
        task: &Task,
        config: &RunConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<NodeId>, ProposerError> {
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        let path = graph.path_text(node_id)?;
        let thoughts = self.fetch_candidates(task, config, &path, cancel).await;

        let mut children = Vec::with_capacity(thoughts.len());
        for thought in thoughts {
            let is_terminal = declares_solution(&thought);
            let child_id = graph.add_child(node_id, thought)?;
            if is_terminal {
                graph.mark_terminal(&child_id)?;
            }
            children.push(child_id);
        }
        Ok(children)
    }

    /// Cache-then-LLM candidate generation with no graph dependency, so the
    /// engine can fan this out across a frontier's worth of nodes
    /// concurrently and apply the resulting children sequentially afterward
    /// (`spec.md` §5: bounded parallelism over N frontier nodes).
    #[instrument(skip(self, task, config, path, cancel))]
    pub async fn fetch_candidates(
        &self,
        task: &Task,
        config: &RunConfig,
        path: &[String],
        cancel: &CancelToken,
    ) -> Vec<String> {
        let k = config.branching_factor as usize;
        if k == 0 || cancel.is_cancelled() {
            return Vec::new();
        }

        let cache_key = format!("propose | {} | {}", task.instruction, path.join(" / "));
        match self.cache.lookup("propose", &cache_key, cancel).await {
            Some((payload, _similarity)) => serde_json::from_value::<Vec<String>>(payload).unwrap_or_default(),
            None => {
                let prompt = self.templates.render_propose(task, path, k as u32);
                match self.gateway.chat(&prompt, config.propose_temp, &self.models.chat, cancel).await {
                    Ok(raw) => {
                        let parsed = parse_candidates(&raw, k);
                        self.cache.insert("propose", &cache_key, json!(parsed), cancel).await;
                        parsed
                    }
                    Err(GatewayError::Cancelled) => Vec::new(),
                    Err(err) => {
                        warn!(error = %err, "propose LLM call exhausted retries, node gets no children");
                        Vec::new()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use tot_cache::SemanticCache;
    use tot_llm::MockBackend;

    fn harness(dim: usize) -> (Proposer, StdArc<MockBackend>) {
        let backend = StdArc::new(MockBackend::new(dim));
        let gateway = Gateway::new(backend.clone());
        let cache = Arc::new(SemanticCache::new(gateway.clone(), "mock-embed", 0.95, 64));
        let proposer = Proposer::new(
            gateway,
            cache,
            PromptTemplates::default(),
            ModelTags { chat: "mock-chat".into(), embed: "mock-embed".into() },
        );
        (proposer, backend)
    }

    #[tokio::test]
    async fn k_zero_is_immediate_noop() {
        let (proposer, backend) = harness(8);
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let task = Task::new("solve it");
        let mut config = RunConfig::default();
        config.branching_factor = 0;
        let cancel = CancelToken::new();

        let children = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();

        assert!(children.is_empty());
        assert_eq!(backend.chat_call_count(), 0);
    }

    #[tokio::test]
    async fn well_formed_json_produces_children() {
        let (proposer, backend) = harness(8);
        backend.push_chat(Ok(r#"["step a", "step b"]"#.into()));
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let children = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(graph.get(&children[0]).unwrap().thought, "step a");
        assert_eq!(graph.get(&children[1]).unwrap().thought, "step b");
    }

    #[tokio::test]
    async fn solution_marker_flags_child_terminal() {
        let (proposer, backend) = harness(8);
        backend.push_chat(Ok(r#"["SOLVED: the answer is 42"]"#.into()));
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let children = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();

        assert!(graph.get(&children[0]).unwrap().is_terminal);
    }

    #[tokio::test]
    async fn exhausted_llm_error_yields_no_children_not_error() {
        let (proposer, backend) = harness(8);
        for _ in 0..5 {
            backend.push_chat(Err(GatewayError::Transient("down".into())));
        }
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let children = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();

        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_avoids_second_llm_call() {
        let (proposer, backend) = harness(8);
        backend.push_chat(Ok(r#"["step a"]"#.into()));
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root thought").unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let first = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(backend.chat_call_count(), 1);

        let mut graph2 = ThoughtGraph::new("run-2");
        let root2 = graph2.create_root("root thought").unwrap();
        let second = proposer.propose(&mut graph2, &root2, &task, &config, &cancel).await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(graph2.get(&second[0]).unwrap().thought, "step a");
        assert_eq!(backend.chat_call_count(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_returns_empty_without_calling_llm() {
        let (proposer, backend) = harness(8);
        let mut graph = ThoughtGraph::new("run-1");
        let root = graph.create_root("root").unwrap();
        let task = Task::new("solve it");
        let config = RunConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let children = proposer.propose(&mut graph, &root, &task, &config, &cancel).await.unwrap();

        assert!(children.is_empty());
        assert_eq!(backend.chat_call_count(), 0);
    }
}
