use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::instrument;

use tot_evaluator::Evaluator;
use tot_graph::NodeId;
use tot_proposer::Proposer;
use tot_strategy::SearchStrategy;

use crate::finalize::Finalizer;
use crate::metrics::MetricsSink;
use crate::state::{RunState, RunStatus, StopReason};

/// Bounded parallelism cap for PROPOSE/EVALUATE fan-out, `P = min(N, 8)`
/// (`spec.md` §5).
const MAX_FAN_OUT: usize = 8;

/// Run Engine (C7): drives one run through
/// INITIALIZE → PROPOSE → EVALUATE → SELECT_PRUNE → CHECK_STOP →
/// {loop | FINALIZE} (`spec.md` §4.7).
///
/// Operates on a shared `Arc<RwLock<RunState>>` rather than owning the state
/// outright, so a caller (the Run Registry) can read a live snapshot via
/// `status`/`trace` while [`Engine::drive`] runs in its own background task.
/// Each phase takes the lock only for as long as it needs to read or commit,
/// never across an in-flight LLM call.
pub struct Engine {
    proposer: Arc<Proposer>,
    evaluator: Arc<Evaluator>,
    strategy: Box<dyn SearchStrategy>,
    finalizer: Arc<Finalizer>,
    metrics: Arc<dyn MetricsSink>,
}

impl Engine {
    pub fn new(
        proposer: Proposer,
        evaluator: Evaluator,
        strategy: Box<dyn SearchStrategy>,
        finalizer: Finalizer,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            proposer: Arc::new(proposer),
            evaluator: Arc::new(evaluator),
            strategy,
            finalizer: Arc::new(finalizer),
            metrics,
        }
    }

    /// INITIALIZE. Synchronous and dependency-free, so a caller can obtain
    /// the shared handle before the engine's background task starts.
    pub fn start(
        run_id: impl Into<String>,
        task: tot_config::Task,
        config: tot_config::RunConfig,
        cancel: tot_llm::CancelToken,
    ) -> Arc<RwLock<RunState>> {
        Arc::new(RwLock::new(RunState::initialize(run_id, task, config, cancel)))
    }

    /// Drive `state` through the full state machine until a terminal status
    /// is reached. Intended to be spawned as its own task by the Run
    /// Registry; `state` stays readable by `status`/`trace` throughout.
    #[instrument(skip(self, state))]
    pub async fn drive(&self, state: Arc<RwLock<RunState>>) {
        self.emit_transition("initialize");

        let stop_reason = loop {
            self.propose(&state).await;
            self.emit_transition("propose");

            self.evaluate(&state).await;
            self.emit_transition("evaluate");

            self.select_prune(&state).await;
            self.emit_transition("select_prune");

            if let Some(reason) = self.check_stop(&state).await {
                break reason;
            }
        };

        self.finalize(&state, stop_reason).await;
        self.emit_transition("finalize");
    }

    /// Convenience entry point for callers that just want the terminal
    /// state back directly (tests, the CLI's synchronous `run` subcommand).
    pub async fn run(
        &self,
        run_id: impl Into<String>,
        task: tot_config::Task,
        config: tot_config::RunConfig,
        cancel: tot_llm::CancelToken,
    ) -> RunState {
        let state = Self::start(run_id, task, config, cancel);
        self.drive(state.clone()).await;
        Arc::try_unwrap(state)
            .unwrap_or_else(|_| panic!("run state still shared after drive completed"))
            .into_inner()
    }

    fn emit_transition(&self, label: &str) {
        self.metrics.increment("engine.transition", &[("state", label)], 1);
    }

    /// PROPOSE: expand every frontier node still within `max_depth`, up to
    /// `min(N, 8)` concurrently, then apply the resulting children
    /// sequentially. Replaces `state.frontier` with the newly created
    /// children (`spec.md` §4.4 step 5).
    async fn propose(&self, state: &Arc<RwLock<RunState>>) {
        let (task, config, cancel, expandable) = {
            let guard = state.read().await;
            if guard.cancel.is_cancelled() {
                return;
            }
            // Nodes already at `max_depth` propose nothing: the spec's
            // `max_depth = 0` boundary ("finalize runs on the root; no
            // expansion") falls out of this naturally rather than needing a
            // special case.
            let expandable: Vec<(NodeId, Vec<String>)> = guard
                .frontier
                .iter()
                .filter(|id| guard.graph.get(id).map(|n| n.depth < guard.config.max_depth).unwrap_or(false))
                .filter_map(|id| guard.graph.path_text(id).ok().map(|path| (id.clone(), path)))
                .collect();
            (guard.task.clone(), guard.config.clone(), guard.cancel.clone(), expandable)
        };

        let semaphore = Arc::new(Semaphore::new(expandable.len().min(MAX_FAN_OUT).max(1)));
        let mut join_set = JoinSet::new();

        for (node_id, path) in expandable {
            let proposer = self.proposer.clone();
            let task = task.clone();
            let config = config.clone();
            let cancel = cancel.clone();
            let sem = semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore is never closed");
                let thoughts = proposer.fetch_candidates(&task, &config, &path, &cancel).await;
                (node_id, thoughts)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok(pair) = joined {
                results.push(pair);
            }
        }

        let mut guard = state.write().await;
        let mut new_frontier = Vec::new();
        for (node_id, thoughts) in results {
            guard.expanded.insert(node_id.clone());
            for thought in thoughts {
                let is_terminal = tot_proposer::declares_solution(&thought);
                if let Ok(child_id) = guard.graph.add_child(&node_id, thought) {
                    if is_terminal {
                        let _ = guard.graph.mark_terminal(&child_id);
                    }
                    new_frontier.push(child_id);
                }
            }
        }
        guard.frontier = new_frontier;
        guard.metrics.nodes_expanded = guard.graph.non_root_count();
    }

    /// EVALUATE: score every frontier node, up to `min(N, 8)` concurrently,
    /// then write the resulting scores back sequentially (`spec.md` §4.5,
    /// §5).
    async fn evaluate(&self, state: &Arc<RwLock<RunState>>) {
        let (task, config, cancel, scorable) = {
            let guard = state.read().await;
            if guard.cancel.is_cancelled() {
                return;
            }
            let scorable: Vec<(NodeId, Vec<String>, String)> = guard
                .frontier
                .iter()
                .filter_map(|id| {
                    let node = guard.graph.get(id)?;
                    let path = guard.graph.path_text(id).ok()?;
                    Some((id.clone(), path, node.thought.clone()))
                })
                .collect();
            (guard.task.clone(), guard.config.clone(), guard.cancel.clone(), scorable)
        };

        let semaphore = Arc::new(Semaphore::new(scorable.len().min(MAX_FAN_OUT).max(1)));
        let mut join_set = JoinSet::new();

        for (node_id, path, thought) in scorable {
            let evaluator = self.evaluator.clone();
            let task = task.clone();
            let config = config.clone();
            let cancel = cancel.clone();
            let sem = semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore is never closed");
                let (scores, low_confidence) = evaluator.fetch_scores(&task, &config, &path, &thought, &cancel).await;
                (node_id, scores, low_confidence)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok(triple) = joined {
                results.push(triple);
            }
        }

        let mut guard = state.write().await;
        let weights = guard.config.normalized_weights();
        for (node_id, raw, low_confidence) in results {
            let composite = (weights["progress"] * raw.progress
                + weights["promise"] * raw.promise
                + weights["confidence"] * raw.confidence)
                .clamp(0.0, 10.0);
            let _ = guard.graph.set_score(&node_id, composite, raw.into(), low_confidence);
        }
    }

    /// SELECT_PRUNE: apply the configured strategy to the just-evaluated
    /// frontier, then update `best_node_id` only if it strictly improved
    /// (`spec.md` §4.6).
    async fn select_prune(&self, state: &Arc<RwLock<RunState>>) {
        let mut guard = state.write().await;
        if guard.cancel.is_cancelled() {
            return;
        }

        let evaluated_ids = guard.frontier.clone();
        let update = self.strategy.update_frontier(&guard.graph, &evaluated_ids, &guard.expanded);
        guard.frontier = update.frontier;

        if let Some(candidate) = update.best_id {
            let candidate_score = guard.graph.get(&candidate).map(|n| n.score).unwrap_or(f64::MIN);
            let current_score =
                guard.best_node_id.as_ref().and_then(|id| guard.graph.get(id)).map(|n| n.score).unwrap_or(f64::MIN);
            if candidate_score > current_score {
                guard.best_node_id = Some(candidate);
            }
        }
    }

    /// CHECK_STOP, in the exact priority order of `spec.md` §4.7.
    async fn check_stop(&self, state: &Arc<RwLock<RunState>>) -> Option<StopReason> {
        let guard = state.read().await;
        if guard.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        if guard.metrics.nodes_expanded as u32 >= guard.config.stop_conditions.max_nodes {
            return Some(StopReason::MaxNodes);
        }
        if guard.start_time.elapsed().as_secs_f64() >= guard.config.stop_conditions.max_time_seconds {
            return Some(StopReason::MaxTime);
        }
        if let Some(node) = guard.best_node_id.as_ref().and_then(|id| guard.graph.get(id)) {
            if node.score >= guard.config.stop_conditions.score_threshold && node.depth >= 1 {
                return Some(StopReason::ScoreThreshold);
            }
        }
        if guard.frontier.is_empty() {
            return Some(StopReason::EmptyFrontier);
        }
        let depth_exhausted = guard
            .frontier
            .iter()
            .all(|id| guard.graph.get(id).map(|n| n.depth >= guard.config.max_depth).unwrap_or(true));
        if depth_exhausted {
            return Some(StopReason::DepthExhausted);
        }
        None
    }

    /// FINALIZE: synthesize the final answer over the winning path, unless
    /// the run was cancelled (`spec.md` §4.9).
    async fn finalize(&self, state: &Arc<RwLock<RunState>>, stop_reason: StopReason) {
        let (task, config, cancel, best_path, elapsed, best_score) = {
            let guard = state.read().await;
            let best_score = guard.best_node_id.as_ref().and_then(|id| guard.graph.get(id)).map(|n| n.score).unwrap_or(0.0);
            let best_path =
                guard.best_node_id.as_ref().and_then(|id| guard.graph.path_text(id).ok());
            (guard.task.clone(), guard.config.clone(), guard.cancel.clone(), best_path, guard.start_time.elapsed(), best_score)
        };

        let mut guard = state.write().await;
        guard.metrics.stop_reason = Some(stop_reason);
        guard.metrics.time_taken_seconds = elapsed.as_secs_f64();
        guard.metrics.final_score = best_score;

        if stop_reason == StopReason::Cancelled {
            guard.status = RunStatus::Cancelled;
            return;
        }

        let Some(path) = best_path else {
            guard.status = RunStatus::Failed;
            guard.metrics.stop_reason = Some(StopReason::InternalError);
            return;
        };
        drop(guard);

        let outcome = self.finalizer.finalize(&task, &path, &config, &cancel).await;

        let mut guard = state.write().await;
        match outcome {
            Ok(answer) => {
                guard.final_answer = Some(answer);
                guard.status = RunStatus::Completed;
            }
            Err(_) => {
                guard.status = RunStatus::Failed;
                guard.metrics.stop_reason = Some(StopReason::FinalizeError);
            }
        }
    }
}
