use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use tot_cache::SemanticCache;
use tot_config::{RunConfig, Task};
use tot_engine::{Engine, Finalizer, MetricsSink, NoopMetricsSink, RunMetrics, RunSnapshot, RunStatus};
use tot_evaluator::Evaluator;
use tot_llm::{CancelToken, Gateway};
use tot_proposer::Proposer;
use tot_prompt::PromptTemplates;

use crate::error::RegistryError;
use crate::handle::RunHandle;

/// Lightweight view returned by `status`/`list` — just enough to poll a
/// run without paying for the full node trace (`spec.md` §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub metrics: RunMetrics,
}

/// Result of a `cancel(run_id)` call. Cancellation is idempotent: cancelling
/// an already-terminal run reports so rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyTerminal,
}

/// Model tags shared by every run this registry starts.
#[derive(Debug, Clone)]
pub struct ModelTags {
    pub chat: String,
    pub embed: String,
}

/// Run Registry (C8): the process-wide map of active runs (`spec.md` §4.8).
/// Owns the shared Gateway, Semantic Cache, and prompt templates; each
/// `start` call builds a fresh Proposer/Evaluator/Strategy/Finalizer/Engine
/// from its own `RunConfig` but all of them share the same cache and
/// gateway, matching the "Semantic Cache is process-wide" ownership rule in
/// `spec.md` §4.3.
pub struct RunRegistry {
    runs: RwLock<HashMap<String, RunHandle>>,
    gateway: Gateway,
    cache: Arc<SemanticCache>,
    templates: PromptTemplates,
    models: ModelTags,
    metrics: Arc<dyn MetricsSink>,
}

impl RunRegistry {
    pub fn new(gateway: Gateway, cache: Arc<SemanticCache>, templates: PromptTemplates, models: ModelTags) -> Self {
        Self { runs: RwLock::new(HashMap::new()), gateway, cache, templates, models, metrics: Arc::new(NoopMetricsSink) }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// `start(task, config) -> run_id`: allocates an id, builds the run's
    /// collaborators, spawns the Run Engine as a background task, and
    /// stores the handle (`spec.md` §4.8).
    #[instrument(skip(self, task, config))]
    pub async fn start(&self, task: Task, config: RunConfig) -> Result<String, RegistryError> {
        config.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancelToken::new();

        let proposer = Proposer::new(
            self.gateway.clone(),
            self.cache.clone(),
            self.templates.clone(),
            tot_proposer::ModelTags { chat: self.models.chat.clone(), embed: self.models.embed.clone() },
        );
        let evaluator = Evaluator::new(
            self.gateway.clone(),
            self.cache.clone(),
            self.templates.clone(),
            tot_evaluator::ModelTags { chat: self.models.chat.clone(), embed: self.models.embed.clone() },
        );
        let finalizer = Finalizer::new(self.gateway.clone(), self.templates.clone(), self.models.chat.clone());
        let strategy = tot_strategy::build(config.strategy, config.beam_width);
        let engine = Arc::new(Engine::new(proposer, evaluator, strategy, finalizer, self.metrics.clone()));

        let state = Engine::start(run_id.clone(), task, config, cancel.clone());
        let driven_state = state.clone();
        let driven_engine = engine.clone();
        let join_handle = tokio::spawn(async move {
            driven_engine.drive(driven_state).await;
        });

        let handle = RunHandle::new(state, cancel, join_handle);
        self.runs.write().await.insert(run_id.clone(), handle);
        Ok(run_id)
    }

    /// `status(run_id) -> {status, metrics_snapshot}`.
    pub async fn status(&self, run_id: &str) -> Result<StatusSummary, RegistryError> {
        let mut runs = self.runs.write().await;
        let handle = runs.get_mut(run_id).ok_or_else(|| RegistryError::NotFound(run_id.to_string()))?;
        handle.reap();
        let guard = handle.state.read().await;
        Ok(StatusSummary { run_id: run_id.to_string(), status: guard.status, metrics: guard.metrics.clone() })
    }

    /// `trace(run_id) -> RunState snapshot` — the partial snapshot while
    /// running, the full one once terminal (`spec.md` §4.8). The shared
    /// state is live either way; there is nothing extra to gate on here.
    pub async fn trace(&self, run_id: &str) -> Result<RunSnapshot, RegistryError> {
        let mut runs = self.runs.write().await;
        let handle = runs.get_mut(run_id).ok_or_else(|| RegistryError::NotFound(run_id.to_string()))?;
        handle.reap();
        Ok(handle.state.read().await.snapshot())
    }

    /// `cancel(run_id) -> outcome`: sets the cancel signal; idempotent;
    /// reports `already_terminal` for a run that has already reached a
    /// terminal status (`spec.md` §4.8). Non-blocking: the engine observes
    /// the signal at its next suspension point, no later than the next
    /// `CHECK_STOP`.
    pub async fn cancel(&self, run_id: &str) -> Result<CancelOutcome, RegistryError> {
        let mut runs = self.runs.write().await;
        let handle = runs.get_mut(run_id).ok_or_else(|| RegistryError::NotFound(run_id.to_string()))?;
        handle.reap();
        if handle.state.read().await.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyTerminal);
        }
        handle.cancel.cancel();
        Ok(CancelOutcome::Cancelled)
    }

    /// `list() -> sequence of summaries`.
    pub async fn list(&self) -> Vec<StatusSummary> {
        let mut runs = self.runs.write().await;
        let mut summaries = Vec::with_capacity(runs.len());
        for (run_id, handle) in runs.iter_mut() {
            handle.reap();
            let guard = handle.state.read().await;
            summaries.push(StatusSummary { run_id: run_id.clone(), status: guard.status, metrics: guard.metrics.clone() });
        }
        summaries
    }
}
