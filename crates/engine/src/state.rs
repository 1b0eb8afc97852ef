use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use tot_config::{RunConfig, Task};
use tot_graph::{Node, NodeId, ThoughtGraph};
use tot_llm::CancelToken;

/// Lifecycle status of a run, per `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Stop-predicate outcomes, in the priority order CHECK_STOP evaluates them
/// (`spec.md` §4.7), plus the two failure-path reasons from §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    MaxNodes,
    MaxTime,
    ScoreThreshold,
    EmptyFrontier,
    DepthExhausted,
    InternalError,
    FinalizeError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub nodes_expanded: usize,
    pub final_score: f64,
    pub time_taken_seconds: f64,
    pub stop_reason: Option<StopReason>,
}

/// Serializable point-in-time view of a run, returned by `get_trace`/
/// `get_status` (`spec.md` §6). Distinct from [`RunState`] itself so the
/// live engine-internal fields (the cancel token, the monotonic clock) never
/// need to round-trip through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub task: Task,
    pub config: RunConfig,
    pub nodes: HashMap<NodeId, Node>,
    pub frontier: Vec<NodeId>,
    pub best_node_id: Option<NodeId>,
    pub final_answer: Option<String>,
    pub metrics: RunMetrics,
    pub status: RunStatus,
}

/// Engine-visible run state (`spec.md` §3). Owned by exactly one task (the
/// running engine); the Run Registry only ever sees [`RunSnapshot`]s of it.
pub struct RunState {
    pub run_id: String,
    pub task: Task,
    pub config: RunConfig,
    pub graph: ThoughtGraph,
    pub frontier: Vec<NodeId>,
    pub best_node_id: Option<NodeId>,
    /// Frontier nodes PROPOSE has already run on, this run's lifetime.
    /// Engine-loop-local bookkeeping, not part of the thought graph schema —
    /// it exists only so `best_first_search` can exclude already-proposed
    /// nodes from its global "unexpanded" view (see `DESIGN.md`).
    pub expanded: HashSet<NodeId>,
    pub start_time: Instant,
    pub final_answer: Option<String>,
    pub metrics: RunMetrics,
    pub cancel: CancelToken,
    pub status: RunStatus,
}

impl RunState {
    /// INITIALIZE (`spec.md` §4.7): root node from `task.instruction`,
    /// frontier = `[root]`, `best_node_id = root`, timer started, status :=
    /// `running`.
    pub fn initialize(run_id: impl Into<String>, task: Task, config: RunConfig, cancel: CancelToken) -> Self {
        let run_id = run_id.into();
        let mut graph = ThoughtGraph::new(run_id.clone());
        let root = graph
            .create_root(task.instruction.clone())
            .expect("fresh ThoughtGraph always accepts its first create_root");

        Self {
            run_id,
            task,
            config,
            graph,
            frontier: vec![root.clone()],
            best_node_id: Some(root),
            expanded: HashSet::new(),
            start_time: Instant::now(),
            final_answer: None,
            metrics: RunMetrics::default(),
            cancel,
            status: RunStatus::Running,
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.clone(),
            task: self.task.clone(),
            config: self.config.clone(),
            nodes: self.graph.nodes().clone(),
            frontier: self.frontier.clone(),
            best_node_id: self.best_node_id.clone(),
            final_answer: self.final_answer.clone(),
            metrics: self.metrics.clone(),
            status: self.status,
        }
    }
}
