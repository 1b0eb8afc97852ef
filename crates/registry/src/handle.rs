use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use tot_engine::RunState;
use tot_llm::CancelToken;

/// Everything the registry keeps about one run: shared state for
/// `status`/`trace`, a cancel signal, and the background task driving it.
/// Mirrors the teacher's `DaemonState.proactive_handle:
/// Option<tokio::task::AbortHandle>` (`crates/runtime/src/server.rs`).
pub struct RunHandle {
    pub(crate) state: Arc<RwLock<RunState>>,
    pub(crate) cancel: CancelToken,
    pub(crate) join_handle: Option<JoinHandle<()>>,
}

impl RunHandle {
    pub(crate) fn new(state: Arc<RwLock<RunState>>, cancel: CancelToken, join_handle: JoinHandle<()>) -> Self {
        Self { state, cancel, join_handle: Some(join_handle) }
    }

    /// Drop the `JoinHandle` once the background task has actually
    /// finished, so a terminal run holds no task reference (`spec.md` §4.8:
    /// "terminal transitions drop the JoinHandle").
    pub(crate) fn reap(&mut self) {
        if self.join_handle.as_ref().is_some_and(|h| h.is_finished()) {
            self.join_handle = None;
        }
    }
}
