/// Errors that cross the engine boundary into a run's terminal status.
/// Recoverable errors (transient LLM failures, parse failures) are absorbed
/// inside the Proposer/Evaluator and never reach here (`spec.md` §7).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] tot_graph::GraphError),
    #[error("finalize failed: {0}")]
    Finalize(String),
}
