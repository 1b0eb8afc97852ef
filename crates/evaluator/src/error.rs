/// Errors that escape the Hybrid Evaluator. Per `spec.md` §7, a value-prompt
/// parse failure is absorbed internally (low-confidence fallback) — only a
/// thought-graph invariant violation is a real error here.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Graph(#[from] tot_graph::GraphError),
}
