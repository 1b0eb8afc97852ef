/// Errors that escape the Proposer. Per `spec.md` §7, an exhausted LLM call
/// is absorbed internally (the node simply gets no children) — only a
/// thought-graph invariant violation is a real error here.
#[derive(Debug, thiserror::Error)]
pub enum ProposerError {
    #[error(transparent)]
    Graph(#[from] tot_graph::GraphError),
}
