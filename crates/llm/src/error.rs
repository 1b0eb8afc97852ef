/// Gateway-level error classification, per `spec.md` §4.1/§7. `Transient` is
/// retried inside [`crate::Gateway`]; the others propagate to the caller.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transient LLM error: {0}")]
    Transient(String),
    #[error("quota exceeded: {0}")]
    Quota(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("cancelled")]
    Cancelled,
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}
