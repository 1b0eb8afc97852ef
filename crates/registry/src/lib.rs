//! Run Registry (C8): the process-wide map of active runs — `start`,
//! `status`, `trace`, `cancel`, `list` (`spec.md` §4.8).

mod error;
mod handle;
mod registry;

pub use error::RegistryError;
pub use registry::{CancelOutcome, ModelTags, RunRegistry, StatusSummary};
