//! LLM Gateway (C1): a uniform `chat`/`embed` interface with bounded
//! exponential-backoff retries and cooperative cancellation, fronting a
//! pluggable [`Backend`] (HTTP vendor SDK or a deterministic mock for
//! tests).

mod backend;
mod cancel;
mod error;
mod gateway;
mod http;
mod mock;

pub use backend::Backend;
pub use cancel::CancelToken;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpBackend;
pub use mock::MockBackend;
