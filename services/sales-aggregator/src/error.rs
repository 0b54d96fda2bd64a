//! Errors raised at the fetch boundary
//!
//! None of these are fatal to a session: callers substitute an empty
//! default for the affected view and keep running.

use thiserror::Error;

/// Failure of a one-shot request/response fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error fetching {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    /// Endpoint the failed request targeted.
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }
}
