//! Error types for store access and evaluation.

use thiserror::Error;

use eltwatch_types::CycleStatus;

/// Errors that can occur when reading from the ingestion store.
///
/// These are transient from the dashboard's point of view: the poller
/// reports them and retries on the next tick. A missing row is not an
/// error; readers return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Local fixture could not be read.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Invalid input handed to an evaluator.
///
/// These mean a collaborator broke its contract (bad configuration or a
/// store row that violates its invariants). They are propagated, never
/// masked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Buffer capacity must be positive.
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,

    /// `ended_at` present on a running cycle, or missing on a terminal one.
    #[error("cycle {cycle_id} has status {status} with an inconsistent ended_at")]
    CycleInvariant {
        cycle_id: String,
        status: CycleStatus,
    },
}
