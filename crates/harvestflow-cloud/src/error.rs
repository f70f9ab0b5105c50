//! Remote API error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`ResourceClient`](crate::ResourceClient)
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// The read targeted an object the remote system does not have
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// The create targeted a name the remote system already holds
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::AlreadyExists(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Outcome of a wait that did not reach its desired state
#[derive(Error, Debug)]
pub enum WaitError<S> {
    /// A terminal failure state was observed
    #[error("resource reached a terminal failure state: {0:?}")]
    Fatal(S),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("wait was cancelled")]
    Cancelled,

    #[error(transparent)]
    Read(#[from] CloudError),
}

impl<S> WaitError<S> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }
}
