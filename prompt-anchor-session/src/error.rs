//! Error types for service collaborators.
//!
//! Cancellation is deliberately absent: a cancelled fetch is not an error
//! (it resolves to `Ok(None)` at the client), while a timeout is - the two
//! end the same operation but are reported differently.

use thiserror::Error;

/// Errors surfaced to the UI layer from the labeling/suggestion services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Non-2xx response; carries the status for the error toast.
    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The request outlived its deadline.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response failed shape validation.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
