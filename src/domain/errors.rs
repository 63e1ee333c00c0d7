use thiserror::Error;
use tokio::sync::mpsc;

/// Validation errors for quote input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Quote text must not be empty")]
    EmptyText,

    #[error("Quote category must not be empty")]
    EmptyCategory,

    #[error("Invalid import payload: {0}")]
    InvalidImport(String),
}

/// Errors surfaced by the sync pipeline
///
/// A fetch or parse failure upstream never reaches the reconciler; the cycle
/// is recorded as failed and local state is left untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote endpoint unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Channel send error: {0}")]
    ChannelSendError(String),

    #[error("No response received from sync actor")]
    NoResponse,

    #[error("Timeout waiting for sync cycle")]
    Timeout,
}

impl<T> From<mpsc::error::SendError<T>> for SyncError {
    fn from(e: mpsc::error::SendError<T>) -> Self {
        SyncError::ChannelSendError(e.to_string())
    }
}
