use thiserror::Error;

/// Errors produced by a [`crate::CompletionClient`] (spec §4.2).
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned status {0}")]
    RemoteStatus(u16),

    #[error("aborted: shutdown requested")]
    Cancelled,
}

/// Errors produced by a [`crate::PlatformClient`] (spec §4.2).
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned status {0}")]
    RemoteStatus(u16),

    #[error("aborted: shutdown requested")]
    Cancelled,
}
