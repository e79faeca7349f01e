use thiserror::Error;

/// Errors produced while starting or running the webhook server (spec
/// §4.5).
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("failed to bind webhook server: {0}")]
    Bind(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
