use thiserror::Error;

/// Errors produced while opening or writing the circular log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log cap must be at least 256 bytes, got {0}")]
    CapTooSmall(u64),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
