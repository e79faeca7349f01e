use thiserror::Error;

/// Errors produced while loading a [`crate::ConfigSnapshot`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} out of range: got {value}, expected {bounds}")]
    OutOfRange {
        field: &'static str,
        value: String,
        bounds: &'static str,
    },
}
