use thiserror::Error;

/// Errors produced while loading or saving the access list file.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of [`AccessList::add`] (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    AlreadyPresent,
    Full,
}

/// Outcome of [`AccessList::remove`] (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}
