//! Sorted, file-persisted set of authorized sender identifiers.
//!
//! See `SPEC_FULL.md` §4.6.

mod access;
mod error;

pub use access::{AccessList, SenderId, MAX_ACCESS};
pub use error::{AccessError, AddOutcome, RemoveOutcome};
