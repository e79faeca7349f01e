//! Immutable, validated configuration snapshot.
//!
//! See `SPEC_FULL.md` §3 ("ConfigSnapshot") and §6/§9.7.

mod error;
mod snapshot;

pub use error::ConfigError;
pub use snapshot::ConfigSnapshot;
