//! Slash-command parsing and routing.
//!
//! See `SPEC_FULL.md` §4.4. Every command's side effects are deferred to the
//! message queue; no handler calls an outbound client directly.

mod commands;
mod context;
mod error;

pub use commands::{dispatch, DispatchOutcome};
pub use context::CommandContext;
pub use error::DispatchError;
