//! Single-file circular append log.
//!
//! Crash-recoverable, wraps when full, and doubles as the structured logging
//! backend for the whole process — there is no separate logging framework.
//! See `SPEC_FULL.md` §4.7.

mod error;
mod follow;
mod invariants;
mod level;
mod log;

pub use error::LogError;
pub use follow::follow;
pub use level::{Level, LevelFilter};
pub use log::CircularLog;
