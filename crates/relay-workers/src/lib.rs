//! Worker pool: drains the queue with per-sender pacing, requests a
//! completion, strips reasoning markers, and sends the reply.
//!
//! See `SPEC_FULL.md` §4.2, §4.3.

mod clients;
mod error;
mod pool;
mod reasoning;

pub use clients::{CompletionClient, PlatformClient, UreqCompletionClient, UreqPlatformClient};
pub use error::{CompletionError, SendError};
pub use pool::{ClientFactory, WorkerPool};
pub use reasoning::strip_reasoning;
