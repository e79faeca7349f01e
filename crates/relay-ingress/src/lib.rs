//! Synchronous webhook ingress: one `POST /webhook` endpoint behind ordered
//! validation, backed by a thread pool and a reusable buffer pool.
//!
//! See `SPEC_FULL.md` §4.5.

mod buffer_pool;
mod error;
mod secret;
mod server;

pub use buffer_pool::{BufferPool, MAX_BODY_BYTES};
pub use error::IngressError;
pub use secret::constant_time_eq;
pub use server::{IngressConfig, IngressServer, UpdateCallback};
