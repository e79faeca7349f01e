use thiserror::Error;

/// Errors produced while dispatching a command (spec §4.4).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to enqueue reply: {0}")]
    Queue(#[from] relay_queue::PushError),

    #[error("access list error: {0}")]
    Access(#[from] relay_access::AccessError),
}
