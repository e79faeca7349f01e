use thiserror::Error;

/// Errors produced by [`crate::Queue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// The sender's ring is at capacity. Drop-newest: the message is discarded,
    /// nothing in-flight is overwritten.
    #[error("queue full for this sender")]
    QueueFull,
}

/// Errors produced by [`crate::Queue::pop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopError {
    /// Shutdown was signalled and every ring has drained. No more messages
    /// will ever become available.
    #[error("queue shut down and drained")]
    End,
}
