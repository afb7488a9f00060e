use thiserror::Error;

/// Errors raised while handing a phrase to its destination.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The delivery queue has no receiver any more.
    #[error("delivery channel closed")]
    Closed,

    /// The platform refused or failed the send.
    #[error("send failed: {0}")]
    Send(String),
}
