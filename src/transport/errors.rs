use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to open channel: {0}")]
    Connect(String),
    #[error("channel protocol error: {0}")]
    Protocol(String),
    #[error("channel closed")]
    Closed,
}
