//! Error types for connection-level failures.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtoError`].
pub type Result<T, E = ProtoError> = std::result::Result<T, E>;

/// Failures reported by a [`crate::WorldConnection`] or [`crate::Connector`].
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The connection has already been closed.
    #[error("connection closed")]
    Closed,

    /// The adapter refused or failed to open a session.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// A text line could not be handed to the connection.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// A name-completion request did not produce an answer.
    #[error("completion failed: {0}")]
    CompletionFailed(String),

    /// The remote side did not answer in time.
    #[error("timed out")]
    Timeout,

    /// Transport-level I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame from the adapter could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProtoError {
    /// Whether the error means the connection is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Io(_))
    }
}
