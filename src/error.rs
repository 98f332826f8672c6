//! Client error types.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors surfaced by the client core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error on the transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol error (codec or parser).
    #[error(transparent)]
    Protocol(#[from] corvid_proto::ProtocolError),

    /// Operation requires an attached transport.
    #[error("not connected")]
    NotConnected,

    /// The server closed the connection.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
