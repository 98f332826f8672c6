//! Error types for the wire protocol crate.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length, delimiter included.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Invalid UTF-8 bytes in a received line.
    #[error("invalid UTF-8 in line at byte {byte_pos}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
    },

    /// Failed to parse a protocol line into a message.
    #[error("invalid message: {line}")]
    InvalidMessage {
        /// The offending line.
        line: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing a single protocol line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty after stripping the delimiter.
    #[error("empty message")]
    EmptyMessage,

    /// Line had no recognizable sender/command structure.
    #[error("truncated header: expected sender and command tokens")]
    TruncatedHeader,
}
