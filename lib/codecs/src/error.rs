use thiserror::Error;

/// An error that occurred while splitting a byte stream into frames.
///
/// Every variant is fatal to the stream it happened on, the caller is expected
/// to close the connection.
#[derive(Debug, Error)]
pub enum FramingError {
    /// An unterminated frame, or a declared frame length, exceeds the maximum
    /// frame size.
    #[error("frame of {length} bytes exceeds the maximum of {max_length} bytes")]
    FrameTooLarge {
        /// Bytes buffered so far, or the declared length of an octet counted frame
        length: usize,
        /// The configured maximum
        max_length: usize,
    },

    /// The octet counting length prefix is malformed.
    #[error("invalid octet counting frame, {0}")]
    Protocol(String),

    /// Reading from the underlying transport failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
