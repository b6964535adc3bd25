use std::str::Utf8Error;

use thiserror::Error;

/// An error that occurred while converting one frame into a record.
///
/// None of them is fatal, the offending frame is dropped and the stream it
/// came from keeps going.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// The frame does not match the configured grammar.
    #[error("malformed message, {0}")]
    Malformed(&'static str),

    /// The frame is not valid UTF-8 and lossy decoding is disabled.
    #[error("invalid utf8, {0}")]
    Utf8(#[from] Utf8Error),
}
