//! Framing methods that split the byte stream of one connection into
//! syslog frames.

mod newline;
mod octet_counting;

pub use newline::NewlineDelimitedDecoder;
pub use octet_counting::OctetCountingDecoder;

use super::FramingError;
