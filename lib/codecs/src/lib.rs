//! Codecs turning the byte stream of a syslog transport into frames, and
//! frames into [`event::SyslogRecord`]s.

#[macro_use]
extern crate tracing;

pub mod decoding;
mod error;

pub use error::FramingError;
