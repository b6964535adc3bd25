//! A collection of support structures that are used in the process of decoding
//! bytes into syslog records.

mod error;
pub mod format;
mod framing;

use bytes::{Bytes, BytesMut};

pub use error::DeserializeError;
pub use format::{Origin, Rfc, SyslogDeserializer};
pub use framing::{NewlineDelimitedDecoder, OctetCountingDecoder};

use crate::FramingError;

/// Produce byte frames from a byte stream
#[derive(Clone, Debug)]
pub enum Framer {
    /// Uses a `NewlineDelimitedDecoder` for framing.
    NewlineDelimited(NewlineDelimitedDecoder),
    /// Uses a `OctetCountingDecoder` for framing
    OctetCounting(OctetCountingDecoder),
}

impl From<NewlineDelimitedDecoder> for Framer {
    fn from(f: NewlineDelimitedDecoder) -> Self {
        Self::NewlineDelimited(f)
    }
}

impl From<OctetCountingDecoder> for Framer {
    fn from(f: OctetCountingDecoder) -> Self {
        Self::OctetCounting(f)
    }
}

impl tokio_util::codec::Decoder for Framer {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            Framer::NewlineDelimited(f) => f.decode(src),
            Framer::OctetCounting(f) => f.decode(src),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            Framer::NewlineDelimited(f) => f.decode_eof(buf),
            Framer::OctetCounting(f) => f.decode_eof(buf),
        }
    }
}

impl Rfc {
    /// The framing a stream transport uses for messages of this variant.
    pub fn stream_framer(&self, max_length: usize) -> Framer {
        match self {
            Rfc::Rfc3164 => NewlineDelimitedDecoder::new_with_max_length(max_length).into(),
            Rfc::Rfc5424 => OctetCountingDecoder::new_with_max_length(max_length).into(),
        }
    }
}
