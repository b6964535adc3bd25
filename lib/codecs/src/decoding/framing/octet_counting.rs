use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use super::{FramingError, NewlineDelimitedDecoder};

// u32::MAX has 10 digits, nothing longer can be a sane frame length.
const MAX_PREFIX_DIGITS: usize = 10;

/// Decoder for the octet counting framing of RFC 6587, `MSG-LEN SP SYSLOG-MSG`.
///
/// Frames starting with `<` are taken as non-transparent framing and handed
/// to a [`NewlineDelimitedDecoder`], so senders mixing both framings on one
/// connection keep working.
#[derive(Clone, Debug)]
pub struct OctetCountingDecoder {
    max_length: usize,
    newline: NewlineDelimitedDecoder,

    // Length of the frame body we are waiting for, the prefix is consumed
    // already.
    pending: Option<usize>,
}

impl OctetCountingDecoder {
    pub const fn new_with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            newline: NewlineDelimitedDecoder::new_with_max_length(max_length),
            pending: None,
        }
    }

    /// Parses the length prefix at the start of `src`. Returns `None` if
    /// more bytes are needed to tell.
    ///
    /// A length over `max_length` fails as soon as its digits show it, there
    /// is no point in waiting for the rest of the prefix.
    fn parse_prefix(&self, src: &BytesMut) -> Result<Option<(usize, usize)>, FramingError> {
        let mut length = 0u64;
        let mut digits = 0;

        for b in src.iter().take_while(|b| b.is_ascii_digit()) {
            digits += 1;
            if digits > MAX_PREFIX_DIGITS {
                return Err(FramingError::Protocol(format!(
                    "length prefix longer than {MAX_PREFIX_DIGITS} digits"
                )));
            }

            // at most 10 digits, this never overflows
            length = length * 10 + u64::from(b - b'0');
            if length > self.max_length as u64 {
                return Err(FramingError::FrameTooLarge {
                    length: usize::try_from(length).unwrap_or(usize::MAX),
                    max_length: self.max_length,
                });
            }
        }

        match src.get(digits) {
            None => Ok(None),
            Some(b' ') => Ok(Some((digits + 1, length as usize))),
            Some(other) => Err(FramingError::Protocol(format!(
                "unexpected byte 0x{other:02x} after length prefix"
            ))),
        }
    }
}

impl Decoder for OctetCountingDecoder {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let Some(length) = self.pending {
                if src.len() < length {
                    src.reserve(length - src.len());
                    return Ok(None);
                }

                self.pending = None;
                return Ok(Some(src.split_to(length).freeze()));
            }

            // trailers some senders put between frames
            let skip = src
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .count();
            src.advance(skip);

            match src.first() {
                None => return Ok(None),
                Some(b'<') => return self.newline.decode(src),
                Some(b) if b.is_ascii_digit() => match self.parse_prefix(src)? {
                    Some((consumed, length)) => {
                        src.advance(consumed);
                        self.pending = Some(length);
                    }
                    None => return Ok(None),
                },
                Some(other) => {
                    return Err(FramingError::Protocol(format!(
                        "expected a length prefix, found byte 0x{other:02x}"
                    )));
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if self.pending.is_none() && buf.first() == Some(&b'<') {
            return self.newline.decode_eof(buf);
        }

        if !buf.is_empty() || self.pending.is_some() {
            debug!(
                message = "Discarding incomplete octet counted frame at end of stream",
                bytes = buf.len(),
                expected = self.pending,
            );

            buf.clear();
            self.pending = None;
        }

        Ok(None)
    }
}
