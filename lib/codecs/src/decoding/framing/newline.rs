use bytes::{Bytes, BytesMut};
use memchr::memchr;
use tokio_util::codec::Decoder;

use super::FramingError;

/// A codec for handling bytes that are delimited by (a) newlines
///
/// Unlike a lossy line codec, an unterminated line longer than `max_length`
/// is an error, no partial frame is ever handed out.
#[derive(Debug, Clone)]
pub struct NewlineDelimitedDecoder {
    max_length: usize,

    // Bytes before this index have been scanned already and hold no delimiter.
    next_index: usize,
}

impl NewlineDelimitedDecoder {
    /// Creates a `NewlineDelimitedDecoder` with a maximum frame length limit.
    ///
    /// This length does *not* include the trailing delimiter
    pub const fn new_with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }
}

impl Decoder for NewlineDelimitedDecoder {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // a delimiter further away than `max_length` can never end a valid frame
        let read_to = self.max_length.saturating_add(1).min(src.len());
        let start = self.next_index.min(read_to);

        match memchr(b'\n', &src[start..read_to]) {
            Some(offset) => {
                let index = start + offset;
                self.next_index = 0;

                let mut frame = src.split_to(index + 1);
                frame.truncate(index);

                Ok(Some(frame.freeze()))
            }
            None if src.len() > self.max_length => {
                self.next_index = 0;

                Err(FramingError::FrameTooLarge {
                    length: src.len(),
                    max_length: self.max_length,
                })
            }
            None => {
                self.next_index = read_to;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if !buf.is_empty() {
            debug!(
                message = "Discarding unterminated frame at end of stream",
                bytes = buf.len()
            );

            buf.clear();
            self.next_index = 0;
        }

        Ok(None)
    }
}
