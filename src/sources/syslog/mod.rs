//! The listeners feeding syslog messages into a [`RecordChannel`].

pub mod tcp;
pub mod udp;

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use codecs::FramingError;
use codecs::decoding::{Framer, Origin, SyslogDeserializer};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;

use crate::channel::RecordChannel;
use crate::config::Config;

/// Everything a listener needs besides its socket.
#[derive(Clone)]
pub struct SourceContext {
    pub config: Arc<Config>,
    pub output: RecordChannel,
    pub shutdown: CancellationToken,

    deserializer: SyslogDeserializer,
}

impl SourceContext {
    pub fn new(config: Arc<Config>, output: RecordChannel, shutdown: CancellationToken) -> Self {
        let deserializer = config.deserializer();

        Self {
            config,
            output,
            shutdown,
            deserializer,
        }
    }

    /// Converts one frame and publishes the record. A malformed frame is
    /// logged and dropped.
    pub fn handle_frame(&self, frame: Bytes, origin: &Origin) {
        match self.deserializer.parse(frame, origin) {
            Ok(record) => {
                self.output.publish(record);
            }
            Err(err) => {
                warn!(
                    message = "Discarding malformed syslog message",
                    %err,
                    peer = ?origin.peer,
                );
            }
        }
    }

    /// Publishes every complete frame in `buf`. With `eof` set the stream
    /// ended, and whatever is left in `buf` is never completed.
    ///
    /// An error means the stream cannot be framed any more, the connection
    /// has to be closed.
    pub fn drain_frames(
        &self,
        framer: &mut Framer,
        buf: &mut BytesMut,
        origin: &Origin,
        eof: bool,
    ) -> Result<(), FramingError> {
        loop {
            let frame = if eof {
                framer.decode_eof(buf)?
            } else {
                framer.decode(buf)?
            };

            match frame {
                Some(frame) => self.handle_frame(frame, origin),
                None => return Ok(()),
            }
        }
    }
}
