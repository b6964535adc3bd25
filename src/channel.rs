use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use event::SyslogRecord;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// A multicast channel of records. Every subscriber sees every record
/// published after it subscribed, in publish order. Records published
/// while nobody listens are gone.
#[derive(Clone, Debug)]
pub struct RecordChannel {
    tx: broadcast::Sender<Arc<SyslogRecord>>,
}

impl RecordChannel {
    /// `capacity` is how far the slowest subscriber may fall behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));

        Self { tx }
    }

    /// Returns the number of subscribers the record was handed to.
    pub fn publish(&self, record: SyslogRecord) -> usize {
        match self.tx.send(Arc::new(record)) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!(message = "No subscriber, record dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> RecordStream {
        RecordStream {
            inner: BroadcastStream::new(self.tx.subscribe()),
        }
    }

    #[inline]
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

pin_project! {
    /// The receiving end of a [`RecordChannel`].
    ///
    /// A subscriber that lags behind skips the records it missed and keeps
    /// going. Dropping the stream unsubscribes.
    pub struct RecordStream {
        #[pin]
        inner: BroadcastStream<Arc<SyslogRecord>>,
    }
}

impl Stream for RecordStream {
    type Item = Arc<SyslogRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(record)) => return Poll::Ready(Some(record)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(message = "Subscriber lagged behind, records skipped", skipped);
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
