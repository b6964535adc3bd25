use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::channel::{RecordChannel, RecordStream};
use crate::config::Config;
use crate::error::TransportError;
use crate::sources::syslog::{SourceContext, tcp, udp};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Nothing is bound yet.
    Inactive,
    /// Listeners are bound and publishing.
    Active,
}

/// The addresses the listeners actually bound, which differ from the
/// configured ones when port 0 is used.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Listeners {
    pub tcp: Option<SocketAddr>,
    pub udp: Option<SocketAddr>,
}

struct Inner {
    config: Arc<Config>,
    channel: RecordChannel,
    listeners: OnceCell<Listeners>,
    shutdown: CancellationToken,
}

/// A lazily started source of syslog records.
///
/// Nothing is bound until the first call to [`subscribe`](Self::subscribe),
/// which starts every listener the protocol asks for. Later subscribers
/// join the running listeners. The listeners keep running when subscribers
/// go away, only [`shutdown`](Self::shutdown) stops them.
#[derive(Clone)]
pub struct SyslogSupplier {
    inner: Arc<Inner>,
}

impl SyslogSupplier {
    pub fn new(config: Config) -> Self {
        let channel = RecordChannel::new(config.channel_capacity);

        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                channel,
                listeners: OnceCell::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Returns a stream of every record accepted from now on. The first call
    /// binds the listeners and returns once they are reachable, concurrent
    /// first calls wait for the same activation.
    pub async fn subscribe(&self) -> Result<RecordStream, TransportError> {
        // registered before activation, so no record published after
        // binding is missed
        let stream = self.inner.channel.subscribe();

        self.inner
            .listeners
            .get_or_try_init(|| self.activate())
            .await?;

        Ok(stream)
    }

    pub fn state(&self) -> State {
        if self.inner.listeners.initialized() {
            State::Active
        } else {
            State::Inactive
        }
    }

    /// The bound addresses, once active.
    pub fn listeners(&self) -> Option<Listeners> {
        self.inner.listeners.get().copied()
    }

    #[inline]
    pub fn channel(&self) -> &RecordChannel {
        &self.inner.channel
    }

    /// Stops the accept loop, the UDP listener and every open connection.
    /// Meant for process teardown, the supplier cannot be activated again
    /// afterwards.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    async fn activate(&self) -> Result<Listeners, TransportError> {
        let config = &self.inner.config;
        let addr = config.listen_addr();

        let mut first_err = None;
        let mut tcp_listener = None;
        let mut udp_socket = None;

        if config.protocol.tcp() {
            match tcp::bind(addr).await {
                Ok(listener) => tcp_listener = Some(listener),
                Err(err) => {
                    error!(message = "Failed to start TCP listener", %err);
                    first_err.get_or_insert(err);
                }
            }
        }

        if config.protocol.udp() {
            match udp::bind(addr, config.receive_buffer_bytes).await {
                Ok(socket) => udp_socket = Some(socket),
                Err(err) => {
                    error!(message = "Failed to start UDP listener", %err);
                    first_err.get_or_insert(err);
                }
            }
        }

        // one transport is enough to go on with
        if tcp_listener.is_none()
            && udp_socket.is_none()
            && let Some(err) = first_err
        {
            return Err(err);
        }

        let cx = SourceContext::new(
            Arc::clone(config),
            self.inner.channel.clone(),
            self.inner.shutdown.clone(),
        );

        let mut listeners = Listeners::default();
        if let Some(listener) = tcp_listener {
            listeners.tcp = listener.local_addr().ok();
            tokio::spawn(tcp::serve(listener, cx.clone()));
        }
        if let Some(socket) = udp_socket {
            listeners.udp = socket.local_addr().ok();
            tokio::spawn(udp::serve(socket, cx));
        }

        info!(
            message = "Syslog supplier activated",
            tcp = ?listeners.tcp,
            udp = ?listeners.udp,
            rfc = config.rfc.as_str(),
        );

        Ok(listeners)
    }
}
