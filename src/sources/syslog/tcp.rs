use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use bytes::BytesMut;
use codecs::decoding::Origin;
use socket2::SockRef;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::SourceContext;
use crate::config::Transport;
use crate::dns;
use crate::error::TransportError;

// Initial capacity of the per connection read buffer, it grows with the
// frames it has to hold.
const READ_BUFFER_SIZE: usize = 4 * 1024;

// Pause after a failed accept, e.g. when the fd limit is reached.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            protocol: "tcp",
            addr,
            source,
        })
}

/// Accepts connections until shutdown, every connection is served on its own.
pub async fn serve(listener: TcpListener, cx: SourceContext) {
    let addr = listener.local_addr().ok();

    info!(
        message = "listening",
        addr = ?addr,
        r#type = "tcp",
        transport = ?cx.config.transport,
    );

    loop {
        let (socket, peer) = tokio::select! {
            _ = cx.shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok(conn) => conn,
                Err(err) => {
                    error!(
                        message = "Failed to accept socket",
                        %err
                    );

                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            }
        };

        debug!(message = "Accepted a new connection", %peer);

        if let Some(receive_buffer_bytes) = cx.config.receive_buffer_bytes
            && let Err(err) = SockRef::from(&socket).set_recv_buffer_size(receive_buffer_bytes)
        {
            warn!(
                message = "Failed configuring receive buffer size on TCP socket",
                %err
            );
        }

        match cx.config.transport {
            Transport::NonBlocking => {
                tokio::spawn(handle_stream(socket, peer, cx.clone()));
            }
            Transport::Blocking => {
                if let Err(err) = spawn_blocking_stream(socket, peer, cx.clone()) {
                    warn!(
                        message = "Failed to serve connection",
                        %peer,
                        %err
                    );
                }
            }
        }
    }

    info!(message = "TCP listener stopped", addr = ?addr);
}

async fn handle_stream(mut socket: TcpStream, peer: SocketAddr, cx: SourceContext) {
    let origin = if cx.config.reverse_lookup {
        Origin::peer(peer.ip()).with_hostname(dns::reverse_lookup_async(peer.ip()).await)
    } else {
        Origin::peer(peer.ip())
    };

    let mut framer = cx.config.rfc.stream_framer(cx.config.buffer_size);
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let timeout = cx.config.socket_timeout;

    loop {
        let result = tokio::select! {
            _ = cx.shutdown.cancelled() => {
                debug!(message = "Closing connection on shutdown", %peer);
                break;
            }
            result = read_buf(&mut socket, &mut buf, timeout) => result,
        };

        let eof = match result {
            Ok(0) => true,
            Ok(_) => false,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                debug!(message = "Closing idle connection", %peer, ?timeout);
                break;
            }
            Err(err) => {
                warn!(message = "Failed to read data from TCP source", %peer, %err);
                break;
            }
        };

        if let Err(err) = cx.drain_frames(&mut framer, &mut buf, &origin, eof) {
            warn!(message = "Failed framing bytes, closing connection", %peer, %err);
            break;
        }

        if eof {
            debug!(message = "Connection closed", %peer);
            break;
        }
    }
}

async fn read_buf(
    socket: &mut TcpStream,
    buf: &mut BytesMut,
    timeout: Option<Duration>,
) -> io::Result<usize> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, socket.read_buf(buf))
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?,
        None => socket.read_buf(buf).await,
    }
}

/// Serves the connection on a dedicated thread with blocking reads. A
/// watcher task shuts the socket down on shutdown, which ends a pending read.
fn spawn_blocking_stream(
    socket: TcpStream,
    peer: SocketAddr,
    cx: SourceContext,
) -> Result<(), TransportError> {
    let (socket, handle) =
        into_blocking(socket, cx.config.socket_timeout).map_err(|source| {
            TransportError::Socket {
                protocol: "tcp",
                source,
            }
        })?;

    // cancelled when the connection thread is gone, for whatever reason
    let closed = CancellationToken::new();
    let guard = closed.clone().drop_guard();
    let shutdown = cx.shutdown.clone();

    std::thread::Builder::new()
        .name(format!("syslog-tcp-{peer}"))
        .spawn(move || {
            let _guard = guard;
            handle_blocking_stream(socket, peer, cx)
        })
        .map_err(|source| TransportError::Socket {
            protocol: "tcp",
            source,
        })?;

    tokio::spawn(async move {
        tokio::select! {
            _ = closed.cancelled() => {}
            _ = shutdown.cancelled() => {
                if let Err(err) = handle.shutdown(Shutdown::Both) {
                    debug!(message = "Failed to shutdown connection", %peer, %err);
                }
            }
        }
    });

    Ok(())
}

/// Returns the blocking socket, and a handle to shut it down from elsewhere.
fn into_blocking(
    socket: TcpStream,
    timeout: Option<Duration>,
) -> io::Result<(std::net::TcpStream, std::net::TcpStream)> {
    let socket = socket.into_std()?;
    socket.set_nonblocking(false)?;
    socket.set_read_timeout(timeout)?;
    let handle = socket.try_clone()?;

    Ok((socket, handle))
}

fn handle_blocking_stream(mut socket: std::net::TcpStream, peer: SocketAddr, cx: SourceContext) {
    let origin = if cx.config.reverse_lookup {
        Origin::peer(peer.ip()).with_hostname(dns::reverse_lookup(peer.ip()))
    } else {
        Origin::peer(peer.ip())
    };

    let mut framer = cx.config.rfc.stream_framer(cx.config.buffer_size);
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut chunk = vec![0u8; READ_BUFFER_SIZE];

    while !cx.shutdown.is_cancelled() {
        let eof = match socket.read(&mut chunk) {
            // the socket was shut down by the watcher
            Ok(0) if cx.shutdown.is_cancelled() => break,
            Ok(0) => true,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                false
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                debug!(
                    message = "Closing idle connection",
                    %peer,
                    timeout = ?cx.config.socket_timeout
                );
                return;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                if !cx.shutdown.is_cancelled() {
                    warn!(message = "Failed to read data from TCP source", %peer, %err);
                }
                return;
            }
        };

        if let Err(err) = cx.drain_frames(&mut framer, &mut buf, &origin, eof) {
            warn!(message = "Failed framing bytes, closing connection", %peer, %err);
            return;
        }

        if eof {
            debug!(message = "Connection closed", %peer);
            return;
        }
    }

    debug!(message = "Closing connection on shutdown", %peer);
}
