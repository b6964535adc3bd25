use std::net::SocketAddr;

use bytes::Bytes;
use codecs::decoding::Origin;
use socket2::SockRef;
use tokio::net::UdpSocket;

use super::SourceContext;
use crate::error::TransportError;

// The largest payload a UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65535;

pub async fn bind(
    addr: SocketAddr,
    receive_buffer_bytes: Option<usize>,
) -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            protocol: "udp",
            addr,
            source,
        })?;

    if let Some(receive_buffer_bytes) = receive_buffer_bytes
        && let Err(err) = SockRef::from(&socket).set_recv_buffer_size(receive_buffer_bytes)
    {
        warn!(
            message = "Failed configure receive buffer size on UDP socket",
            %err
        );
    }

    Ok(socket)
}

/// Every datagram is one message. Runs until shutdown or the first receive
/// error.
pub async fn serve(socket: UdpSocket, cx: SourceContext) {
    let addr = socket.local_addr().ok();

    info!(
        message = "listening",
        addr = ?addr,
        r#type = "udp"
    );

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (size, peer) = tokio::select! {
            _ = cx.shutdown.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(err) => {
                    error!(
                        message = "Error reading datagram, stop listening",
                        %err
                    );

                    return;
                }
            }
        };

        cx.handle_frame(
            Bytes::copy_from_slice(&buf[..size]),
            &Origin::peer(peer.ip()),
        );
    }

    info!(message = "UDP listener stopped", addr = ?addr);
}
