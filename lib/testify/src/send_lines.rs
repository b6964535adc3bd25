use std::net::SocketAddr;

use bytes::{BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::codec::{Encoder, FramedWrite, LinesCodec};

/// Sends `lines` over one TCP connection, each terminated by `\n`, then
/// shuts the write half down.
pub async fn send_lines(addr: SocketAddr, lines: impl IntoIterator<Item = String>) {
    send_encodable(addr, LinesCodec::new(), lines).await
}

/// Sends `messages` over one TCP connection with octet counting framing,
/// `MSG-LEN SP MSG`.
pub async fn send_octet_counted(addr: SocketAddr, messages: impl IntoIterator<Item = String>) {
    send_encodable(addr, OctetCountingCodec, messages).await
}

pub async fn send_encodable<I, E: From<std::io::Error> + std::fmt::Debug>(
    addr: SocketAddr,
    encoder: impl Encoder<I, Error = E>,
    lines: impl IntoIterator<Item = I>,
) {
    let stream = TcpStream::connect(&addr).await.unwrap();
    let mut sink = FramedWrite::new(stream, encoder);

    let mut lines = futures::stream::iter(lines).map(Ok);
    sink.send_all(&mut lines).await.unwrap();

    let stream = sink.get_mut();
    stream.shutdown().await.unwrap();
}

/// Sends every message as one datagram.
pub async fn send_datagrams(addr: SocketAddr, messages: impl IntoIterator<Item = String>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    for msg in messages {
        socket.send_to(msg.as_bytes(), addr).await.unwrap();
    }
}

struct OctetCountingCodec;

impl Encoder<String> for OctetCountingCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let prefix = format!("{} ", item.len());

        dst.reserve(prefix.len() + item.len());
        dst.put(prefix.as_bytes());
        dst.put(item.as_bytes());

        Ok(())
    }
}
