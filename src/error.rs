use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A socket level failure. It only ever stops the listener it happened on.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bind {protocol} listener on {addr} failed, {source}")]
    Bind {
        protocol: &'static str,
        addr: SocketAddr,
        source: io::Error,
    },

    #[error("configure {protocol} socket failed, {source}")]
    Socket {
        protocol: &'static str,
        source: io::Error,
    },
}
