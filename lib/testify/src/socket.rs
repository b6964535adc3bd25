use std::net::{Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::time::Duration;

use tokio::net::TcpStream;

// How long a closed listener may keep accepting.
const REFUSE_TIMEOUT: Duration = Duration::from_secs(5);
const REFUSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A loopback address whose port is free on both TCP and UDP, since a
/// syslog listener may bind both at once.
pub fn next_addr() -> SocketAddr {
    loop {
        let tcp = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = tcp.local_addr().unwrap();

        // the OS picked a free TCP port, the UDP one may still be taken
        if UdpSocket::bind(addr).is_ok() {
            return addr;
        }
    }
}

/// Waits until nothing accepts TCP connections on `addr` any more, panics
/// when the listener is still there after a few seconds.
pub async fn wait_until_refused(addr: SocketAddr) {
    let refused = async {
        while TcpStream::connect(addr).await.is_ok() {
            tokio::time::sleep(REFUSE_POLL_INTERVAL).await;
        }
    };

    if tokio::time::timeout(REFUSE_TIMEOUT, refused).await.is_err() {
        panic!("{addr} still accepts connections");
    }
}
