use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use event::{StructuredData, SyslogRecord};
use pretty_assertions::assert_eq;
use rand::Rng;
use rand::distr::Alphanumeric;
use syslog_supplier::{Config, Protocol, State, SyslogSupplier, Transport};
use testify::{
    assert_quiet, collect_n, collect_one, next_addr, send_datagrams, send_lines,
    send_octet_counted, wait_until_refused,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
enum Facility {
    Kernel,
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
}

fn encode_priority(severity: Severity, facility: Facility) -> u8 {
    ((facility as u8) << 3) | severity as u8
}

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_structured_data(max_children: usize, max_params: usize) -> StructuredData {
    let mut rng = rand::rng();
    let amount = rng.random_range(0..=max_children);

    (0..amount)
        .map(|i| {
            let params = (0..rng.random_range(1..=max_params))
                .map(|j| (format!("key{j}"), random_string(8)))
                .collect();

            (format!("id{i}@32473"), params)
        })
        .collect()
}

#[derive(Clone, Debug)]
struct SyslogMessageRfc5424 {
    severity: Severity,
    facility: Facility,
    timestamp: String,
    host: String,
    app_name: String,
    proc_id: usize,
    msg_id: String,
    structured_data: StructuredData,
    message: String,
}

impl SyslogMessageRfc5424 {
    fn random(id: usize, msg_len: usize) -> Self {
        Self {
            severity: Severity::Info,
            facility: Facility::User,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            host: "localhost.localdomain".to_string(),
            app_name: "harry".to_string(),
            proc_id: rand::rng().random_range(0..32768),
            msg_id: format!("test{id}"),
            structured_data: random_structured_data(3, 3),
            message: random_string(msg_len),
        }
    }

    fn assert_record(&self, record: &SyslogRecord) {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(record.raw, self.to_string());
        assert_eq!(record.facility, Some(self.facility as u8));
        assert_eq!(record.severity, Some(self.severity as u8));
        assert_eq!(record.version, Some(1));
        assert_eq!(record.timestamp, Some(timestamp));
        assert_eq!(record.host, self.host);
        assert_eq!(record.app_name.as_deref(), Some(self.app_name.as_str()));
        assert_eq!(record.proc_id, Some(self.proc_id.to_string()));
        assert_eq!(record.msg_id.as_deref(), Some(self.msg_id.as_str()));
        assert_eq!(record.structured_data, self.structured_data);
        assert_eq!(record.message, self.message);
        assert_eq!(record.source_ip, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }
}

impl fmt::Display for SyslogMessageRfc5424 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{}>1 {} {} {} {} {} {} {}",
            encode_priority(self.severity, self.facility),
            self.timestamp,
            self.host,
            self.app_name,
            self.proc_id,
            self.msg_id,
            format_structured_data(&self.structured_data),
            self.message
        )
    }
}

fn format_structured_data(data: &StructuredData) -> String {
    if data.is_empty() {
        return "-".to_string();
    }

    let mut res = String::new();
    for (id, params) in data {
        res = res + "[" + id;
        for (name, value) in params {
            res = res + " " + name + "=\"" + value + "\"";
        }
        res += "]";
    }

    res
}

fn legacy_line(host: &str, tag: &str, pid: u32, message: &str) -> String {
    format!("<13>Feb  5 17:32:18 {host} {tag}[{pid}]: {message}")
}

fn config(protocol: Protocol, addr: SocketAddr) -> Config {
    Config {
        protocol,
        address: addr.ip(),
        port: addr.port(),
        ..Default::default()
    }
}

fn trace_init() {
    syslog_supplier::trace::init(false, false, "debug");
}

// The peer closes either cleanly or with a reset, when it had unread data.
async fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];

    match tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => panic!("unexpected {n} bytes from server"),
        Err(_) => panic!("connection is still open"),
    }
}

#[tokio::test]
async fn tcp_structured_octet_counted() {
    trace_init();

    let num = 200;
    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.rfc = codecs::decoding::Rfc::Rfc5424;
    config.buffer_size = 4096;

    let supplier = SyslogSupplier::new(config);
    let records = supplier.subscribe().await.unwrap();

    let input = (0..num)
        .map(|i| SyslogMessageRfc5424::random(i, 30))
        .collect::<Vec<_>>();
    send_octet_counted(addr, input.iter().map(ToString::to_string)).await;

    let output = collect_n(records, num).await;
    assert_eq!(output.len(), num);
    for (msg, record) in input.iter().zip(&output) {
        msg.assert_record(record);
    }

    supplier.shutdown();
}

#[tokio::test]
async fn tcp_legacy_lines() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Tcp, addr));
    let records = supplier.subscribe().await.unwrap();

    let lines = (0..10)
        .map(|i| legacy_line("WEBERN", "TESTPROG", 8710 + i, &format!("message {i}")))
        .collect::<Vec<_>>();
    send_lines(addr, lines).await;

    let output = collect_n(records, 10).await;
    for (i, record) in output.iter().enumerate() {
        assert_eq!(record.host, "WEBERN");
        assert_eq!(record.facility, Some(1));
        assert_eq!(record.severity, Some(5));
        assert_eq!(record.app_name.as_deref(), Some("TESTPROG"));
        assert_eq!(record.proc_id, Some((8710 + i).to_string()));
        assert_eq!(record.message, format!("message {i}"));
        assert_eq!(record.version, None);
    }

    supplier.shutdown();
}

#[tokio::test]
async fn udp_datagrams() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Udp, addr));
    let records = supplier.subscribe().await.unwrap();
    assert_eq!(supplier.listeners().unwrap().udp, Some(addr));

    // loopback does not drop datagrams, but they may be reordered
    let lines = (0..5)
        .map(|i| legacy_line("mymachine", "su", i, "'su root' failed"))
        .collect::<Vec<_>>();
    send_datagrams(addr, lines).await;

    let mut pids = collect_n(records, 5)
        .await
        .into_iter()
        .map(|record| {
            assert_eq!(record.host, "mymachine");
            assert_eq!(record.message, "'su root' failed");
            record.proc_id.clone().unwrap()
        })
        .collect::<Vec<_>>();
    pids.sort();
    assert_eq!(pids, vec!["0", "1", "2", "3", "4"]);

    supplier.shutdown();
}

#[tokio::test]
async fn both_protocols_share_one_stream() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Both, addr));
    let mut records = supplier.subscribe().await.unwrap();

    let listeners = supplier.listeners().unwrap();
    assert_eq!(listeners.tcp, Some(addr));
    assert_eq!(listeners.udp, Some(addr));

    send_lines(addr, vec![legacy_line("tcp-host", "app", 1, "over tcp")]).await;
    let record = collect_one(&mut records).await;
    assert_eq!(record.host, "tcp-host");

    send_datagrams(addr, vec![legacy_line("udp-host", "app", 2, "over udp")]).await;
    let record = collect_one(&mut records).await;
    assert_eq!(record.host, "udp-host");

    supplier.shutdown();
}

#[tokio::test]
async fn nothing_bound_before_subscribe() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Tcp, addr));

    assert_eq!(supplier.state(), State::Inactive);
    assert!(TcpStream::connect(addr).await.is_err());

    let _records = supplier.subscribe().await.unwrap();

    assert_eq!(supplier.state(), State::Active);
    TcpStream::connect(addr).await.unwrap();

    supplier.shutdown();
}

#[tokio::test]
async fn malformed_connection_does_not_affect_others() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.rfc = codecs::decoding::Rfc::Rfc5424;
    let supplier = SyslogSupplier::new(config);
    let mut records = supplier.subscribe().await.unwrap();

    let mut bad = TcpStream::connect(addr).await.unwrap();
    let mut good = TcpStream::connect(addr).await.unwrap();

    // not a length prefix, the connection cannot be framed
    bad.write_all(b"garbage 3 foo").await.unwrap();

    let msg = "<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut=\"3\"] An application event";
    good.write_all(format!("{} {msg}", msg.len()).as_bytes())
        .await
        .unwrap();

    let record = collect_one(&mut records).await;
    assert_eq!(record.host, "mymachine.example.com");
    assert_eq!(record.app_name.as_deref(), Some("evntslog"));
    assert_eq!(record.proc_id, None);
    assert_eq!(record.message, "An application event");

    assert_closed(&mut bad).await;

    // a frame that parses badly only drops itself
    good.write_all(b"9 <13>1 bad").await.unwrap();
    good.write_all(format!("{} {msg}", msg.len()).as_bytes())
        .await
        .unwrap();
    let record = collect_one(&mut records).await;
    assert_eq!(record.msg_id.as_deref(), Some("ID47"));

    supplier.shutdown();
}

#[tokio::test]
async fn oversized_frame_closes_connection() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.buffer_size = 64;
    let supplier = SyslogSupplier::new(config);
    let mut records = supplier.subscribe().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[b'x'; 128]).await.unwrap();
    assert_closed(&mut stream).await;
    assert_quiet(&mut records, Duration::from_millis(100)).await;

    // the listener itself keeps going
    send_lines(addr, vec![legacy_line("WEBERN", "TESTPROG", 1, "still here")]).await;
    let record = collect_one(&mut records).await;
    assert_eq!(record.message, "still here");

    supplier.shutdown();
}

#[tokio::test]
async fn idle_connection_is_closed() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.socket_timeout = Some(Duration::from_millis(200));
    let supplier = SyslogSupplier::new(config);
    let _records = supplier.subscribe().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    assert_closed(&mut stream).await;

    supplier.shutdown();
}

#[tokio::test]
async fn blocking_transport() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.transport = Transport::Blocking;
    config.socket_timeout = Some(Duration::from_millis(500));
    let supplier = SyslogSupplier::new(config);
    let mut records = supplier.subscribe().await.unwrap();

    // fragmented writes are framed the same way
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let line = legacy_line("WEBERN", "TESTPROG", 8710, "TEST MESSAGE") + "\n";
    let (head, tail) = line.split_at(10);
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(tail.as_bytes()).await.unwrap();

    let record = collect_one(&mut records).await;
    assert_eq!(record.host, "WEBERN");
    assert_eq!(record.message, "TEST MESSAGE");

    // the read timeout applies too
    assert_closed(&mut stream).await;

    supplier.shutdown();
}

#[test]
fn idle_blocking_connection_does_not_starve_others() {
    trace_init();

    // a single blocking thread, so connections must not be served from
    // the blocking pool
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let addr = next_addr();
        let mut config = config(Protocol::Tcp, addr);
        config.transport = Transport::Blocking;
        config.socket_timeout = None;
        let supplier = SyslogSupplier::new(config);
        let mut records = supplier.subscribe().await.unwrap();

        let mut idle = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        send_lines(addr, vec![legacy_line("WEBERN", "TESTPROG", 2, "second")]).await;
        let record = collect_one(&mut records).await;
        assert_eq!(record.message, "second");

        // nothing times the idle one out, only shutdown ends it
        supplier.shutdown();
        assert_closed(&mut idle).await;
    });
}

#[tokio::test]
async fn shutdown_closes_blocking_connections() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.transport = Transport::Blocking;
    let supplier = SyslogSupplier::new(config);
    let mut records = supplier.subscribe().await.unwrap();

    let mut open = TcpStream::connect(addr).await.unwrap();
    open.write_all(legacy_line("WEBERN", "TESTPROG", 1, "before\n").as_bytes())
        .await
        .unwrap();
    let record = collect_one(&mut records).await;
    assert_eq!(record.message, "before");

    supplier.shutdown();
    assert_closed(&mut open).await;
    wait_until_refused(addr).await;
}

#[tokio::test]
async fn udp_runs_when_tcp_port_is_taken() {
    trace_init();

    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    let supplier = SyslogSupplier::new(config(Protocol::Both, addr));
    let mut records = supplier.subscribe().await.unwrap();
    assert_eq!(supplier.state(), State::Active);

    let listeners = supplier.listeners().unwrap();
    assert_eq!(listeners.tcp, None);
    assert_eq!(listeners.udp, Some(addr));

    send_datagrams(addr, vec![legacy_line("WEBERN", "TESTPROG", 1, "over udp")]).await;
    let record = collect_one(&mut records).await;
    assert_eq!(record.host, "WEBERN");
    assert_eq!(record.message, "over udp");

    supplier.shutdown();
}

#[tokio::test]
async fn cancelled_subscriber_leaves_listeners_bound() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Tcp, addr));

    let records = supplier.subscribe().await.unwrap();
    drop(records);
    assert_eq!(supplier.channel().subscribers(), 0);
    assert_eq!(supplier.state(), State::Active);

    // records without a subscriber are lost
    send_lines(addr, vec![legacy_line("WEBERN", "TESTPROG", 1, "lost")]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut records = supplier.subscribe().await.unwrap();
    send_lines(addr, vec![legacy_line("WEBERN", "TESTPROG", 2, "seen")]).await;

    let record = collect_one(&mut records).await;
    assert_eq!(record.message, "seen");

    supplier.shutdown();
}

#[tokio::test]
async fn reverse_lookup_replaces_host() {
    trace_init();

    let addr = next_addr();
    let mut config = config(Protocol::Tcp, addr);
    config.reverse_lookup = true;
    let supplier = SyslogSupplier::new(config);
    let mut records = supplier.subscribe().await.unwrap();

    send_lines(addr, vec![legacy_line("WEBERN", "TESTPROG", 1, "hello")]).await;

    // the resolved name, or the peer address when nothing resolves
    let record = collect_one(&mut records).await;
    assert_ne!(record.host, "WEBERN");
    assert!(!record.host.is_empty());

    supplier.shutdown();
}

#[tokio::test]
async fn shutdown_stops_listeners() {
    trace_init();

    let addr = next_addr();
    let supplier = SyslogSupplier::new(config(Protocol::Tcp, addr));
    let _records = supplier.subscribe().await.unwrap();

    let mut open = TcpStream::connect(addr).await.unwrap();
    // make sure the connection is being served before shutdown
    open.write_all(legacy_line("WEBERN", "TESTPROG", 1, "before\n").as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    supplier.shutdown();
    assert_closed(&mut open).await;

    wait_until_refused(addr).await;
}
