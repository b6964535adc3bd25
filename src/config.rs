use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use codecs::decoding::{Rfc, SyslogDeserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path:?} failed, {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config failed, {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config, {0}")]
    Invalid(&'static str),
}

/// The transports to listen on.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Both,
}

impl Protocol {
    #[inline]
    pub const fn tcp(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Both)
    }

    #[inline]
    pub const fn udp(&self) -> bool {
        matches!(self, Protocol::Udp | Protocol::Both)
    }
}

/// How TCP connections are served. Both behave the same, they only differ
/// in what a connection costs.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// One thread per connection, reading with blocking IO.
    Blocking,

    /// One task per connection on the async runtime.
    #[default]
    NonBlocking,
}

const fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    1514
}

const fn default_buffer_size() -> usize {
    2048
}

const fn default_lossy() -> bool {
    true
}

const fn default_channel_capacity() -> usize {
    1024
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listen on TCP, UDP or both.
    #[serde(default)]
    pub protocol: Protocol,

    /// The address to bind, the same for every transport.
    #[serde(default = "default_address")]
    pub address: IpAddr,

    /// The port to bind, the same for every transport. 0 picks an ephemeral
    /// port per transport.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The maximum size of one message frame on TCP.
    #[serde(default = "default_buffer_size", with = "humanize::bytes::serde")]
    pub buffer_size: usize,

    /// Close TCP connections that stay silent this long.
    #[serde(default, with = "humanize::duration::serde_option")]
    pub socket_timeout: Option<Duration>,

    /// The grammar messages are parsed with, this also picks the framing
    /// of TCP streams.
    #[serde(default)]
    pub rfc: Rfc,

    /// Use the name the TCP peer address resolves to as host of records.
    #[serde(default)]
    pub reverse_lookup: bool,

    #[serde(default)]
    pub transport: Transport,

    /// Replace invalid UTF-8 instead of dropping the message.
    #[serde(default = "default_lossy")]
    pub lossy: bool,

    /// How many records a slow subscriber may fall behind before it starts
    /// missing some.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Configures the receive buffer size using the "SO_RCVBUF" option on the socket.
    #[serde(default, with = "humanize::bytes::serde_option")]
    pub receive_buffer_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            address: default_address(),
            port: default_port(),
            buffer_size: default_buffer_size(),
            socket_timeout: None,
            rfc: Rfc::default(),
            reverse_lookup: false,
            transport: Transport::default(),
            lossy: default_lossy(),
            channel_capacity: default_channel_capacity(),
            receive_buffer_bytes: None,
        }
    }
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be greater than 0"));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be greater than 0",
            ));
        }

        if self.socket_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::Invalid("socket_timeout must not be 0"));
        }

        Ok(())
    }

    #[inline]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn deserializer(&self) -> SyslogDeserializer {
        SyslogDeserializer::new(self.rfc, self.lossy)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config = serde_yaml::from_str::<Config>(s)?;
        config.validate()?;

        Ok(config)
    }
}
