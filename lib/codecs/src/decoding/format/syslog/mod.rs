mod rfc3164;
mod rfc5424;

use std::borrow::Cow;
use std::fmt::Formatter;
use std::net::IpAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use event::{StructuredData, SyslogRecord};
use serde::de::{Error, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decoding::DeserializeError;

/// The grammar syslog frames are parsed with.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Rfc {
    /// BSD syslog, `<PRI>Mmm dd hh:mm:ss HOST TAG: MSG`
    #[default]
    Rfc3164,

    /// Structured syslog, `<PRI>VERSION TIMESTAMP HOST APP PROCID MSGID SD MSG`
    Rfc5424,
}

impl Rfc {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rfc::Rfc3164 => "3164",
            Rfc::Rfc5424 => "5424",
        }
    }
}

impl<'de> Deserialize<'de> for Rfc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RfcVisitor;

        impl Visitor<'_> for RfcVisitor {
            type Value = Rfc;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str(r#"3164, 5424, "legacy" or "structured""#)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match v {
                    3164 => Ok(Rfc::Rfc3164),
                    5424 => Ok(Rfc::Rfc5424),
                    _ => Err(Error::invalid_value(Unexpected::Signed(v), &self)),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match v {
                    3164 => Ok(Rfc::Rfc3164),
                    5424 => Ok(Rfc::Rfc5424),
                    _ => Err(Error::invalid_value(Unexpected::Unsigned(v), &self)),
                }
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match v.to_ascii_lowercase().as_str() {
                    "3164" | "rfc3164" | "legacy" => Ok(Rfc::Rfc3164),
                    "5424" | "rfc5424" | "structured" => Ok(Rfc::Rfc5424),
                    _ => Err(Error::unknown_variant(v, &["3164", "5424"])),
                }
            }
        }

        deserializer.deserialize_any(RfcVisitor)
    }
}

impl Serialize for Rfc {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Where a frame came from.
#[derive(Clone, Debug, Default)]
pub struct Origin {
    /// The address of the sending peer.
    pub peer: Option<IpAddr>,

    /// The name the peer address resolved to, when reverse lookup is enabled.
    /// It takes precedence over the host reported in the message.
    pub hostname: Option<String>,
}

impl Origin {
    pub fn peer(ip: IpAddr) -> Self {
        Self {
            peer: Some(ip),
            hostname: None,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

/// Deserializer that builds a `SyslogRecord` from a byte frame containing
/// a syslog message.
#[derive(Clone, Debug)]
pub struct SyslogDeserializer {
    rfc: Rfc,
    lossy: bool,
}

impl SyslogDeserializer {
    pub const fn new(rfc: Rfc, lossy: bool) -> Self {
        Self { rfc, lossy }
    }

    /// Parses one frame. `raw` of the returned record is `frame` as is.
    pub fn parse(&self, frame: Bytes, origin: &Origin) -> Result<SyslogRecord, DeserializeError> {
        let line = if self.lossy {
            String::from_utf8_lossy(&frame)
        } else {
            Cow::from(std::str::from_utf8(&frame)?)
        };

        let parsed = match self.rfc {
            Rfc::Rfc3164 => rfc3164::parse(line.trim())?,
            Rfc::Rfc5424 => rfc5424::parse(line.trim())?,
        };

        Ok(convert(parsed, frame.clone(), origin))
    }
}

/// The fields of a syslog message, borrowed from the frame they were
/// parsed from.
#[derive(Debug, Default)]
struct Message<'a> {
    priority: Option<u8>,
    version: Option<u8>,
    timestamp: Option<DateTime<Utc>>,
    hostname: Option<&'a str>,
    app_name: Option<&'a str>,
    proc_id: Option<&'a str>,
    msg_id: Option<&'a str>,
    structured_data: StructuredData,
    msg: &'a str,
}

fn convert(parsed: Message<'_>, raw: Bytes, origin: &Origin) -> SyslogRecord {
    let host = origin
        .hostname
        .clone()
        .or_else(|| parsed.hostname.map(ToString::to_string))
        .or_else(|| origin.peer.map(|ip| ip.to_string()))
        .unwrap_or_default();

    SyslogRecord {
        raw,
        facility: parsed.priority.map(|pri| pri / 8),
        severity: parsed.priority.map(|pri| pri % 8),
        version: parsed.version,
        timestamp: parsed.timestamp,
        host,
        app_name: parsed.app_name.map(ToString::to_string),
        proc_id: parsed.proc_id.map(ToString::to_string),
        msg_id: parsed.msg_id.map(ToString::to_string),
        structured_data: parsed.structured_data,
        message: parsed.msg.to_string(),
        source_ip: origin.peer,
    }
}

// The largest valid PRI, facility 23 and severity 7.
const MAX_PRIORITY: u8 = 191;

/// Parses a leading `<PRI>`, returns `None` if `input` does not start
/// with `<`.
fn priority(input: &str) -> Result<Option<(u8, &str)>, DeserializeError> {
    let Some(rest) = input.strip_prefix('<') else {
        return Ok(None);
    };

    let (digits, rest) = rest
        .split_once('>')
        .ok_or(DeserializeError::Malformed("unterminated priority"))?;
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeserializeError::Malformed("invalid priority"));
    }

    match digits.parse::<u8>() {
        Ok(pri) if pri <= MAX_PRIORITY => Ok(Some((pri, rest))),
        _ => Err(DeserializeError::Malformed("priority out of range")),
    }
}
