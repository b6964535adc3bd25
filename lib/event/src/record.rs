use std::collections::BTreeMap;
use std::net::IpAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::Value;
use crate::keys;

/// Structured data elements keyed by SD-ID, each holding its parameters in
/// wire order.
pub type StructuredData = IndexMap<String, IndexMap<String, String>>;

/// One parsed syslog message.
///
/// `raw` and `host` are always set, everything else depends on the grammar
/// the message was parsed with. Records are handed out behind an `Arc` and
/// never mutated after the converter built them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyslogRecord {
    /// The frame exactly as it was received.
    pub raw: Bytes,

    pub facility: Option<u8>,
    pub severity: Option<u8>,

    /// Protocol version, only present for RFC 5424 messages.
    pub version: Option<u8>,

    pub timestamp: Option<DateTime<Utc>>,

    pub host: String,

    /// The TAG of an RFC 3164 message, or the APP-NAME of an RFC 5424 message.
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,

    pub structured_data: StructuredData,

    pub message: String,

    /// The address of the peer this message was received from.
    pub source_ip: Option<IpAddr>,
}

impl SyslogRecord {
    #[inline]
    pub fn is_structured(&self) -> bool {
        self.version.is_some()
    }

    /// Builds the key/value view of this record. Absent fields are omitted.
    pub fn to_map(&self) -> BTreeMap<&'static str, Value> {
        let mut map = BTreeMap::new();

        if let Some(facility) = self.facility {
            map.insert(keys::FACILITY, facility.into());
        }
        if let Some(severity) = self.severity {
            map.insert(keys::SEVERITY, severity.into());
        }
        if let Some(timestamp) = self.timestamp {
            map.insert(keys::TIMESTAMP, timestamp.into());
        }

        map.insert(keys::HOST, self.host.as_str().into());

        if let Some(app_name) = &self.app_name {
            let key = if self.is_structured() {
                keys::APP_NAME
            } else {
                keys::TAG
            };
            map.insert(key, app_name.as_str().into());
        }
        if let Some(proc_id) = &self.proc_id {
            map.insert(keys::PROCID, proc_id.as_str().into());
        }

        map.insert(keys::MESSAGE, self.message.as_str().into());

        if let Some(version) = self.version {
            map.insert(keys::VERSION, version.into());

            if let Some(msg_id) = &self.msg_id {
                map.insert(keys::MSGID, msg_id.as_str().into());
            }

            if !self.structured_data.is_empty() {
                let elements = self
                    .structured_data
                    .iter()
                    .map(|(id, params)| {
                        let params = params
                            .iter()
                            .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
                            .collect::<BTreeMap<_, _>>();

                        (id.clone(), Value::Object(params))
                    })
                    .collect::<BTreeMap<_, _>>();

                map.insert(keys::STRUCTURED_DATA, Value::Object(elements));
            }
        }

        if let Some(ip) = self.source_ip {
            map.insert(keys::SOURCE_IP, ip.to_string().into());
        }

        map
    }
}

impl Serialize for SyslogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.to_map())
    }
}
