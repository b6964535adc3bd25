use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// A single field of the record mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Bytes - usually representing a UTF8 String,
    Bytes(Bytes),

    /// Integer
    Integer(i64),

    /// Timestamp with UTC
    Timestamp(DateTime<Utc>),

    /// Object
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns self as &BTreeMap<String, Value>, only if self is `Value::Object`
    pub fn as_object(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

fn timestamp_to_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bytes(b) => serializer.serialize_str(String::from_utf8_lossy(b).as_ref()),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Timestamp(ts) => serializer.serialize_str(&timestamp_to_string(ts)),
            Value::Object(o) => serializer.collect_map(o),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(value: BTreeMap<String, Self>) -> Self {
        Self::Object(value)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Value::Bytes(b) => b.as_ref() == other.as_bytes(),
            _ => false,
        }
    }
}
