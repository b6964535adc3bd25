//! Deserializers turning one byte frame into a record.

mod syslog;

pub use syslog::{Origin, Rfc, SyslogDeserializer};
