//! The record type produced by the syslog listeners, and the mapping view
//! handed to consumers.

pub mod keys;
mod record;
mod value;

pub use record::{StructuredData, SyslogRecord};
pub use value::Value;
