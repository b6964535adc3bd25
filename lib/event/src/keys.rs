//! Field names of the mapping returned by [`SyslogRecord::to_map`].
//!
//! [`SyslogRecord::to_map`]: crate::SyslogRecord::to_map

pub const FACILITY: &str = "FACILITY";
pub const SEVERITY: &str = "SEVERITY";
pub const TIMESTAMP: &str = "TIMESTAMP";
pub const HOST: &str = "HOST";
pub const TAG: &str = "TAG";
pub const MESSAGE: &str = "MESSAGE";

// structured variant only
pub const VERSION: &str = "VERSION";
pub const APP_NAME: &str = "APP_NAME";
pub const MSGID: &str = "MSGID";
pub const STRUCTURED_DATA: &str = "STRUCTURED_DATA";

pub const PROCID: &str = "PROCID";
pub const SOURCE_IP: &str = "SOURCE_IP";
