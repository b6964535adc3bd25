//! Receives syslog messages over TCP and UDP, and hands them to subscribers
//! as a stream of [`SyslogRecord`]s.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use futures::StreamExt;
//! use syslog_supplier::{Config, SyslogSupplier};
//!
//! let supplier = SyslogSupplier::new("protocol: both\nport: 5140".parse::<Config>()?);
//! let mut records = supplier.subscribe().await?;
//! while let Some(record) = records.next().await {
//!     println!("{} {}", record.host, record.message);
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod channel;
pub mod config;
pub mod sources;
pub mod trace;

mod dns;
mod error;
mod supplier;

pub use channel::{RecordChannel, RecordStream};
pub use config::{Config, ConfigError, Protocol, Transport};
pub use error::TransportError;
pub use event::SyslogRecord;
pub use supplier::{Listeners, State, SyslogSupplier};
