pub mod syslog;
