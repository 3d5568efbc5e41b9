//! Sampling lock-contention monitor for managed runtimes
//!
//! The host runtime reports every contended monitor entry to a
//! [`monitor::ContentionMonitor`], which samples, tallies and describes the
//! event and hands a JSON record to a [`sink::Sink`].

pub mod cli;
pub mod config;
pub mod host;
pub mod logger;
pub mod monitor;
pub mod replay;
pub mod sink;

pub use config::{ConfigError, MonitorConfig};
pub use host::{HostError, HostIntrospection};
pub use monitor::{ContentionMonitor, EventOutcome, SamplingController};
pub use sink::Sink;
