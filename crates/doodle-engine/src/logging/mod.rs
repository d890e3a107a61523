//! Logging utilities.
//!
//! [`init_logging`] configures the global `log` backend once per process.
//! [`LogSink`] is the explicit channel through which graphics components
//! report native diagnostics.

mod init;
mod sink;

pub use init::{init_logging, LoggingConfig};
pub use sink::LogSink;
