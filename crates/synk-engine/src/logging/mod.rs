//! Logging utilities.
//!
//! Everything in the runtime logs through the `log` facade. This module only owns the
//! one-time `env_logger` installation used by binaries.

mod init;

pub use init::{init_logging, LoggingConfig};
