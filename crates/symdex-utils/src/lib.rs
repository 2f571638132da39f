//! # Symdex Utilities
//!
//! Shared logging setup for the symdex workspace.
//!
//! The core crate only emits `tracing` events; binaries call one of the
//! `init_logging*` functions here once at startup and keep the returned
//! [`LogGuard`] alive until exit.

pub mod logging;

// Re-export commonly used logging items for convenience
pub use logging::{init_logging, init_logging_with, init_logging_with_level, LogFormat, LogGuard, LogLevel, LogSettings};
pub use tracing::{debug, error, info, trace, warn};
