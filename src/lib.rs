//! Mobium: mobile UI test-automation core
//!
//! Self-healing element location with fallback strategies, bounded waits,
//! scroll-until-found search, automation server and session lifecycle
//! management, and failure artifact capture.

pub mod error;
pub mod config;

pub mod artifacts;
pub mod driver;
pub mod elements;
pub mod logging;
pub mod page;
pub mod session;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};

/// Mobium library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
