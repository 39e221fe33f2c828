//! Logging initialization

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing output for a test run.
///
/// `RUST_LOG` wins when set; otherwise the given level applies crate-wide.
/// Calling this more than once is harmless, later calls are ignored.
pub fn init(default_level: &str) {
    let level = default_level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mobium={}", level)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("debug");
        init("info");
        init("not-a-level");
    }
}
