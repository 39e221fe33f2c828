//! Bounded polling waits
//!
//! [`WaitCoordinator`] is the single retry primitive the rest of the core is
//! built on: presence, visibility, and interactability checks in the
//! resolver all reduce to `poll_until` calls with different predicates.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::{Error, Result};

/// Default interval between predicate evaluations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Composes polling waits with a fixed, bounded interval
#[derive(Debug, Clone, Copy)]
pub struct WaitCoordinator {
    interval: Duration,
}

impl WaitCoordinator {
    /// Create a coordinator with a custom poll interval
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Poll interval in use
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Repeatedly evaluate `predicate` until it produces a value or
    /// `timeout` elapses.
    ///
    /// The predicate returns `Ok(Some(v))` to complete, `Ok(None)` to keep
    /// waiting, or an error. Transient errors (not found, stale, nested
    /// timeout) are swallowed and retried; terminal errors propagate
    /// immediately. Exhaustion raises `Error::Timeout` no earlier than
    /// `timeout` after the first evaluation started, carrying the last
    /// transient cause for diagnostics.
    pub async fn poll_until<T, F, Fut>(
        &self,
        timeout: Duration,
        what: &str,
        mut predicate: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let deadline = Instant::now() + timeout;
        let mut last_cause: Option<Error> = None;

        loop {
            match predicate().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    debug!("Transient error while waiting for {}: {}", what, e);
                    last_cause = Some(e);
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                let detail = match last_cause {
                    Some(cause) => format!(
                        "{} not satisfied within {:?} (last cause: {})",
                        what, timeout, cause
                    ),
                    None => format!("{} not satisfied within {:?}", what, timeout),
                };
                return Err(Error::timeout(detail));
            }

            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }
}

impl Default for WaitCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
