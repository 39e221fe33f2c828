//! Scroll-until-found search
//!
//! Repeats a directional swipe and re-resolves the locator until the
//! element is found or the swipe budget runs out. The pre-scroll resolve
//! attempt is free; exactly `max_swipes` swipes are performed on total
//! failure.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::driver::traits::{DriverSession, Swipe, WindowSize};
use crate::elements::locator::Locator;
use crate::elements::resolver::{ElementResolver, ResolveOptions, ResolvedElement};
use crate::{Error, Result};

/// Swipe direction, named for where the finger travels.
///
/// `Up` drags from three-quarters height to one-quarter height, revealing
/// content below the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
}

/// Options controlling one scroll search
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    /// Maximum number of swipes before giving up
    pub max_swipes: u32,
    /// Resolve budget for each attempt (kept short; the scroll loop is the
    /// retry mechanism here, not the per-candidate wait)
    pub timeout_per_attempt: Duration,
    /// Swipe direction
    pub direction: Direction,
    /// Gesture duration in milliseconds
    pub swipe_duration_ms: u64,
    /// Settle delay after each swipe before re-resolving
    pub settle_delay: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            max_swipes: 5,
            timeout_per_attempt: Duration::from_secs(1),
            direction: Direction::Up,
            swipe_duration_ms: 500,
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Swipe-and-retry element search
pub struct ScrollSearch {
    driver: Arc<dyn DriverSession>,
    resolver: ElementResolver,
}

impl ScrollSearch {
    pub fn new(driver: Arc<dyn DriverSession>) -> Self {
        Self {
            resolver: ElementResolver::new(driver.clone()),
            driver,
        }
    }

    /// Build the centered vertical swipe for the current viewport, clamped
    /// into bounds.
    fn swipe_for(&self, size: WindowSize, options: &ScrollOptions) -> Swipe {
        let x = (size.width / 2) as i64;
        let three_quarters = (size.height as i64) * 3 / 4;
        let one_quarter = (size.height as i64) / 4;

        let (start_y, end_y) = match options.direction {
            Direction::Up => (three_quarters, one_quarter),
            Direction::Down => (one_quarter, three_quarters),
        };

        Swipe {
            start_x: x,
            start_y,
            end_x: x,
            end_y,
            duration_ms: options.swipe_duration_ms,
        }
        .clamp_to(size)
    }

    /// Resolve the locator, swiping until it appears.
    ///
    /// The initial resolve does not count against `max_swipes`; if the
    /// element is already on screen, zero swipes are performed. Fails with
    /// `ElementNotFound` after exactly `max_swipes` unsuccessful
    /// swipe-and-retry cycles.
    #[instrument(skip(self, locator, options), fields(locator = %locator))]
    pub async fn find_by_scrolling(
        &self,
        locator: &Locator,
        options: &ScrollOptions,
    ) -> Result<ResolvedElement> {
        let resolve_options = ResolveOptions::with_timeout(options.timeout_per_attempt);

        // The element may already be in view.
        let mut last_cause = match self.resolver.resolve(locator, &resolve_options).await {
            Ok(element) => {
                debug!("Element {} found without scrolling", locator);
                return Ok(element);
            }
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        let size = self.driver.window_size().await?;
        let swipe = self.swipe_for(size, options);

        for attempt in 1..=options.max_swipes {
            debug!(
                "Swipe {}/{} looking for {}",
                attempt, options.max_swipes, locator
            );
            self.driver.swipe(&swipe).await?;
            tokio::time::sleep(options.settle_delay).await;

            match self.resolver.resolve(locator, &resolve_options).await {
                Ok(element) => {
                    debug!("Element {} found after {} swipe(s)", locator, attempt);
                    return Ok(element);
                }
                Err(e) if e.is_transient() => last_cause = e,
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Element {} not found after {} swipe attempts",
            locator, options.max_swipes
        );
        Err(Error::element_not_found(format!(
            "{} not found after {} swipe attempts (last cause: {})",
            locator, options.max_swipes, last_cause
        )))
    }
}
