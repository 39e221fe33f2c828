//! Self-healing element resolution
//!
//! [`ElementResolver`] walks a locator's candidate strategies in declared
//! order. Each candidate gets the full timeout budget; a candidate that
//! fails with a transient condition is recorded and the loop moves on to
//! the next one. Only terminal errors (malformed input, dead session,
//! protocol failures) unwind immediately.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::driver::traits::{DriverSession, ElementHandle};
use crate::elements::locator::{Candidate, Locator};
use crate::elements::wait::WaitCoordinator;
use crate::{Error, Result};

/// Options controlling one resolution
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Budget for each candidate strategy.
    ///
    /// Every candidate gets this full budget before the next is tried, so
    /// worst-case latency is `timeout * (1 + fallbacks)`. This matches the
    /// "try this strategy fully before moving on" model and favors
    /// correctness when only one strategy is valid at a time.
    pub timeout: Duration,
    /// Wait for the element to be rendered on screen
    pub require_visible: bool,
    /// Wait for the element to be visible and accepting input
    pub require_interactable: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            require_visible: true,
            require_interactable: false,
        }
    }
}

impl ResolveOptions {
    /// Options with a custom per-candidate timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Require the element to be interactable (implies visible)
    pub fn interactable(mut self) -> Self {
        self.require_visible = true;
        self.require_interactable = true;
        self
    }

    /// Presence only, no visibility check
    pub fn presence_only(mut self) -> Self {
        self.require_visible = false;
        self.require_interactable = false;
        self
    }
}

/// An element handle bound to one live UI element, together with the
/// candidate strategy that matched it.
///
/// Valid for a single interaction. On staleness, re-resolve via the
/// locator instead of reusing the handle.
pub struct ResolvedElement {
    handle: Arc<dyn ElementHandle>,
    matched: Candidate,
}

impl std::fmt::Debug for ResolvedElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedElement")
            .field("matched", &self.matched)
            .finish_non_exhaustive()
    }
}

impl ResolvedElement {
    /// The raw driver handle
    pub fn handle(&self) -> &Arc<dyn ElementHandle> {
        &self.handle
    }

    /// The candidate strategy that located this element
    pub fn matched(&self) -> &Candidate {
        &self.matched
    }
}

/// Outcome of one candidate attempt.
///
/// Transient failures become `NotFound` so the fallback loop is an explicit
/// state transition rather than exception unwinding.
enum Attempt {
    Found(ResolvedElement),
    NotFound(Error),
}

/// Self-healing element lookup over a driver session
pub struct ElementResolver {
    driver: Arc<dyn DriverSession>,
    wait: WaitCoordinator,
}

impl ElementResolver {
    /// Create a resolver with the default poll interval
    pub fn new(driver: Arc<dyn DriverSession>) -> Self {
        Self::with_wait(driver, WaitCoordinator::default())
    }

    /// Create a resolver with a custom wait coordinator
    pub fn with_wait(driver: Arc<dyn DriverSession>, wait: WaitCoordinator) -> Self {
        Self { driver, wait }
    }

    /// The wait coordinator backing this resolver
    pub fn wait(&self) -> &WaitCoordinator {
        &self.wait
    }

    /// Resolve a locator into a live element.
    ///
    /// Tries the primary strategy, then each fallback in declared order.
    /// Fails with `ElementNotFound` when no candidate matched, or
    /// `ElementNotInteractable` when the best outcome was a match that never
    /// became interactable; both chain the last underlying cause.
    #[instrument(skip(self, locator, options), fields(locator = %locator))]
    pub async fn resolve(
        &self,
        locator: &Locator,
        options: &ResolveOptions,
    ) -> Result<ResolvedElement> {
        let mut last_cause: Option<Error> = None;

        for candidate in locator.candidates() {
            debug!("Attempting to find element with {}", candidate);
            match self.try_candidate(candidate, options).await? {
                Attempt::Found(element) => {
                    debug!("Successfully found element {} via {}", locator, candidate);
                    return Ok(element);
                }
                Attempt::NotFound(cause) => {
                    warn!("Element {} not found with {}: {}", locator, candidate, cause);
                    last_cause = Some(cause);
                }
            }
        }

        warn!("All locator strategies failed for {}", locator);
        match last_cause {
            Some(cause @ Error::ElementNotInteractable(_)) => Err(Error::element_not_interactable(
                format!("{} (last cause: {})", locator, cause),
            )),
            Some(cause) => Err(Error::element_not_found(format!(
                "{} not found with any strategy (last cause: {})",
                locator, cause
            ))),
            None => Err(Error::element_not_found(format!(
                "{} not found with any strategy",
                locator
            ))),
        }
    }

    /// Attempt one candidate: presence, then optional visibility and
    /// interactability, each bounded by the full per-candidate timeout.
    async fn try_candidate(
        &self,
        candidate: &Candidate,
        options: &ResolveOptions,
    ) -> Result<Attempt> {
        let handle = match self.wait_for_presence(candidate, options.timeout).await? {
            Ok(handle) => handle,
            Err(cause) => return Ok(Attempt::NotFound(cause)),
        };

        if options.require_visible {
            if let Err(cause) = self.wait_for_visibility(&handle, candidate, options.timeout).await?
            {
                return Ok(Attempt::NotFound(cause));
            }
        }

        if options.require_interactable {
            if let Err(cause) = self
                .wait_for_interactability(&handle, candidate, options.timeout)
                .await?
            {
                return Ok(Attempt::NotFound(Error::element_not_interactable(format!(
                    "{} matched but never became interactable: {}",
                    candidate, cause
                ))));
            }
        }

        Ok(Attempt::Found(ResolvedElement {
            handle,
            matched: candidate.clone(),
        }))
    }

    /// Poll for element presence.
    ///
    /// Outer `Result` carries terminal errors; the inner one distinguishes
    /// "present" from the transient cause to record. A stale reference
    /// aborts the candidate immediately instead of being re-polled, so a
    /// permanently stale strategy cannot loop.
    async fn wait_for_presence(
        &self,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<std::result::Result<Arc<dyn ElementHandle>, Error>> {
        let what = format!("presence of {}", candidate);
        let outcome = self
            .wait
            .poll_until(timeout, &what, || async {
                match self
                    .driver
                    .find_element(candidate.strategy, &candidate.value)
                    .await
                {
                    Ok(handle) => Ok(Some(Ok(handle))),
                    Err(stale @ Error::StaleElement(_)) => Ok(Some(Err(stale))),
                    Err(e) => Err(e),
                }
            })
            .await;

        match outcome {
            Ok(inner) => Ok(inner),
            Err(e) if e.is_transient() => Ok(Err(e)),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_visibility(
        &self,
        handle: &Arc<dyn ElementHandle>,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<std::result::Result<(), Error>> {
        let what = format!("visibility of {}", candidate);
        let outcome = self
            .wait
            .poll_until(timeout, &what, || async {
                match handle.is_displayed().await? {
                    true => Ok(Some(())),
                    false => Ok(None),
                }
            })
            .await;

        match outcome {
            Ok(()) => Ok(Ok(())),
            Err(e) if e.is_transient() => Ok(Err(e)),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_interactability(
        &self,
        handle: &Arc<dyn ElementHandle>,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<std::result::Result<(), Error>> {
        let what = format!("interactability of {}", candidate);
        let outcome = self
            .wait
            .poll_until(timeout, &what, || async {
                let ready = handle.is_displayed().await? && handle.is_enabled().await?;
                Ok(ready.then_some(()))
            })
            .await;

        match outcome {
            Ok(()) => Ok(Ok(())),
            Err(e) if e.is_transient() => Ok(Err(e)),
            Err(e) => Err(e),
        }
    }
}
