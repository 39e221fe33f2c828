//! Driver abstraction traits
//!
//! These traits are the seam between the framework core and the remote
//! automation protocol. Everything above this layer (resolver, scroll
//! search, page objects, artifact capture) talks to `DriverSession` and
//! `ElementHandle` only, so tests run against the mock and production runs
//! against the HTTP client without any other code changing.

use async_trait::async_trait;
use std::sync::Arc;

use crate::elements::locator::Strategy;
use crate::Result;

/// Viewport dimensions reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// A directional swipe gesture in screen coordinates.
///
/// Requested coordinates may fall outside the viewport; callers clamp via
/// [`Swipe::clamp_to`] before handing the gesture to a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swipe {
    pub start_x: i64,
    pub start_y: i64,
    pub end_x: i64,
    pub end_y: i64,
    pub duration_ms: u64,
}

impl Swipe {
    /// Clamp all coordinates into `[0, width-1] x [0, height-1]`
    pub fn clamp_to(&self, size: WindowSize) -> Swipe {
        fn clamp(value: i64, max: u32) -> i64 {
            value.clamp(0, max.saturating_sub(1) as i64)
        }
        Swipe {
            start_x: clamp(self.start_x, size.width),
            start_y: clamp(self.start_y, size.height),
            end_x: clamp(self.end_x, size.width),
            end_y: clamp(self.end_y, size.height),
            duration_ms: self.duration_ms,
        }
    }
}

/// One live remote automation session.
///
/// All calls within a session are sequential; the framework never issues
/// two driver calls concurrently for the same session.
#[async_trait]
pub trait DriverSession: Send + Sync + std::fmt::Debug {
    /// Remote session identifier
    fn id(&self) -> &str;

    /// Look up a single element in the live UI tree.
    ///
    /// Returns `Error::ElementNotFound` when nothing matches and
    /// `Error::StaleElement` when the tree changed mid-lookup; both are
    /// transient from the resolver's point of view.
    async fn find_element(&self, strategy: Strategy, value: &str)
        -> Result<Arc<dyn ElementHandle>>;

    /// Current viewport size
    async fn window_size(&self) -> Result<WindowSize>;

    /// Perform a swipe gesture. Coordinates must already be clamped.
    async fn swipe(&self, swipe: &Swipe) -> Result<()>;

    /// Capture a screenshot as PNG bytes
    async fn screenshot_png(&self) -> Result<Vec<u8>>;

    /// Dump the current UI tree as XML
    async fn page_source(&self) -> Result<String>;

    /// Fetch device log lines of the given type (e.g. "logcat", "syslog")
    async fn device_log(&self, log_type: &str) -> Result<Vec<String>>;

    /// Terminate the remote session. Idempotent.
    async fn quit(&self) -> Result<()>;

    /// Whether the session is still usable
    fn is_active(&self) -> bool;
}

/// A handle bound to one live UI element.
///
/// Valid for a single interaction; if the underlying UI tree changes the
/// handle goes stale and the element must be re-resolved via its locator.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Remote element identifier
    fn id(&self) -> &str;

    /// Whether the element is rendered on screen
    async fn is_displayed(&self) -> Result<bool>;

    /// Whether the element accepts input
    async fn is_enabled(&self) -> Result<bool>;

    /// Click/tap the element
    async fn click(&self) -> Result<()>;

    /// Clear any existing input value
    async fn clear(&self) -> Result<()>;

    /// Type text into the element
    async fn send_keys(&self, text: &str) -> Result<()>;

    /// Visible text content
    async fn text(&self) -> Result<String>;

    /// Read an attribute value
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
}

impl std::fmt::Debug for dyn ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementHandle")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}
