//! Page object base
//!
//! [`Page`] is the surface screen objects build on: resolve-then-interact
//! helpers with self-healing lookup, scroll search, and a best-effort
//! screenshot when an interaction fails so the failing state is preserved.

use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::driver::traits::{DriverSession, Swipe, WindowSize};
use crate::elements::locator::Locator;
use crate::elements::resolver::{ElementResolver, ResolveOptions, ResolvedElement};
use crate::elements::scroll::{ScrollOptions, ScrollSearch};
use crate::elements::wait::WaitCoordinator;
use crate::session::{Platform, Session};
use crate::{Error, Result};

/// Base page object bound to one driver session
pub struct Page {
    driver: Arc<dyn DriverSession>,
    resolver: ElementResolver,
    scroll: ScrollSearch,
    platform: Option<Platform>,
    default_timeout: Duration,
    screenshot_dir: Option<PathBuf>,
    snapshot_seq: AtomicU32,
}

impl Page {
    /// Create a page with default timings
    pub fn new(driver: Arc<dyn DriverSession>) -> Self {
        Self::with_config(driver, &Config::default())
    }

    /// Create a page with timings and paths from config
    pub fn with_config(driver: Arc<dyn DriverSession>, config: &Config) -> Self {
        let wait = WaitCoordinator::new(Duration::from_millis(config.poll_interval));
        Self {
            resolver: ElementResolver::with_wait(driver.clone(), wait),
            scroll: ScrollSearch::new(driver.clone()),
            driver,
            platform: None,
            default_timeout: Duration::from_millis(config.default_timeout),
            screenshot_dir: Some(config.reports_dir.clone()),
            snapshot_seq: AtomicU32::new(0),
        }
    }

    /// Create a page for a managed session, carrying its platform
    pub fn for_session(session: &Session, config: &Config) -> Result<Self> {
        let mut page = Self::with_config(session.driver()?, config);
        page.platform = Some(session.platform());
        Ok(page)
    }

    /// Tag this page with a target platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn is_android(&self) -> bool {
        self.platform == Some(Platform::Android)
    }

    pub fn is_ios(&self) -> bool {
        self.platform == Some(Platform::Ios)
    }

    /// Disable failure screenshots for this page
    pub fn without_failure_screenshots(mut self) -> Self {
        self.screenshot_dir = None;
        self
    }

    /// The underlying driver session
    pub fn driver(&self) -> &Arc<dyn DriverSession> {
        &self.driver
    }

    /// Resolve a locator into a visible element with the default timeout
    pub async fn find(&self, locator: &Locator) -> Result<ResolvedElement> {
        self.resolver
            .resolve(locator, &ResolveOptions::with_timeout(self.default_timeout))
            .await
    }

    /// Resolve with explicit options
    pub async fn find_with(
        &self,
        locator: &Locator,
        options: &ResolveOptions,
    ) -> Result<ResolvedElement> {
        self.resolver.resolve(locator, options).await
    }

    /// Resolve a locator, scrolling until it appears
    pub async fn find_by_scrolling(
        &self,
        locator: &Locator,
        options: &ScrollOptions,
    ) -> Result<ResolvedElement> {
        self.scroll.find_by_scrolling(locator, options).await
    }

    /// Resolve and click an interactable element
    pub async fn click(&self, locator: &Locator) -> Result<()> {
        let options = ResolveOptions::with_timeout(self.default_timeout).interactable();
        let outcome = async {
            let element = self.resolver.resolve(locator, &options).await?;
            element.handle().click().await
        }
        .await;

        self.snapshot_on_failure(locator, outcome).await
    }

    /// Resolve an interactable input, clear it, then type into it
    pub async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let options = ResolveOptions::with_timeout(self.default_timeout).interactable();
        let outcome = async {
            let element = self.resolver.resolve(locator, &options).await?;
            element.handle().clear().await?;
            element.handle().send_keys(text).await
        }
        .await;

        self.snapshot_on_failure(locator, outcome).await
    }

    /// Text content of a visible element
    pub async fn text_of(&self, locator: &Locator) -> Result<String> {
        let element = self.find(locator).await?;
        element.handle().text().await
    }

    /// Whether the element is present and displayed within the timeout.
    ///
    /// Absence is an answer here, not an error.
    pub async fn is_displayed(&self, locator: &Locator, timeout: Duration) -> Result<bool> {
        match self
            .resolver
            .resolve(locator, &ResolveOptions::with_timeout(timeout))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_transient() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Perform a raw swipe gesture, clamped to the viewport
    pub async fn swipe(&self, swipe: Swipe) -> Result<()> {
        let size = self.window_size().await?;
        self.driver.swipe(&swipe.clamp_to(size)).await
    }

    /// Current viewport size
    pub async fn window_size(&self) -> Result<WindowSize> {
        self.driver.window_size().await
    }

    /// On failure, dump a screenshot next to the reports so the screen
    /// state at the moment of the failed interaction survives.
    async fn snapshot_on_failure(&self, locator: &Locator, outcome: Result<()>) -> Result<()> {
        let Err(e) = outcome else {
            return Ok(());
        };

        if let Some(dir) = &self.screenshot_dir {
            match self.driver.screenshot_png().await {
                Ok(png) => {
                    // Sequence number keeps repeated failures in one session
                    // from overwriting each other.
                    let seq = self.snapshot_seq.fetch_add(1, Ordering::Relaxed);
                    let path = dir.join(format!(
                        "interaction_failure_{}_{}_{:03}.png",
                        self.driver.id(),
                        Local::now().format("%Y%m%d_%H%M%S"),
                        seq
                    ));
                    if std::fs::create_dir_all(dir).is_ok() {
                        match std::fs::write(&path, png) {
                            Ok(()) => debug!("Saved failure screenshot to {:?}", path),
                            Err(io) => warn!("Failed to write failure screenshot: {}", io),
                        }
                    }
                }
                Err(shot) => warn!(
                    "Interaction with {} failed and screenshot capture also failed: {}",
                    locator, shot
                ),
            }
        }

        Err(e)
    }
}

/// Screen objects implement this to declare how they are recognized
#[async_trait::async_trait]
pub trait Screen {
    /// A locator that is only present when this screen is active
    fn anchor(&self) -> &Locator;

    /// The page this screen operates through
    fn page(&self) -> &Page;

    /// Wait until the screen's anchor element is displayed
    async fn wait_until_active(&self, timeout: Duration) -> Result<()> {
        let shown = self.page().is_displayed(self.anchor(), timeout).await?;
        if shown {
            Ok(())
        } else {
            Err(Error::timeout(format!(
                "screen anchored by {} did not become active",
                self.anchor()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{ElementScript, MockDriver};
    use crate::elements::locator::Strategy;

    fn page(driver: Arc<MockDriver>) -> Page {
        let config = Config {
            default_timeout: 300,
            poll_interval: 50,
            ..Config::default()
        };
        Page::with_config(driver, &config).without_failure_screenshots()
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_resolves_and_clicks() {
        let driver = Arc::new(MockDriver::new());
        let button = driver.add_element(Strategy::AccessibilityId, "submit");

        let page = page(driver);
        let locator = Locator::new(Strategy::AccessibilityId, "submit");
        page.click(&locator).await.unwrap();

        assert_eq!(button.clicks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_text_clears_first() {
        let driver = Arc::new(MockDriver::new());
        let field = driver.add_element(Strategy::Id, "username");

        let page = page(driver);
        let locator = Locator::new(Strategy::Id, "username");
        page.type_text(&locator, "alice").await.unwrap();
        page.type_text(&locator, "bob").await.unwrap();

        // Each type_text clears before typing, so only the last entry remains.
        assert_eq!(field.typed(), vec!["bob".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_displayed_absence_is_not_an_error() {
        let driver = Arc::new(MockDriver::new());
        driver.add_element(Strategy::Id, "present");

        let page = page(driver);
        assert!(page
            .is_displayed(
                &Locator::new(Strategy::Id, "present"),
                Duration::from_millis(200)
            )
            .await
            .unwrap());
        assert!(!page
            .is_displayed(
                &Locator::new(Strategy::Id, "absent"),
                Duration::from_millis(200)
            )
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_disabled_element_fails() {
        let driver = Arc::new(MockDriver::new());
        driver.script_element(
            Strategy::Id,
            "disabled",
            ElementScript {
                enabled: false,
                ..Default::default()
            },
        );

        let page = page(driver);
        let err = page
            .click(&Locator::new(Strategy::Id, "disabled"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ElementNotInteractable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_screenshot_written() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(MockDriver::new());
        let config = Config {
            default_timeout: 200,
            poll_interval: 50,
            reports_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let page = Page::with_config(driver, &config);

        let err = page
            .click(&Locator::new(Strategy::Id, "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("interaction_failure_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_keep_all_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(MockDriver::new());
        let config = Config {
            default_timeout: 200,
            poll_interval: 50,
            reports_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let page = Page::with_config(driver, &config);

        for _ in 0..3 {
            let _ = page.click(&Locator::new(Strategy::Id, "missing")).await;
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_platform_helpers() {
        use crate::session::Capabilities;

        let driver: Arc<dyn DriverSession> = Arc::new(MockDriver::new());
        let caps = Capabilities::new(Platform::Android, "emulator-5554");
        let session = Session::new(caps, driver);

        let page = Page::for_session(&session, &Config::default()).unwrap();
        assert!(page.is_android());
        assert!(!page.is_ios());

        let untagged = Page::new(Arc::new(MockDriver::new()));
        assert!(!untagged.is_android());
        assert!(!untagged.is_ios());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_search_through_page() {
        let driver = Arc::new(MockDriver::new());
        driver.script_element(
            Strategy::Id,
            "deep_item",
            ElementScript {
                appear_after_swipes: 1,
                ..Default::default()
            },
        );

        let page = page(driver.clone());
        let options = ScrollOptions {
            max_swipes: 3,
            timeout_per_attempt: Duration::from_millis(100),
            settle_delay: Duration::from_millis(10),
            ..Default::default()
        };
        page.find_by_scrolling(&Locator::new(Strategy::Id, "deep_item"), &options)
            .await
            .unwrap();
        assert_eq!(driver.swipe_count(), 1);
    }
}
