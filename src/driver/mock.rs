//! Mock driver implementation for testing
//!
//! A scriptable in-memory driver used by unit and integration tests. Each
//! element is registered under its (strategy, value) key with a script that
//! controls how many lookups fail, how many swipes must happen before it
//! appears, and when it becomes visible.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::driver::traits::{DriverSession, ElementHandle, Swipe, WindowSize};
use crate::elements::locator::Strategy;
use crate::{Error, Result};

/// 1x1 transparent PNG, the smallest valid screenshot payload
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
    0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x05, 0x02, 0x00, 0x5E, 0x2D, 0xE2, 0xCB, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Scripted behavior for one mock element
#[derive(Debug, Clone)]
pub struct ElementScript {
    /// First N `find_element` calls report stale element
    pub stale_finds: u32,
    /// Next N `find_element` calls report not found
    pub fail_finds: u32,
    /// Element stays not-found until this many swipes were performed
    pub appear_after_swipes: u32,
    /// First N `is_displayed` checks return false
    pub hidden_checks: u32,
    /// Whether the element accepts input
    pub enabled: bool,
    /// Text content
    pub text: String,
}

impl Default for ElementScript {
    fn default() -> Self {
        Self {
            stale_finds: 0,
            fail_finds: 0,
            appear_after_swipes: 0,
            hidden_checks: 0,
            enabled: true,
            text: String::new(),
        }
    }
}

#[derive(Debug)]
struct ElementState {
    script: ElementScript,
    find_calls: u32,
    handle: Arc<MockElement>,
}

/// Mock driver session
#[derive(Debug)]
pub struct MockDriver {
    id: String,
    active: AtomicBool,
    window: WindowSize,
    elements: Mutex<HashMap<(Strategy, String), ElementState>>,
    swipes: Mutex<Vec<Swipe>>,
    fail_screenshot: AtomicBool,
    fail_page_source: AtomicBool,
    quit_calls: AtomicU32,
}

impl MockDriver {
    /// Create a mock driver with a 1080x1920 viewport
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            active: AtomicBool::new(true),
            window: WindowSize {
                width: 1080,
                height: 1920,
            },
            elements: Mutex::new(HashMap::new()),
            swipes: Mutex::new(Vec::new()),
            fail_screenshot: AtomicBool::new(false),
            fail_page_source: AtomicBool::new(false),
            quit_calls: AtomicU32::new(0),
        }
    }

    /// Create a mock driver with a custom viewport
    pub fn with_window(width: u32, height: u32) -> Self {
        let mut driver = Self::new();
        driver.window = WindowSize { width, height };
        driver
    }

    /// Register an element that resolves immediately
    pub fn add_element(&self, strategy: Strategy, value: &str) -> Arc<MockElement> {
        self.script_element(strategy, value, ElementScript::default())
    }

    /// Register an element with scripted behavior
    pub fn script_element(
        &self,
        strategy: Strategy,
        value: &str,
        script: ElementScript,
    ) -> Arc<MockElement> {
        let handle = Arc::new(MockElement::new(&script));
        let state = ElementState {
            script,
            find_calls: 0,
            handle: handle.clone(),
        };
        self.elements
            .lock()
            .expect("elements lock poisoned")
            .insert((strategy, value.to_string()), state);
        handle
    }

    /// All swipes performed so far, in order
    pub fn swipes(&self) -> Vec<Swipe> {
        self.swipes.lock().expect("swipes lock poisoned").clone()
    }

    /// Number of swipes performed so far
    pub fn swipe_count(&self) -> usize {
        self.swipes.lock().expect("swipes lock poisoned").len()
    }

    /// Make screenshot capture fail
    pub fn break_screenshot(&self) {
        self.fail_screenshot.store(true, Ordering::Relaxed);
    }

    /// Make page-source capture fail
    pub fn break_page_source(&self) {
        self.fail_page_source.store(true, Ordering::Relaxed);
    }

    /// Number of quit calls received
    pub fn quit_calls(&self) -> u32 {
        self.quit_calls.load(Ordering::Relaxed)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverSession for MockDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn find_element(
        &self,
        strategy: Strategy,
        value: &str,
    ) -> Result<Arc<dyn ElementHandle>> {
        if !self.active.load(Ordering::Relaxed) {
            return Err(Error::session_closed(self.id.clone()));
        }

        let swipes_done = self.swipe_count() as u32;
        let mut elements = self.elements.lock().expect("elements lock poisoned");

        let state = match elements.get_mut(&(strategy, value.to_string())) {
            Some(state) => state,
            None => return Err(Error::element_not_found(format!("{}={}", strategy, value))),
        };

        if swipes_done < state.script.appear_after_swipes {
            return Err(Error::element_not_found(format!(
                "{}={} (off-screen, {} swipes so far)",
                strategy, value, swipes_done
            )));
        }

        state.find_calls += 1;
        if state.find_calls <= state.script.stale_finds {
            return Err(Error::stale_element(format!("{}={}", strategy, value)));
        }
        if state.find_calls <= state.script.stale_finds + state.script.fail_finds {
            return Err(Error::element_not_found(format!("{}={}", strategy, value)));
        }

        Ok(state.handle.clone())
    }

    async fn window_size(&self) -> Result<WindowSize> {
        Ok(self.window)
    }

    async fn swipe(&self, swipe: &Swipe) -> Result<()> {
        if !self.active.load(Ordering::Relaxed) {
            return Err(Error::session_closed(self.id.clone()));
        }
        self.swipes
            .lock()
            .expect("swipes lock poisoned")
            .push(*swipe);
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        if self.fail_screenshot.load(Ordering::Relaxed) {
            return Err(Error::driver("screenshot capture failed"));
        }
        Ok(TINY_PNG.to_vec())
    }

    async fn page_source(&self) -> Result<String> {
        if self.fail_page_source.load(Ordering::Relaxed) {
            return Err(Error::driver("page source unavailable"));
        }
        Ok("<hierarchy rotation=\"0\"><android.widget.FrameLayout/></hierarchy>".to_string())
    }

    async fn device_log(&self, log_type: &str) -> Result<Vec<String>> {
        Ok(vec![format!("[{}] mock log line", log_type)])
    }

    async fn quit(&self) -> Result<()> {
        self.quit_calls.fetch_add(1, Ordering::Relaxed);
        self.active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Mock element handle
#[derive(Debug)]
pub struct MockElement {
    id: String,
    hidden_checks: AtomicU32,
    displayed_checks: AtomicU32,
    enabled: AtomicBool,
    text: String,
    clicks: AtomicU32,
    typed: Mutex<Vec<String>>,
}

impl MockElement {
    fn new(script: &ElementScript) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hidden_checks: AtomicU32::new(script.hidden_checks),
            displayed_checks: AtomicU32::new(0),
            enabled: AtomicBool::new(script.enabled),
            text: script.text.clone(),
            clicks: AtomicU32::new(0),
            typed: Mutex::new(Vec::new()),
        }
    }

    /// Number of clicks received
    pub fn clicks(&self) -> u32 {
        self.clicks.load(Ordering::Relaxed)
    }

    /// Text typed into the element, one entry per `send_keys` call
    pub fn typed(&self) -> Vec<String> {
        self.typed.lock().expect("typed lock poisoned").clone()
    }

    /// Number of visibility checks performed against this element
    pub fn displayed_checks(&self) -> u32 {
        self.displayed_checks.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ElementHandle for MockElement {
    fn id(&self) -> &str {
        &self.id
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.displayed_checks.fetch_add(1, Ordering::Relaxed);
        let remaining = self.hidden_checks.load(Ordering::Relaxed);
        if remaining > 0 {
            self.hidden_checks.store(remaining - 1, Ordering::Relaxed);
            return Ok(false);
        }
        Ok(true)
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.enabled.load(Ordering::Relaxed))
    }

    async fn click(&self) -> Result<()> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Err(Error::element_not_interactable(self.id.clone()));
        }
        self.clicks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.typed.lock().expect("typed lock poisoned").clear();
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Err(Error::element_not_interactable(self.id.clone()));
        }
        self.typed
            .lock()
            .expect("typed lock poisoned")
            .push(text.to_string());
        Ok(())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        match name {
            "enabled" => Ok(Some(self.enabled.load(Ordering::Relaxed).to_string())),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_registered_element() {
        let driver = MockDriver::new();
        driver.add_element(Strategy::Id, "btn_login");

        let element = driver.find_element(Strategy::Id, "btn_login").await.unwrap();
        assert!(element.is_displayed().await.unwrap());
        assert!(element.is_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn test_find_unregistered_element() {
        let driver = MockDriver::new();
        let result = driver.find_element(Strategy::Id, "missing").await;
        assert!(matches!(result.unwrap_err(), Error::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let driver = MockDriver::new();
        driver.script_element(
            Strategy::Id,
            "flaky",
            ElementScript {
                stale_finds: 1,
                fail_finds: 2,
                ..Default::default()
            },
        );

        assert!(matches!(
            driver.find_element(Strategy::Id, "flaky").await.unwrap_err(),
            Error::StaleElement(_)
        ));
        for _ in 0..2 {
            assert!(matches!(
                driver.find_element(Strategy::Id, "flaky").await.unwrap_err(),
                Error::ElementNotFound(_)
            ));
        }
        assert!(driver.find_element(Strategy::Id, "flaky").await.is_ok());
    }

    #[tokio::test]
    async fn test_appear_after_swipes() {
        let driver = MockDriver::new();
        driver.script_element(
            Strategy::AccessibilityId,
            "footer",
            ElementScript {
                appear_after_swipes: 2,
                ..Default::default()
            },
        );

        assert!(driver
            .find_element(Strategy::AccessibilityId, "footer")
            .await
            .is_err());

        let swipe = Swipe {
            start_x: 540,
            start_y: 1440,
            end_x: 540,
            end_y: 480,
            duration_ms: 500,
        };
        driver.swipe(&swipe).await.unwrap();
        assert!(driver
            .find_element(Strategy::AccessibilityId, "footer")
            .await
            .is_err());

        driver.swipe(&swipe).await.unwrap();
        assert!(driver
            .find_element(Strategy::AccessibilityId, "footer")
            .await
            .is_ok());
        assert_eq!(driver.swipe_count(), 2);
    }

    #[tokio::test]
    async fn test_quit_deactivates_session() {
        let driver = MockDriver::new();
        driver.add_element(Strategy::Id, "x");
        driver.quit().await.unwrap();

        assert!(!driver.is_active());
        assert!(matches!(
            driver.find_element(Strategy::Id, "x").await.unwrap_err(),
            Error::SessionClosed(_)
        ));
    }
}
