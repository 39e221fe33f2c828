//! End-to-end element location tests
//!
//! These tests validate the complete resolve path: fallback strategies,
//! timing budgets, scroll search, and page-level interaction.

mod common;

use anyhow::Result;
use mobium::driver::mock::{ElementScript, MockDriver};
use mobium::elements::{Direction, ElementResolver, Locator, ResolveOptions, ScrollOptions, ScrollSearch, Strategy};
use mobium::page::Page;
use mobium::{Config, Error};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

/// Test 1: each fallback strategy gets the full timeout budget
#[tokio::test(start_paused = true)]
async fn test_fallback_timing_budget() -> Result<()> {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());
    driver.add_element(Strategy::XPath, "//android.widget.Button[@text='Login']");

    let locator = Locator::new(Strategy::AccessibilityId, "login_button")
        .with_fallback(Strategy::XPath, "//android.widget.Button[@text='Login']")
        .named("Login button");

    let resolver = ElementResolver::new(driver);
    let start = tokio::time::Instant::now();
    let element = resolver
        .resolve(&locator, &ResolveOptions::with_timeout(Duration::from_secs(5)))
        .await?;
    let elapsed = start.elapsed();

    assert_eq!(element.matched().strategy, Strategy::XPath);
    // The missing primary burned its full 5s before the fallback hit.
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6));
    Ok(())
}

/// Test 2: exhausting every strategy reports the locator's display name
/// and the last cause
#[tokio::test(start_paused = true)]
async fn test_exhaustion_diagnostics() {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());

    let locator = Locator::new(Strategy::Id, "cart_badge")
        .with_fallback(Strategy::AccessibilityId, "cart badge")
        .named("Cart badge");

    let err = ElementResolver::new(driver)
        .resolve(
            &locator,
            &ResolveOptions::with_timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ElementNotFound(_)));
    let message = err.to_string();
    assert!(message.contains("Cart badge"));
    assert!(message.contains("last cause"));
}

/// Test 3: a stale primary strategy is abandoned immediately
#[tokio::test(start_paused = true)]
async fn test_stale_primary_does_not_burn_budget() -> Result<()> {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());
    driver.script_element(
        Strategy::Id,
        "recycled_row",
        ElementScript {
            stale_finds: u32::MAX,
            ..Default::default()
        },
    );
    driver.add_element(Strategy::UiAutomator, "new UiSelector().text(\"Row\")");

    let locator = Locator::new(Strategy::Id, "recycled_row")
        .with_fallback(Strategy::UiAutomator, "new UiSelector().text(\"Row\")");

    let start = tokio::time::Instant::now();
    let element = ElementResolver::new(driver)
        .resolve(&locator, &ResolveOptions::with_timeout(Duration::from_secs(10)))
        .await?;

    assert_eq!(element.matched().strategy, Strategy::UiAutomator);
    assert!(start.elapsed() < Duration::from_secs(1));
    Ok(())
}

/// Test 4: scroll search performs exactly the configured number of swipes
/// on failure, and the free initial resolve costs none
#[tokio::test(start_paused = true)]
async fn test_scroll_swipe_budget() {
    common::init_logging();
    let driver = Arc::new(MockDriver::with_window(1080, 1920));
    let search = ScrollSearch::new(driver.clone());
    let locator = Locator::new(Strategy::AccessibilityId, "terms_link");

    let options = ScrollOptions {
        max_swipes: 3,
        timeout_per_attempt: Duration::from_millis(200),
        settle_delay: Duration::from_millis(10),
        direction: Direction::Up,
        ..Default::default()
    };
    let err = search.find_by_scrolling(&locator, &options).await.unwrap_err();

    assert!(matches!(err, Error::ElementNotFound(_)));
    assert_eq!(driver.swipe_count(), 3);

    // Gesture: centered, 3/4 height down to 1/4 height.
    for swipe in driver.swipes() {
        assert_eq!(swipe.start_x, 540);
        assert_eq!(swipe.start_y, 1440);
        assert_eq!(swipe.end_y, 480);
    }
}

/// Test 5: scroll search stops as soon as the element scrolls into view
#[tokio::test(start_paused = true)]
async fn test_scroll_stops_on_discovery() -> Result<()> {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());
    driver.script_element(
        Strategy::AccessibilityId,
        "terms_link",
        ElementScript {
            appear_after_swipes: 2,
            ..Default::default()
        },
    );

    let search = ScrollSearch::new(driver.clone());
    let options = ScrollOptions {
        max_swipes: 5,
        timeout_per_attempt: Duration::from_millis(200),
        settle_delay: Duration::from_millis(10),
        ..Default::default()
    };
    tokio_test::assert_ok!(
        search
            .find_by_scrolling(&Locator::new(Strategy::AccessibilityId, "terms_link"), &options)
            .await
    );

    assert_eq!(driver.swipe_count(), 2);
    Ok(())
}

/// Test 6: page-level login flow with self-healing locators
#[tokio::test(start_paused = true)]
async fn test_login_flow_through_page() -> Result<()> {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());
    let username = driver.add_element(Strategy::Id, "username_field");
    let password = driver.add_element(Strategy::Id, "password_field");
    // The button id changed in this build; only the xpath fallback matches.
    let login = driver.add_element(Strategy::XPath, "//Button[@text='Log in']");

    let config = Config {
        default_timeout: 500,
        poll_interval: 50,
        ..Config::default()
    };
    let page = Page::with_config(driver, &config).without_failure_screenshots();

    page.type_text(&Locator::new(Strategy::Id, "username_field"), "alice")
        .await?;
    page.type_text(&Locator::new(Strategy::Id, "password_field"), "hunter2")
        .await?;
    page.click(
        &Locator::new(Strategy::Id, "login_button")
            .with_fallback(Strategy::XPath, "//Button[@text='Log in']"),
    )
    .await?;

    assert_eq!(username.typed(), vec!["alice".to_string()]);
    assert_eq!(password.typed(), vec!["hunter2".to_string()]);
    assert_eq!(login.clicks(), 1);
    Ok(())
}

/// Test 7: an element that renders late is waited for, not failed fast
#[tokio::test(start_paused = true)]
async fn test_late_rendering_element() -> Result<()> {
    common::init_logging();
    let driver = Arc::new(MockDriver::new());
    driver.script_element(
        Strategy::Id,
        "toast",
        ElementScript {
            fail_finds: 3,
            hidden_checks: 2,
            ..Default::default()
        },
    );

    let element = ElementResolver::new(driver)
        .resolve(
            &Locator::new(Strategy::Id, "toast"),
            &ResolveOptions::with_timeout(Duration::from_secs(2)),
        )
        .await?;
    assert!(element.handle().is_displayed().await?);
    Ok(())
}
