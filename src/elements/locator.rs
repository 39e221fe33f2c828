//! Locator strategies with self-healing fallbacks
//!
//! A [`Locator`] describes how to find one UI element: a primary strategy
//! plus an ordered list of alternatives tried when the primary fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element lookup strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Resource id (Android) / element id
    Id,
    /// Accessibility identifier (content-description / accessibility-id)
    AccessibilityId,
    /// XPath query against the UI tree
    XPath,
    /// iOS class chain query
    ClassChain,
    /// Android UiAutomator selector expression
    UiAutomator,
    /// Native class name
    ClassName,
    /// Name attribute
    Name,
}

impl Strategy {
    /// The `using` value sent over the wire for this strategy
    pub fn as_wire(&self) -> &'static str {
        match self {
            Strategy::Id => "id",
            Strategy::AccessibilityId => "accessibility id",
            Strategy::XPath => "xpath",
            Strategy::ClassChain => "-ios class chain",
            Strategy::UiAutomator => "-android uiautomator",
            Strategy::ClassName => "class name",
            Strategy::Name => "name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One (strategy, value) lookup candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub strategy: Strategy,
    pub value: String,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

/// Declarative description of how to find one UI element.
///
/// Constructed once per logical element, typically as a page-object
/// declaration, and immutable afterwards. Fallbacks are consulted strictly
/// in declaration order and only after the primary strategy has failed.
#[derive(Debug, Clone)]
pub struct Locator {
    primary: Candidate,
    display_name: String,
    fallbacks: Vec<Candidate>,
}

impl Locator {
    /// Create a locator from its primary strategy and value.
    ///
    /// `value` must be non-empty; an empty value is a programming error in
    /// the page-object declaration, caught by a debug assertion. Release
    /// builds carry the empty value through, where it fails the lookup at
    /// resolve time instead of matching anything.
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        let value = value.into();
        debug_assert!(!value.is_empty(), "locator value must be non-empty");
        let primary = Candidate { strategy, value };
        let display_name = primary.to_string();
        Self {
            primary,
            display_name,
            fallbacks: Vec::new(),
        }
    }

    /// Set a human-readable name used in logs and error messages
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Append a fallback strategy, tried after all previously added ones
    pub fn with_fallback(mut self, strategy: Strategy, value: impl Into<String>) -> Self {
        let value = value.into();
        debug_assert!(!value.is_empty(), "fallback value must be non-empty");
        self.fallbacks.push(Candidate { strategy, value });
        self
    }

    /// The primary candidate
    pub fn primary(&self) -> &Candidate {
        &self.primary
    }

    /// Human-readable name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Fallback candidates in declaration order
    pub fn fallbacks(&self) -> &[Candidate] {
        &self.fallbacks
    }

    /// All candidates: primary first, then fallbacks in order
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display_name() {
        let locator = Locator::new(Strategy::AccessibilityId, "login-button");
        assert_eq!(locator.display_name(), "accessibility id=login-button");
    }

    #[test]
    fn test_named_display_name() {
        let locator = Locator::new(Strategy::Id, "btn_login").named("Login button");
        assert_eq!(locator.display_name(), "Login button");
        assert_eq!(locator.to_string(), "Login button");
    }

    #[test]
    fn test_candidate_order() {
        let locator = Locator::new(Strategy::AccessibilityId, "login-button")
            .with_fallback(Strategy::Id, "btn_login")
            .with_fallback(Strategy::XPath, "//Button[2]");

        let candidates: Vec<_> = locator.candidates().collect();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].strategy, Strategy::AccessibilityId);
        assert_eq!(candidates[1].strategy, Strategy::Id);
        assert_eq!(candidates[2].strategy, Strategy::XPath);
        assert_eq!(candidates[2].value, "//Button[2]");
    }

    #[test]
    #[should_panic(expected = "locator value must be non-empty")]
    fn test_empty_value_rejected() {
        let _ = Locator::new(Strategy::Id, "");
    }

    #[test]
    #[should_panic(expected = "fallback value must be non-empty")]
    fn test_empty_fallback_rejected() {
        let _ = Locator::new(Strategy::Id, "btn_login").with_fallback(Strategy::XPath, "");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Strategy::AccessibilityId.as_wire(), "accessibility id");
        assert_eq!(Strategy::ClassChain.as_wire(), "-ios class chain");
        assert_eq!(Strategy::UiAutomator.as_wire(), "-android uiautomator");
    }
}
