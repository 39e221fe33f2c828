//! Unified error types for Mobium

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Mobium
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors talking to the automation server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote driver protocol errors
    #[error("Driver error: {0}")]
    Driver(String),

    /// Element not found with any locator strategy
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element found but not interactable
    #[error("Element not interactable: {0}")]
    ElementNotInteractable(String),

    /// Element handle no longer attached to the UI tree
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Unsupported platform value
    #[error("Invalid platform: {0}")]
    InvalidPlatform(String),

    /// Session requested while no server is running
    #[error("Automation server not running: {0}")]
    ServerNotRunning(String),

    /// Server process failed to come up
    #[error("Server startup failed: {0}")]
    StartupFailure(String),

    /// Missing prerequisite tooling; fatal and non-retryable
    #[error("Environment error: {0}")]
    Environment(String),

    /// Session already closed
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new driver protocol error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        Error::Driver(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(msg: S) -> Self {
        Error::ElementNotFound(msg.into())
    }

    /// Create a new element not interactable error
    pub fn element_not_interactable<S: Into<String>>(msg: S) -> Self {
        Error::ElementNotInteractable(msg.into())
    }

    /// Create a new stale element error
    pub fn stale_element<S: Into<String>>(msg: S) -> Self {
        Error::StaleElement(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new invalid platform error
    pub fn invalid_platform<S: Into<String>>(msg: S) -> Self {
        Error::InvalidPlatform(msg.into())
    }

    /// Create a new server not running error
    pub fn server_not_running<S: Into<String>>(msg: S) -> Self {
        Error::ServerNotRunning(msg.into())
    }

    /// Create a new startup failure error
    pub fn startup_failure<S: Into<String>>(msg: S) -> Self {
        Error::StartupFailure(msg.into())
    }

    /// Create a new environment error
    pub fn environment<S: Into<String>>(msg: S) -> Self {
        Error::Environment(msg.into())
    }

    /// Create a new session closed error
    pub fn session_closed<S: Into<String>>(msg: S) -> Self {
        Error::SessionClosed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error is a retryable condition.
    ///
    /// Transient errors are absorbed by wait/fallback loops and only surface
    /// once the loop's budget is exhausted. Everything else is terminal and
    /// propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ElementNotFound(_)
                | Error::ElementNotInteractable(_)
                | Error::StaleElement(_)
                | Error::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::element_not_found("x").is_transient());
        assert!(Error::stale_element("x").is_transient());
        assert!(Error::timeout("x").is_transient());
        assert!(Error::element_not_interactable("x").is_transient());

        assert!(!Error::environment("adb missing").is_transient());
        assert!(!Error::invalid_platform("windows").is_transient());
        assert!(!Error::server_not_running("x").is_transient());
        assert!(!Error::configuration("bad").is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::element_not_found("login-button");
        assert_eq!(err.to_string(), "Element not found: login-button");

        let err = Error::startup_failure("no listener after 10 attempts");
        assert!(err.to_string().contains("Server startup failed"));
    }
}
