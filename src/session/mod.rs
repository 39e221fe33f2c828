//! Session and server lifecycle management

pub mod capabilities;
pub mod manager;
pub mod server;

pub use capabilities::{Capabilities, Platform};
pub use manager::{DriverFactory, HttpDriverFactory, SessionManager, ToolProbe};
pub use server::{ServerConfig, ServerProcess, ServerState};

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::driver::traits::DriverSession;
use crate::{Error, Result};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Ready,
    Closed,
}

/// One live remote automation session and its capabilities.
///
/// Owns exactly one driver handle. A closed session must never be reused;
/// driver access after close fails with `SessionClosed`.
#[derive(Debug)]
pub struct Session {
    id: String,
    capabilities: Capabilities,
    driver: Arc<dyn DriverSession>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(capabilities: Capabilities, driver: Arc<dyn DriverSession>) -> Self {
        Self {
            id: driver.id().to_string(),
            capabilities,
            driver,
            state: Mutex::new(SessionState::Ready),
        }
    }

    /// Session identifier (the remote session id)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn platform(&self) -> Platform {
        self.capabilities.platform
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state lock poisoned")
    }

    /// The driver handle, or `SessionClosed` if the session was closed
    pub fn driver(&self) -> Result<Arc<dyn DriverSession>> {
        match self.state() {
            SessionState::Closed => Err(Error::session_closed(self.id.clone())),
            _ => Ok(self.driver.clone()),
        }
    }

    /// Close the session. Idempotent; driver teardown errors are logged,
    /// not raised.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().expect("session state lock poisoned");
            if *state == SessionState::Closed {
                debug!("Session {} already closed", self.id);
                return;
            }
            *state = SessionState::Closed;
        }

        if let Err(e) = self.driver.quit().await {
            warn!("Error quitting session {}: {}", self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockDriver;

    fn test_session() -> (Session, Arc<MockDriver>) {
        let driver = Arc::new(MockDriver::new());
        let caps = Capabilities::new(Platform::Android, "emulator-5554");
        (Session::new(caps, driver.clone()), driver)
    }

    #[tokio::test]
    async fn test_session_starts_ready() {
        let (session, _) = test_session();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.driver().is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (session, driver) = test_session();

        session.close().await;
        session.close().await;

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(driver.quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_driver_access() {
        let (session, _) = test_session();
        session.close().await;

        assert!(matches!(
            session.driver().unwrap_err(),
            Error::SessionClosed(_)
        ));
    }
}
