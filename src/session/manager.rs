//! Session manager
//!
//! Owns the automation server process and the active-session set:
//! prerequisite checks, server startup/teardown, session creation and
//! idempotent cleanup. One manager per test process; there is no
//! concurrent access to a session within a manager.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::driver::http::HttpDriver;
use crate::driver::mock::MockDriver;
use crate::driver::traits::DriverSession;
use crate::session::capabilities::{Capabilities, Platform};
use crate::session::server::{MockBackend, ServerConfig, ServerProcess, ServerState};
use crate::session::Session;
use crate::{Error, Result};

/// Creates driver sessions against a running server
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(
        &self,
        server_url: &str,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn DriverSession>>;
}

/// Production factory: opens WebDriver HTTP sessions
#[derive(Debug, Default)]
pub struct HttpDriverFactory;

#[async_trait]
impl DriverFactory for HttpDriverFactory {
    async fn create(
        &self,
        server_url: &str,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn DriverSession>> {
        let driver = HttpDriver::new_session(server_url, capabilities).await?;
        Ok(Arc::new(driver))
    }
}

/// Test factory: hands out fresh mock drivers and keeps them for
/// inspection
#[derive(Debug, Default)]
pub struct MockDriverFactory {
    created: std::sync::Mutex<Vec<Arc<MockDriver>>>,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drivers created so far, in creation order
    pub fn created(&self) -> Vec<Arc<MockDriver>> {
        self.created.lock().expect("created lock poisoned").clone()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn create(
        &self,
        _server_url: &str,
        _capabilities: &Capabilities,
    ) -> Result<Arc<dyn DriverSession>> {
        let driver = Arc::new(MockDriver::new());
        self.created
            .lock()
            .expect("created lock poisoned")
            .push(driver.clone());
        Ok(driver)
    }
}

/// Looks up external tools required by the framework
pub trait ToolProbe: Send + Sync {
    fn exists(&self, tool: &str) -> bool;
}

/// Default probe: scans `PATH` for the executable
#[derive(Debug, Default)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn exists(&self, tool: &str) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&path).any(|dir| dir.join(tool).is_file())
    }
}

/// Probe with a fixed tool set, for tests
#[derive(Debug, Default)]
pub struct FixedProbe {
    tools: Vec<String>,
}

impl FixedProbe {
    pub fn with_tools(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// A probe where every tool exists
    pub fn everything() -> Self {
        Self::with_tools(&["node", "npm", "appium", "adb", "xcrun"])
    }
}

impl ToolProbe for FixedProbe {
    fn exists(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Manages the server process and all sessions created through it
pub struct SessionManager {
    server: tokio::sync::Mutex<ServerProcess>,
    server_url: String,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    driver_factory: Arc<dyn DriverFactory>,
    tool_probe: Arc<dyn ToolProbe>,
}

impl SessionManager {
    /// Create a manager with injected parts
    pub fn with_parts(
        server: ServerProcess,
        driver_factory: Arc<dyn DriverFactory>,
        tool_probe: Arc<dyn ToolProbe>,
    ) -> Self {
        let server_url = format!(
            "http://{}:{}{}",
            server.host(),
            server.port(),
            server.base_path()
        );
        Self {
            server: tokio::sync::Mutex::new(server),
            server_url,
            sessions: RwLock::new(HashMap::new()),
            driver_factory,
            tool_probe,
        }
    }

    /// Create a production manager: real server binary, HTTP drivers,
    /// `PATH`-based tool probing
    pub fn new(config: ServerConfig) -> Self {
        Self::with_parts(
            ServerProcess::appium(config),
            Arc::new(HttpDriverFactory),
            Arc::new(PathProbe),
        )
    }

    /// Create a fully mocked manager for testing
    pub fn mock() -> Self {
        Self::with_parts(
            ServerProcess::new(ServerConfig::default(), Arc::new(MockBackend::listening_after(0))),
            Arc::new(MockDriverFactory::new()),
            Arc::new(FixedProbe::everything()),
        )
    }

    /// URL sessions are created against
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Verify required external tooling exists.
    ///
    /// Fatal and non-retryable: a missing binary cannot be fixed by
    /// retrying.
    pub fn ensure_prerequisites(&self, platform: Platform) -> Result<()> {
        let mut required: Vec<(&str, &str)> = vec![
            ("node", "Node.js is required. Install from https://nodejs.org/"),
            ("npm", "npm is required. It ships with Node.js."),
            ("appium", "Appium CLI is required. Install with: npm install -g appium"),
        ];
        match platform {
            Platform::Android => {
                required.push(("adb", "Android Debug Bridge (adb) is required for Android testing."))
            }
            Platform::Ios => {
                required.push(("xcrun", "Xcode Command Line Tools are required for iOS testing."))
            }
        }

        for (tool, hint) in required {
            if !self.tool_probe.exists(tool) {
                return Err(Error::environment(format!(
                    "{} Command not found: {}",
                    hint, tool
                )));
            }
        }
        Ok(())
    }

    /// Check prerequisites, then start the server.
    ///
    /// The prerequisite failure surfaces before any server-start attempt.
    pub async fn bootstrap(&self, platform: Platform) -> Result<()> {
        self.ensure_prerequisites(platform)?;
        self.start_server().await
    }

    /// Start the automation server. Idempotent while running.
    #[instrument(skip(self))]
    pub async fn start_server(&self) -> Result<()> {
        self.server.lock().await.start().await
    }

    /// Current server state
    pub async fn server_state(&self) -> ServerState {
        self.server.lock().await.state()
    }

    /// Register a server plugin, best-effort installing it through the
    /// server backend.
    ///
    /// Install failures are logged and never fail the caller; the plugin
    /// is still forwarded via `--use-plugins` at next server start.
    pub async fn install_plugin(&self, name: &str) {
        let mut server = self.server.lock().await;
        if self.tool_probe.exists("appium") {
            server.install_plugin(name).await;
        } else {
            warn!(
                "appium CLI not found; registering plugin {} without installing",
                name
            );
            server.register_plugin(name);
        }
    }

    /// Plugins registered for `--use-plugins` forwarding
    pub async fn installed_plugins(&self) -> Vec<String> {
        self.server.lock().await.installed_plugins().to_vec()
    }

    /// Create a session for a textual platform name.
    ///
    /// Fails with `InvalidPlatform` before anything else for unsupported
    /// values.
    pub async fn create_session_named(
        &self,
        platform: &str,
        device_name: &str,
    ) -> Result<Arc<Session>> {
        let platform = Platform::parse(platform)?;
        self.create_session(Capabilities::new(platform, device_name))
            .await
    }

    /// Create a session with full capabilities.
    ///
    /// Fails with `ServerNotRunning` unless the server reached `Running`;
    /// on success the session joins the active-set for later cleanup.
    #[instrument(skip(self, capabilities), fields(platform = %capabilities.platform, device = %capabilities.device_name))]
    pub async fn create_session(&self, capabilities: Capabilities) -> Result<Arc<Session>> {
        capabilities.validate()?;

        if self.server.lock().await.state() != ServerState::Running {
            return Err(Error::server_not_running(
                "start_server must succeed before creating sessions",
            ));
        }

        let driver = self
            .driver_factory
            .create(&self.server_url, &capabilities)
            .await?;
        let session = Arc::new(Session::new(capabilities, driver));

        self.sessions
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .insert(session.id().to_string(), session.clone());

        info!("Session {} created", session.id());
        Ok(session)
    }

    /// Get an active session by id
    pub fn get_session(&self, session_id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::session_closed(session_id.to_string()))
    }

    /// Close a session and drop it from the active-set.
    ///
    /// Idempotent: an unknown or already-closed id is logged and ignored.
    pub async fn close_session(&self, session_id: &str) {
        let session = match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(session_id),
            Err(e) => {
                warn!("Lock error removing session {}: {}", session_id, e);
                None
            }
        };

        match session {
            Some(session) => {
                session.close().await;
                info!("Session {} closed", session_id);
            }
            None => debug!("close_session: {} unknown or already closed", session_id),
        }
    }

    /// Number of sessions in the active-set
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Close every active session, then stop the server.
    ///
    /// Reentrant and infallible; suitable as a process-exit hook.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) {
        info!("Cleaning up sessions and server");

        let sessions: Vec<Arc<Session>> = match self.sessions.write() {
            Ok(mut sessions) => sessions.drain().map(|(_, s)| s).collect(),
            Err(e) => {
                warn!("Lock error during cleanup: {}", e);
                Vec::new()
            }
        };

        for session in sessions {
            session.close().await;
        }

        self.server.lock().await.stop().await;
        info!("Cleanup completed");
    }
}
