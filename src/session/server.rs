//! Automation server process lifecycle
//!
//! [`ServerProcess`] owns the state machine `Stopped -> Starting ->
//! Running -> Stopped`. Process spawning and the listening probe live
//! behind [`ServerBackend`] so the state machine is testable without a
//! real server binary.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Bounded startup poll: 10 attempts, 1s apart
const STARTUP_ATTEMPTS: u32 = 10;
const STARTUP_POLL_DELAY: Duration = Duration::from_secs(1);

/// Server process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
}

/// Launch configuration for the automation server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_path: String,
    /// Server log file; parent directories are created on demand
    pub log_file: Option<PathBuf>,
    /// Additional server flags: `(name, None)` for a bare switch,
    /// `(name, Some(value))` for a valued option. Underscores in names are
    /// normalized to dashes.
    pub extra_args: Vec<(String, Option<String>)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4723,
            base_path: "/wd/hub".to_string(),
            log_file: None,
            extra_args: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Add a bare switch flag
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.extra_args.push((name.into(), None));
        self
    }

    /// Add a valued option flag
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_args.push((name.into(), Some(value.into())));
        self
    }
}

/// Process-level operations behind the server state machine
#[async_trait]
pub trait ServerBackend: Send + Sync + std::fmt::Debug {
    /// Spawn the server process with the given argument list
    async fn spawn(&self, args: &[String]) -> Result<()>;

    /// Whether the server answers its status endpoint
    async fn is_listening(&self, host: &str, port: u16) -> bool;

    /// Install a server plugin
    async fn install_plugin(&self, name: &str) -> Result<()>;

    /// Kill the server process. Idempotent.
    async fn kill(&self) -> Result<()>;
}

/// Real backend: spawns the `appium` binary and polls its `/status`
/// endpoint over HTTP.
#[derive(Debug)]
pub struct AppiumBackend {
    child: Mutex<Option<tokio::process::Child>>,
    http: reqwest::Client,
}

impl AppiumBackend {
    pub fn new() -> Self {
        Self {
            child: Mutex::new(None),
            http: reqwest::Client::new(),
        }
    }
}

impl Default for AppiumBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerBackend for AppiumBackend {
    async fn spawn(&self, args: &[String]) -> Result<()> {
        let child = tokio::process::Command::new("appium")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::startup_failure(format!("Failed to spawn appium: {}", e)))?;
        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn is_listening(&self, host: &str, port: u16) -> bool {
        let url = format!("http://{}:{}/status", host, port);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_millis(900))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn install_plugin(&self, name: &str) -> Result<()> {
        let output = tokio::process::Command::new("appium")
            .args(["plugin", "install", "--source", "npm", name])
            .output()
            .await
            .map_err(|e| Error::environment(format!("Failed to run plugin install: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::environment(format!(
                "Plugin install for {} failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }

    async fn kill(&self) -> Result<()> {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill server process: {}", e);
            }
        }
        Ok(())
    }
}

/// The automation server process owned by one session manager
#[derive(Debug)]
pub struct ServerProcess {
    config: ServerConfig,
    backend: Arc<dyn ServerBackend>,
    state: ServerState,
    plugins: Vec<String>,
}

impl ServerProcess {
    /// Create a server process with an injected backend
    pub fn new(config: ServerConfig, backend: Arc<dyn ServerBackend>) -> Self {
        Self {
            config,
            backend,
            state: ServerState::Stopped,
            plugins: Vec::new(),
        }
    }

    /// Create a server process backed by the real `appium` binary
    pub fn appium(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(AppiumBackend::new()))
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Base URL path sessions are created under
    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    /// Plugins forwarded via `--use-plugins` at startup
    pub fn installed_plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Record a plugin to forward at next start
    pub fn register_plugin(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.plugins.contains(&name) {
            self.plugins.push(name);
        }
    }

    /// Install a plugin and record it for `--use-plugins` forwarding.
    ///
    /// Best-effort: an install failure is logged, never raised, and the
    /// plugin is still registered for the next start.
    pub async fn install_plugin(&mut self, name: &str) {
        match self.backend.install_plugin(name).await {
            Ok(()) => info!("Installed server plugin: {}", name),
            Err(e) => warn!("Failed to install plugin {}: {}", name, e),
        }
        self.register_plugin(name);
    }

    /// Full argument list for the server command line
    pub fn build_args(&self) -> Result<Vec<String>> {
        let mut args = vec![
            "--address".to_string(),
            self.config.host.clone(),
            "--port".to_string(),
            self.config.port.to_string(),
            "--base-path".to_string(),
            self.config.base_path.clone(),
            "--log-timestamp".to_string(),
            "--local-timezone".to_string(),
            "--log-no-colors".to_string(),
        ];

        for (name, value) in &self.config.extra_args {
            args.push(format!("--{}", name.replace('_', "-")));
            if let Some(value) = value {
                args.push(value.clone());
            }
        }

        for plugin in &self.plugins {
            args.push("--use-plugins".to_string());
            args.push(plugin.clone());
        }

        if let Some(log_file) = &self.config.log_file {
            if let Some(parent) = log_file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            args.push("--log".to_string());
            args.push(log_file.to_string_lossy().into_owned());
        }

        Ok(args)
    }

    /// Start the server and wait for it to listen.
    ///
    /// Idempotent: starting while `Running` logs a warning and returns.
    /// On poll exhaustion the child is killed and state reverts to
    /// `Stopped`.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == ServerState::Running {
            warn!(
                "Automation server already running at {}:{}",
                self.config.host, self.config.port
            );
            return Ok(());
        }

        info!(
            "Starting automation server at {}:{}{}",
            self.config.host, self.config.port, self.config.base_path
        );
        self.state = ServerState::Starting;

        let args = self.build_args()?;
        if let Err(e) = self.backend.spawn(&args).await {
            self.state = ServerState::Stopped;
            return Err(e);
        }

        for attempt in 1..=STARTUP_ATTEMPTS {
            if self
                .backend
                .is_listening(&self.config.host, self.config.port)
                .await
            {
                info!(
                    "Automation server listening at http://{}:{}{}",
                    self.config.host, self.config.port, self.config.base_path
                );
                self.state = ServerState::Running;
                return Ok(());
            }
            debug!(
                "Server not listening yet (attempt {}/{})",
                attempt, STARTUP_ATTEMPTS
            );
            tokio::time::sleep(STARTUP_POLL_DELAY).await;
        }

        self.backend.kill().await.ok();
        self.state = ServerState::Stopped;
        Err(Error::startup_failure(format!(
            "Server did not start listening on {}:{} after {} attempts",
            self.config.host, self.config.port, STARTUP_ATTEMPTS
        )))
    }

    /// Stop the server. Idempotent.
    pub async fn stop(&mut self) {
        if self.state == ServerState::Stopped {
            return;
        }
        info!("Stopping automation server");
        if let Err(e) = self.backend.kill().await {
            warn!("Error stopping automation server: {}", e);
        }
        self.state = ServerState::Stopped;
    }
}

/// Scriptable backend for tests: pretends to listen after N polls
#[derive(Debug, Default)]
pub struct MockBackend {
    listening_after_polls: u32,
    spawns: std::sync::atomic::AtomicU32,
    polls: std::sync::atomic::AtomicU32,
    kills: std::sync::atomic::AtomicU32,
    fail_installs: std::sync::atomic::AtomicBool,
    installs: std::sync::Mutex<Vec<String>>,
}

impl MockBackend {
    /// Backend that starts answering after `polls` status probes
    pub fn listening_after(polls: u32) -> Self {
        Self {
            listening_after_polls: polls,
            ..Default::default()
        }
    }

    /// Backend that never starts answering
    pub fn never_listening() -> Self {
        Self::listening_after(u32::MAX)
    }

    /// Make every plugin install fail
    pub fn break_plugin_install(&self) {
        self.fail_installs
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn spawn_count(&self) -> u32 {
        self.spawns.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn kill_count(&self) -> u32 {
        self.kills.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Plugin install attempts received, in order
    pub fn install_attempts(&self) -> Vec<String> {
        self.installs.lock().expect("installs lock poisoned").clone()
    }
}

#[async_trait]
impl ServerBackend for MockBackend {
    async fn spawn(&self, _args: &[String]) -> Result<()> {
        self.spawns
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    async fn is_listening(&self, _host: &str, _port: u16) -> bool {
        let polls = self.polls.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        polls > self.listening_after_polls
    }

    async fn install_plugin(&self, name: &str) -> Result<()> {
        self.installs
            .lock()
            .expect("installs lock poisoned")
            .push(name.to_string());
        if self.fail_installs.load(std::sync::atomic::Ordering::Relaxed) {
            Err(Error::environment(format!(
                "Plugin install for {} failed",
                name
            )))
        } else {
            Ok(())
        }
    }

    async fn kill(&self) -> Result<()> {
        self.kills
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}
