//! Configuration management for Mobium

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Framework configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Automation server host address
    pub server_host: String,

    /// Automation server port
    pub server_port: u16,

    /// Base URL path on the automation server
    pub server_base_path: String,

    /// Default timeout for element resolution in milliseconds
    pub default_timeout: u64,

    /// Poll interval for wait loops in milliseconds
    pub poll_interval: u64,

    /// Maximum swipe attempts when scrolling to an element
    pub max_swipes: u32,

    /// Directory for failure artifacts (screenshots, UI dumps, logs)
    pub reports_dir: PathBuf,

    /// Optional log file for the automation server process
    pub server_log_file: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 4723,
            server_base_path: "/wd/hub".to_string(),
            default_timeout: 10_000,
            poll_interval: 100,
            max_swipes: 5,
            reports_dir: PathBuf::from("reports"),
            server_log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = env::var("MOBIUM_SERVER_HOST") {
            config.server_host = host;
        }

        if let Ok(port) = env::var("MOBIUM_SERVER_PORT") {
            config.server_port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid MOBIUM_SERVER_PORT"))?;
        }

        if let Ok(base_path) = env::var("MOBIUM_SERVER_BASE_PATH") {
            config.server_base_path = base_path;
        }

        if let Ok(timeout) = env::var("MOBIUM_DEFAULT_TIMEOUT") {
            config.default_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid MOBIUM_DEFAULT_TIMEOUT"))?;
        }

        if let Ok(interval) = env::var("MOBIUM_POLL_INTERVAL") {
            config.poll_interval = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid MOBIUM_POLL_INTERVAL"))?;
        }

        if let Ok(max_swipes) = env::var("MOBIUM_MAX_SWIPES") {
            config.max_swipes = max_swipes
                .parse()
                .map_err(|_| Error::configuration("Invalid MOBIUM_MAX_SWIPES"))?;
        }

        if let Ok(reports_dir) = env::var("MOBIUM_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(reports_dir);
        }

        if let Ok(log_file) = env::var("MOBIUM_SERVER_LOG_FILE") {
            config.server_log_file = Some(PathBuf::from(log_file));
        }

        if let Ok(log_level) = env::var("MOBIUM_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Full URL of the automation server endpoint
    pub fn server_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.server_host, self.server_port, self.server_base_path
        )
    }
}
