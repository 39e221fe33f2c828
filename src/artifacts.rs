//! Failure artifact capture
//!
//! On a test failure the driver still holds a live view of the device, so
//! capture what it can see before teardown: a screenshot, the UI hierarchy
//! dump, and the device log. Each artifact is captured independently; one
//! failing channel never blocks the others.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::driver::traits::DriverSession;
use crate::Result;

/// Where in the test lifecycle the failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Call => "call",
            Phase::Teardown => "teardown",
        }
    }
}

/// Kind of captured artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Screenshot,
    UiTreeDump,
    DeviceLog,
}

impl ArtifactKind {
    fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Screenshot => "screenshot",
            ArtifactKind::UiTreeDump => "ui_tree",
            ArtifactKind::DeviceLog => "device_log",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Screenshot => "png",
            ArtifactKind::UiTreeDump => "xml",
            ArtifactKind::DeviceLog => "log",
        }
    }
}

/// One artifact written to disk
#[derive(Debug, Clone)]
pub struct FailureArtifact {
    pub test_id: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Captures failure artifacts into a per-failure directory
#[derive(Debug, Clone)]
pub struct FailureArtifactCapture {
    reports_dir: PathBuf,
    /// Device log channel to pull, e.g. "logcat" or "syslog"
    log_type: String,
}

impl FailureArtifactCapture {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            log_type: "logcat".to_string(),
        }
    }

    pub fn with_log_type(mut self, log_type: impl Into<String>) -> Self {
        self.log_type = log_type.into();
        self
    }

    /// Capture all artifacts for a failed test.
    ///
    /// Returns whatever was successfully written. Capture errors are logged
    /// and skipped so a broken driver channel cannot mask the original
    /// test failure.
    #[instrument(skip(self, driver), fields(test = test_id, phase = phase.as_str()))]
    pub async fn capture(
        &self,
        test_id: &str,
        phase: Phase,
        driver: &Arc<dyn DriverSession>,
    ) -> Vec<FailureArtifact> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let dir = self.reports_dir.join(format!("{}_{}", test_id, timestamp));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to create artifact directory {:?}: {}", dir, e);
            return Vec::new();
        }

        let mut artifacts = Vec::new();

        match driver.screenshot_png().await {
            Ok(png) => {
                if let Some(artifact) = self.write_artifact(
                    &dir,
                    test_id,
                    phase,
                    ArtifactKind::Screenshot,
                    &png,
                ) {
                    artifacts.push(artifact);
                }
            }
            Err(e) => warn!("Screenshot capture failed for {}: {}", test_id, e),
        }

        match driver.page_source().await {
            Ok(source) => {
                if let Some(artifact) = self.write_artifact(
                    &dir,
                    test_id,
                    phase,
                    ArtifactKind::UiTreeDump,
                    source.as_bytes(),
                ) {
                    artifacts.push(artifact);
                }
            }
            Err(e) => warn!("UI tree capture failed for {}: {}", test_id, e),
        }

        match driver.device_log(&self.log_type).await {
            Ok(lines) => {
                let body = lines.join("\n");
                if let Some(artifact) = self.write_artifact(
                    &dir,
                    test_id,
                    phase,
                    ArtifactKind::DeviceLog,
                    body.as_bytes(),
                ) {
                    artifacts.push(artifact);
                }
            }
            Err(e) => warn!("Device log capture failed for {}: {}", test_id, e),
        }

        info!(
            "Captured {} artifact(s) for {} into {:?}",
            artifacts.len(),
            test_id,
            dir
        );
        artifacts
    }

    fn write_artifact(
        &self,
        dir: &Path,
        test_id: &str,
        phase: Phase,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Option<FailureArtifact> {
        let file_name = format!(
            "{}_{}_{}.{}",
            test_id,
            phase.as_str(),
            kind.as_str(),
            kind.extension()
        );
        let path = dir.join(file_name);

        match std::fs::write(&path, bytes) {
            Ok(()) => Some(FailureArtifact {
                test_id: test_id.to_string(),
                kind,
                path,
            }),
            Err(e) => {
                warn!("Failed to write {:?} artifact to {:?}: {}", kind, path, e);
                None
            }
        }
    }
}

/// Capture artifacts using the default reports directory from config
pub async fn capture_failure(
    reports_dir: impl Into<PathBuf>,
    test_id: &str,
    phase: Phase,
    driver: &Arc<dyn DriverSession>,
) -> Result<Vec<FailureArtifact>> {
    Ok(FailureArtifactCapture::new(reports_dir)
        .capture(test_id, phase, driver)
        .await)
}
