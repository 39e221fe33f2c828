//! Session capabilities
//!
//! The remote protocol accepts an open-ended key set, so capabilities are a
//! validated mapping: the keys this framework understands are typed fields,
//! and everything else goes through the `extra` passthrough untouched.

use serde_json::{json, Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::{Error, Result};

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// Parse a user-supplied platform name
    pub fn parse(value: &str) -> Result<Platform> {
        match value.to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" | "iphone" | "ipad" => Ok(Platform::Ios),
            other => Err(Error::invalid_platform(other.to_string())),
        }
    }

    /// The `platformName` value sent over the wire
    pub fn as_wire(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
        }
    }

    /// Default automation engine for this platform
    pub fn default_automation(&self) -> &'static str {
        match self {
            Platform::Android => "UiAutomator2",
            Platform::Ios => "XCUITest",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Capability mapping for one session.
///
/// Recognized keys are typed; unrecognized keys pass through `extra`
/// verbatim (vendor-prefixed automatically on the wire).
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub platform: Platform,
    pub device_name: String,
    pub automation_name: Option<String>,
    /// Filesystem path to the installable app artifact
    pub app: Option<PathBuf>,
    pub app_package: Option<String>,
    pub app_activity: Option<String>,
    pub bundle_id: Option<String>,
    pub udid: Option<String>,
    pub no_reset: Option<bool>,
    pub full_reset: Option<bool>,
    pub new_command_timeout_secs: Option<u64>,
    pub auto_grant_permissions: Option<bool>,
    pub auto_accept_alerts: Option<bool>,
    pub auto_dismiss_alerts: Option<bool>,
    /// Passthrough keys forwarded as-is
    pub extra: Map<String, Value>,
}

impl Capabilities {
    /// Create capabilities for a platform and device
    pub fn new(platform: Platform, device_name: impl Into<String>) -> Self {
        Self {
            platform,
            device_name: device_name.into(),
            automation_name: None,
            app: None,
            app_package: None,
            app_activity: None,
            bundle_id: None,
            udid: None,
            no_reset: None,
            full_reset: None,
            new_command_timeout_secs: None,
            auto_grant_permissions: None,
            auto_accept_alerts: None,
            auto_dismiss_alerts: None,
            extra: Map::new(),
        }
    }

    pub fn with_app(mut self, app: impl Into<PathBuf>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_app_package(mut self, package: impl Into<String>) -> Self {
        self.app_package = Some(package.into());
        self
    }

    pub fn with_app_activity(mut self, activity: impl Into<String>) -> Self {
        self.app_activity = Some(activity.into());
        self
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = Some(bundle_id.into());
        self
    }

    pub fn with_udid(mut self, udid: impl Into<String>) -> Self {
        self.udid = Some(udid.into());
        self
    }

    pub fn with_automation(mut self, name: impl Into<String>) -> Self {
        self.automation_name = Some(name.into());
        self
    }

    /// Set an unrecognized passthrough capability
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Validate platform/key consistency.
    ///
    /// Android sessions must not carry a bundle id; iOS sessions must not
    /// carry a package/activity pair.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::configuration("deviceName must be non-empty"));
        }
        match self.platform {
            Platform::Android if self.bundle_id.is_some() => Err(Error::configuration(
                "bundleId is an iOS capability; use appPackage/appActivity on Android",
            )),
            Platform::Ios if self.app_package.is_some() || self.app_activity.is_some() => {
                Err(Error::configuration(
                    "appPackage/appActivity are Android capabilities; use bundleId on iOS",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Build the W3C `alwaysMatch` object.
    ///
    /// `platformName` is a standard capability; every other recognized key
    /// and all passthrough keys are vendor-prefixed unless already
    /// namespaced.
    pub fn to_wire(&self) -> Value {
        let mut caps = Map::new();
        caps.insert("platformName".to_string(), json!(self.platform.as_wire()));
        caps.insert(
            "appium:deviceName".to_string(),
            json!(self.device_name.clone()),
        );
        caps.insert(
            "appium:automationName".to_string(),
            json!(self
                .automation_name
                .clone()
                .unwrap_or_else(|| self.platform.default_automation().to_string())),
        );

        if let Some(app) = &self.app {
            caps.insert("appium:app".to_string(), json!(app.to_string_lossy()));
        }
        if let Some(package) = &self.app_package {
            caps.insert("appium:appPackage".to_string(), json!(package));
        }
        if let Some(activity) = &self.app_activity {
            caps.insert("appium:appActivity".to_string(), json!(activity));
        }
        if let Some(bundle_id) = &self.bundle_id {
            caps.insert("appium:bundleId".to_string(), json!(bundle_id));
        }
        if let Some(udid) = &self.udid {
            caps.insert("appium:udid".to_string(), json!(udid));
        }
        if let Some(no_reset) = self.no_reset {
            caps.insert("appium:noReset".to_string(), json!(no_reset));
        }
        if let Some(full_reset) = self.full_reset {
            caps.insert("appium:fullReset".to_string(), json!(full_reset));
        }
        if let Some(timeout) = self.new_command_timeout_secs {
            caps.insert("appium:newCommandTimeout".to_string(), json!(timeout));
        }
        if let Some(grant) = self.auto_grant_permissions {
            caps.insert("appium:autoGrantPermissions".to_string(), json!(grant));
        }
        if let Some(accept) = self.auto_accept_alerts {
            caps.insert("appium:autoAcceptAlerts".to_string(), json!(accept));
        }
        if let Some(dismiss) = self.auto_dismiss_alerts {
            caps.insert("appium:autoDismissAlerts".to_string(), json!(dismiss));
        }

        for (key, value) in &self.extra {
            let wire_key = if key.contains(':') || key == "platformName" || key == "browserName" {
                key.clone()
            } else {
                format!("appium:{}", key)
            };
            caps.insert(wire_key, value.clone());
        }

        Value::Object(caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("android").unwrap(), Platform::Android);
        assert_eq!(Platform::parse("Android").unwrap(), Platform::Android);
        assert_eq!(Platform::parse("ios").unwrap(), Platform::Ios);
        assert_eq!(Platform::parse("iPad").unwrap(), Platform::Ios);
        assert!(matches!(
            Platform::parse("windows").unwrap_err(),
            Error::InvalidPlatform(_)
        ));
    }

    #[test]
    fn test_android_wire_caps() {
        let caps = Capabilities::new(Platform::Android, "emulator-5554")
            .with_app("/apps/demo.apk")
            .with_app_package("com.example.app")
            .with_app_activity(".MainActivity");

        let wire = caps.to_wire();
        assert_eq!(wire["platformName"], "Android");
        assert_eq!(wire["appium:deviceName"], "emulator-5554");
        assert_eq!(wire["appium:automationName"], "UiAutomator2");
        assert_eq!(wire["appium:appPackage"], "com.example.app");
        assert_eq!(wire["appium:app"], "/apps/demo.apk");
    }

    #[test]
    fn test_ios_defaults() {
        let caps =
            Capabilities::new(Platform::Ios, "iPhone 15").with_bundle_id("com.example.Demo");
        let wire = caps.to_wire();
        assert_eq!(wire["platformName"], "iOS");
        assert_eq!(wire["appium:automationName"], "XCUITest");
        assert_eq!(wire["appium:bundleId"], "com.example.Demo");
    }

    #[test]
    fn test_passthrough_prefixing() {
        let caps = Capabilities::new(Platform::Android, "device")
            .set("waitForIdleTimeout", json!(100))
            .set("appium:skipServerInstallation", json!(true));

        let wire = caps.to_wire();
        assert_eq!(wire["appium:waitForIdleTimeout"], 100);
        assert_eq!(wire["appium:skipServerInstallation"], true);
    }

    #[test]
    fn test_validate_platform_key_consistency() {
        let bad = Capabilities::new(Platform::Android, "device").with_bundle_id("com.x.Y");
        assert!(bad.validate().is_err());

        let bad = Capabilities::new(Platform::Ios, "iPhone").with_app_package("com.x");
        assert!(bad.validate().is_err());

        let good = Capabilities::new(Platform::Android, "device").with_app_package("com.x");
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_reset_and_dialog_caps() {
        let mut caps = Capabilities::new(Platform::Android, "device");
        caps.no_reset = Some(true);
        caps.new_command_timeout_secs = Some(300);
        caps.auto_grant_permissions = Some(true);

        let wire = caps.to_wire();
        assert_eq!(wire["appium:noReset"], true);
        assert_eq!(wire["appium:newCommandTimeout"], 300);
        assert_eq!(wire["appium:autoGrantPermissions"], true);
    }
}
