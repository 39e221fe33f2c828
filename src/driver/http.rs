//! W3C WebDriver HTTP client
//!
//! Thin wire client for the remote automation protocol. This is the
//! production implementation of [`DriverSession`]; it maps WebDriver error
//! payloads onto the crate's error taxonomy and does nothing else clever.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::driver::traits::{DriverSession, ElementHandle, Swipe, WindowSize};
use crate::elements::locator::Strategy;
use crate::session::capabilities::Capabilities;
use crate::{Error, Result};

// Key of the element id inside a WebDriver element payload
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    message: String,
}

/// Shared request plumbing between the session and its element handles
#[derive(Debug)]
struct Wire {
    http: reqwest::Client,
    base_url: String,
}

impl Wire {
    async fn command(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("WebDriver command: {} {}", method, path);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: WireResponse = response.json().await?;

        if status.is_success() {
            return Ok(payload.value);
        }

        // Error responses carry {"value": {"error": ..., "message": ...}}
        match serde_json::from_value::<WireError>(payload.value) {
            Ok(err) => Err(map_wire_error(&err.error, &err.message)),
            Err(_) => Err(Error::driver(format!(
                "{} {} returned status {}",
                path, url, status
            ))),
        }
    }
}

/// Map a WebDriver error code onto the crate taxonomy.
///
/// Not-found and stale conditions become the transient variants so that the
/// resolver's fallback loop treats them as retryable.
fn map_wire_error(code: &str, message: &str) -> Error {
    match code {
        "no such element" => Error::element_not_found(message.to_string()),
        "stale element reference" => Error::stale_element(message.to_string()),
        "element not interactable" => Error::element_not_interactable(message.to_string()),
        "timeout" => Error::timeout(message.to_string()),
        "invalid session id" => Error::session_closed(message.to_string()),
        _ => Error::driver(format!("{}: {}", code, message)),
    }
}

/// WebDriver-over-HTTP session
#[derive(Debug)]
pub struct HttpDriver {
    session_id: String,
    wire: Arc<Wire>,
    active: AtomicBool,
}

impl HttpDriver {
    /// Start a new remote session against `server_url` (e.g.
    /// `http://127.0.0.1:4723/wd/hub`) with the given capabilities.
    pub async fn new_session(server_url: &str, capabilities: &Capabilities) -> Result<Self> {
        let wire = Arc::new(Wire {
            http: reqwest::Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        });

        let body = json!({
            "capabilities": {
                "alwaysMatch": capabilities.to_wire(),
            }
        });

        let value = wire
            .command(reqwest::Method::POST, "/session", Some(body))
            .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::driver("New-session response missing sessionId"))?
            .to_string();

        info!("Remote session created: {}", session_id);
        Ok(Self {
            session_id,
            wire,
            active: AtomicBool::new(true),
        })
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    fn check_active(&self) -> Result<()> {
        if self.active.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::session_closed(self.session_id.clone()))
        }
    }
}

#[async_trait]
impl DriverSession for HttpDriver {
    fn id(&self) -> &str {
        &self.session_id
    }

    async fn find_element(
        &self,
        strategy: Strategy,
        value: &str,
    ) -> Result<Arc<dyn ElementHandle>> {
        self.check_active()?;

        let body = json!({
            "using": strategy.as_wire(),
            "value": value,
        });
        let response = self
            .wire
            .command(reqwest::Method::POST, &self.path("/element"), Some(body))
            .await?;

        let element_id = response
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::driver("Find-element response missing element id"))?
            .to_string();

        Ok(Arc::new(HttpElement {
            element_id,
            session_id: self.session_id.clone(),
            wire: self.wire.clone(),
        }))
    }

    async fn window_size(&self) -> Result<WindowSize> {
        self.check_active()?;
        let value = self
            .wire
            .command(reqwest::Method::GET, &self.path("/window/rect"), None)
            .await?;

        let width = value.get("width").and_then(Value::as_u64).unwrap_or(0) as u32;
        let height = value.get("height").and_then(Value::as_u64).unwrap_or(0) as u32;
        Ok(WindowSize { width, height })
    }

    async fn swipe(&self, swipe: &Swipe) -> Result<()> {
        self.check_active()?;

        // W3C pointer action sequence: press, pause for the gesture
        // duration, move, release.
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "finger1",
                "parameters": { "pointerType": "touch" },
                "actions": [
                    { "type": "pointerMove", "duration": 0,
                      "x": swipe.start_x, "y": swipe.start_y },
                    { "type": "pointerDown", "button": 0 },
                    { "type": "pause", "duration": swipe.duration_ms },
                    { "type": "pointerMove", "duration": swipe.duration_ms,
                      "x": swipe.end_x, "y": swipe.end_y },
                    { "type": "pointerUp", "button": 0 }
                ]
            }]
        });

        self.wire
            .command(reqwest::Method::POST, &self.path("/actions"), Some(body))
            .await?;
        Ok(())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.check_active()?;
        let value = self
            .wire
            .command(reqwest::Method::GET, &self.path("/screenshot"), None)
            .await?;

        let encoded = value
            .as_str()
            .ok_or_else(|| Error::driver("Screenshot response is not a string"))?;
        BASE64
            .decode(encoded)
            .map_err(|e| Error::driver(format!("Invalid screenshot payload: {}", e)))
    }

    async fn page_source(&self) -> Result<String> {
        self.check_active()?;
        let value = self
            .wire
            .command(reqwest::Method::GET, &self.path("/source"), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::driver("Page source response is not a string"))
    }

    async fn device_log(&self, log_type: &str) -> Result<Vec<String>> {
        self.check_active()?;
        let body = json!({ "type": log_type });
        let value = self
            .wire
            .command(reqwest::Method::POST, &self.path("/se/log"), Some(body))
            .await?;

        let entries = value
            .as_array()
            .ok_or_else(|| Error::driver("Log response is not an array"))?;
        Ok(entries
            .iter()
            .map(|entry| {
                entry
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect())
    }

    async fn quit(&self) -> Result<()> {
        if !self.active.swap(false, Ordering::Relaxed) {
            debug!("Session {} already closed", self.session_id);
            return Ok(());
        }

        if let Err(e) = self
            .wire
            .command(reqwest::Method::DELETE, &self.path(""), None)
            .await
        {
            warn!("Failed to delete remote session {}: {}", self.session_id, e);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Handle to one remote element
#[derive(Debug)]
struct HttpElement {
    element_id: String,
    session_id: String,
    wire: Arc<Wire>,
}

impl HttpElement {
    fn path(&self, suffix: &str) -> String {
        format!(
            "/session/{}/element/{}{}",
            self.session_id, self.element_id, suffix
        )
    }

    async fn get_bool(&self, suffix: &str) -> Result<bool> {
        let value = self
            .wire
            .command(reqwest::Method::GET, &self.path(suffix), None)
            .await?;
        value
            .as_bool()
            .ok_or_else(|| Error::driver(format!("{} response is not a bool", suffix)))
    }
}

#[async_trait]
impl ElementHandle for HttpElement {
    fn id(&self) -> &str {
        &self.element_id
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.get_bool("/displayed").await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.get_bool("/enabled").await
    }

    async fn click(&self) -> Result<()> {
        self.wire
            .command(reqwest::Method::POST, &self.path("/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.wire
            .command(reqwest::Method::POST, &self.path("/clear"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        let body = json!({ "text": text });
        self.wire
            .command(reqwest::Method::POST, &self.path("/value"), Some(body))
            .await?;
        Ok(())
    }

    async fn text(&self) -> Result<String> {
        let value = self
            .wire
            .command(reqwest::Method::GET, &self.path("/text"), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::driver("Text response is not a string"))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .wire
            .command(
                reqwest::Method::GET,
                &self.path(&format!("/attribute/{}", name)),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_error_mapping() {
        assert!(matches!(
            map_wire_error("no such element", "nope"),
            Error::ElementNotFound(_)
        ));
        assert!(matches!(
            map_wire_error("stale element reference", "gone"),
            Error::StaleElement(_)
        ));
        assert!(matches!(
            map_wire_error("element not interactable", "covered"),
            Error::ElementNotInteractable(_)
        ));
        assert!(matches!(
            map_wire_error("invalid session id", "dead"),
            Error::SessionClosed(_)
        ));
        assert!(matches!(
            map_wire_error("unknown command", "???"),
            Error::Driver(_)
        ));
    }

    #[test]
    fn test_transient_mapping_preserved() {
        // The resolver relies on not-found and stale mapping to the
        // retryable subset.
        assert!(map_wire_error("no such element", "x").is_transient());
        assert!(map_wire_error("stale element reference", "x").is_transient());
        assert!(!map_wire_error("unknown command", "x").is_transient());
    }
}
