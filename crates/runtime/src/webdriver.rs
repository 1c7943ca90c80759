//! W3C WebDriver client over HTTP.
//!
//! [`WebDriverFactory`] opens sessions against a running driver server
//! (normally the one owned by [`ChromeDriverService`](crate::ChromeDriverService));
//! each [`WebDriverSession`] maps the [`BrowserDriver`] operations onto the
//! session-scoped endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use statusbulb_protocol::{
	AddCookieRequest, Cookie, ElementRef, Envelope, ErrorValue, Locator, NavigateRequest, NewSessionRequest, NewSessionValue, ScriptRequest,
	SendKeysRequest, decode_screenshot,
};
use tracing::{debug, trace};

use crate::driver::{BrowserDriver, DriverFactory};
use crate::error::{DriverError, Result};

/// Default HTTP timeout for a single WebDriver command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between element lookups while waiting for an element.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Thin JSON-over-HTTP caller shared by the factory and its sessions.
#[derive(Debug, Clone)]
struct Wire {
	http: Client,
	base_url: String,
}

impl Wire {
	fn new(base_url: &str, command_timeout: Duration) -> Result<Self> {
		let http = Client::builder()
			.timeout(command_timeout)
			.build()
			.map_err(|e| DriverError::Launch(format!("Failed to create HTTP client: {}", e)))?;
		Ok(Self {
			http,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	async fn call<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
		let url = format!("{}{}", self.base_url, path);
		trace!(target = "statusbulb.webdriver", %method, %url, "request");

		let mut request = self.http.request(method, &url);
		if let Some(body) = body {
			request = request.json(&body);
		}
		let response = request.send().await?;
		let status = response.status();
		let text = response.text().await?;

		if !status.is_success() {
			return Err(match serde_json::from_str::<Envelope<ErrorValue>>(&text) {
				Ok(envelope) => DriverError::Command {
					code: envelope.value.error,
					message: envelope.value.message,
				},
				Err(_) => DriverError::Protocol(format!("HTTP {} from {}: {}", status, url, truncate(&text, 200))),
			});
		}

		serde_json::from_str::<Envelope<T>>(&text)
			.map(|envelope| envelope.value)
			.map_err(|e| DriverError::Protocol(format!("Failed to parse response from {}: {}", url, e)))
	}
}

fn truncate(text: &str, max: usize) -> &str {
	match text.char_indices().nth(max) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

fn to_body<T: serde::Serialize>(body: &T) -> Result<Value> {
	serde_json::to_value(body).map_err(|e| DriverError::Protocol(format!("Failed to encode request: {}", e)))
}

/// Opens Chrome sessions on a WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
	wire: Wire,
	chrome_args: Vec<String>,
	poll_interval: Duration,
}

impl WebDriverFactory {
	/// Creates a factory for the server at `base_url` (e.g. `http://127.0.0.1:9515`).
	pub fn new(base_url: &str, chrome_args: Vec<String>) -> Result<Self> {
		Ok(Self {
			wire: Wire::new(base_url, DEFAULT_COMMAND_TIMEOUT)?,
			chrome_args,
			poll_interval: DEFAULT_POLL_INTERVAL,
		})
	}

	/// Overrides the element polling interval.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	/// Chrome switches for an unattended session.
	pub fn default_chrome_args(headless: bool) -> Vec<String> {
		let mut args = vec!["--disable-gpu".to_string(), "--no-first-run".to_string(), "--no-default-browser-check".to_string()];
		if headless {
			args.push("--headless=new".to_string());
			args.push("--window-size=1280,900".to_string());
		}
		args
	}

	/// Opens a new session and returns the concrete handle.
	pub async fn open(&self) -> Result<WebDriverSession> {
		let body = to_body(&NewSessionRequest::chrome(self.chrome_args.clone()))?;
		let created: NewSessionValue = self.wire.call(Method::POST, "/session", Some(body)).await?;
		debug!(target = "statusbulb.webdriver", session_id = %created.session_id, "webdriver session created");
		Ok(WebDriverSession {
			wire: self.wire.clone(),
			session_id: created.session_id,
			poll_interval: self.poll_interval,
		})
	}
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
	async fn create(&self) -> Result<Box<dyn BrowserDriver>> {
		Ok(Box::new(self.open().await?))
	}
}

/// One WebDriver session.
#[derive(Debug)]
pub struct WebDriverSession {
	wire: Wire,
	session_id: String,
	poll_interval: Duration,
}

impl WebDriverSession {
	fn path(&self, suffix: &str) -> String {
		format!("/session/{}{}", self.session_id, suffix)
	}

	async fn command<T: DeserializeOwned>(&self, method: Method, suffix: &str, body: Option<Value>) -> Result<T> {
		self.wire.call(method, &self.path(suffix), body).await
	}

	async fn command_unit(&self, method: Method, suffix: &str, body: Option<Value>) -> Result<()> {
		self.command::<Value>(method, suffix, body).await.map(|_| ())
	}
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
	fn session_id(&self) -> &str {
		&self.session_id
	}

	async fn navigate(&self, url: &str) -> Result<()> {
		let body = to_body(&NavigateRequest { url })?;
		self.command_unit(Method::POST, "/url", Some(body)).await
	}

	async fn refresh(&self) -> Result<()> {
		self.command_unit(Method::POST, "/refresh", Some(Value::Object(Default::default()))).await
	}

	async fn find_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef> {
		let body = to_body(locator)?;
		let started = tokio::time::Instant::now();
		loop {
			match self.command::<ElementRef>(Method::POST, "/element", Some(body.clone())).await {
				Ok(element) => return Ok(element),
				Err(err) if err.is_no_such_element() => {
					if started.elapsed() >= timeout {
						return Err(DriverError::Timeout {
							ms: timeout.as_millis() as u64,
							condition: locator.to_string(),
						});
					}
					tokio::time::sleep(self.poll_interval).await;
				}
				Err(err) => return Err(err),
			}
		}
	}

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
		self.command(Method::GET, &format!("/element/{}/attribute/{}", element.id, name), None).await
	}

	async fn text(&self, element: &ElementRef) -> Result<String> {
		self.command(Method::GET, &format!("/element/{}/text", element.id), None).await
	}

	async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
		let body = to_body(&SendKeysRequest { text })?;
		self.command_unit(Method::POST, &format!("/element/{}/value", element.id), Some(body)).await
	}

	async fn click(&self, element: &ElementRef) -> Result<()> {
		self.command_unit(Method::POST, &format!("/element/{}/click", element.id), Some(Value::Object(Default::default())))
			.await
	}

	async fn execute_trivial(&self) -> Result<()> {
		let body = to_body(&ScriptRequest {
			script: "return 1;",
			args: Vec::new(),
		})?;
		self.command_unit(Method::POST, "/execute/sync", Some(body)).await
	}

	async fn cookies(&self) -> Result<Vec<Cookie>> {
		self.command(Method::GET, "/cookie", None).await
	}

	async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
		let body = to_body(&AddCookieRequest { cookie })?;
		self.command_unit(Method::POST, "/cookie", Some(body)).await
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		let encoded: String = self.command(Method::GET, "/screenshot", None).await?;
		decode_screenshot(&encoded).map_err(|e| DriverError::Protocol(format!("Invalid screenshot payload: {}", e)))
	}

	async fn page_source(&self) -> Result<String> {
		self.command(Method::GET, "/source", None).await
	}

	async fn quit(&self) -> Result<()> {
		debug!(target = "statusbulb.webdriver", session_id = %self.session_id, "deleting webdriver session");
		self.command_unit(Method::DELETE, "", None).await
	}
}
