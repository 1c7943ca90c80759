//! W3C WebDriver request and response bodies.
//!
//! Every WebDriver response wraps its payload in a `{"value": ...}` envelope.
//! Failures keep the same envelope but carry an [`ErrorValue`] instead:
//!
//! ```json
//! { "value": { "error": "no such element", "message": "...", "stacktrace": "..." } }
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which WebDriver serializes web element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
	pub value: T,
}

/// Error payload returned by a WebDriver server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorValue {
	/// Error code such as `no such element` or `invalid session id`.
	pub error: String,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing)]
	pub stacktrace: Option<String>,
}

/// `POST /session` body.
#[derive(Debug, Clone, Serialize)]
pub struct NewSessionRequest {
	pub capabilities: Capabilities,
}

impl NewSessionRequest {
	/// Builds a Chrome session request with the given command-line switches.
	pub fn chrome(args: Vec<String>) -> Self {
		Self {
			capabilities: Capabilities {
				always_match: AlwaysMatch {
					browser_name: "chrome".to_string(),
					chrome_options: ChromeOptions { args },
				},
			},
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
	pub always_match: AlwaysMatch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlwaysMatch {
	pub browser_name: String,
	#[serde(rename = "goog:chromeOptions")]
	pub chrome_options: ChromeOptions,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChromeOptions {
	pub args: Vec<String>,
}

/// `POST /session` success payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionValue {
	pub session_id: String,
	#[serde(default)]
	pub capabilities: Value,
}

/// Element lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Using {
	#[serde(rename = "css selector")]
	Css,
	#[serde(rename = "xpath")]
	XPath,
}

/// `POST /session/{id}/element` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
	pub using: Using,
	pub value: String,
}

impl Locator {
	pub fn css(selector: impl Into<String>) -> Self {
		Self {
			using: Using::Css,
			value: selector.into(),
		}
	}

	pub fn xpath(expression: impl Into<String>) -> Self {
		Self {
			using: Using::XPath,
			value: expression.into(),
		}
	}
}

impl std::fmt::Display for Locator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.using {
			Using::Css => write!(f, "css={}", self.value),
			Using::XPath => write!(f, "xpath={}", self.value),
		}
	}
}

/// Web element reference as serialized on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
	#[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
	pub id: String,
}

/// `POST /session/{id}/url` body.
#[derive(Debug, Clone, Serialize)]
pub struct NavigateRequest<'a> {
	pub url: &'a str,
}

/// `POST /session/{id}/element/{eid}/value` body.
#[derive(Debug, Clone, Serialize)]
pub struct SendKeysRequest<'a> {
	pub text: &'a str,
}

/// `POST /session/{id}/execute/sync` body.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptRequest<'a> {
	pub script: &'a str,
	pub args: Vec<Value>,
}

/// A browser cookie in WebDriver's serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

impl Cookie {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			path: None,
			domain: None,
			secure: None,
			http_only: None,
			expiry: None,
			same_site: None,
		}
	}
}

/// `POST /session/{id}/cookie` body.
#[derive(Debug, Clone, Serialize)]
pub struct AddCookieRequest<'a> {
	pub cookie: &'a Cookie,
}

/// `GET /status` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusValue {
	pub ready: bool,
	#[serde(default)]
	pub message: String,
}

/// Decodes a base64 screenshot payload into PNG bytes.
pub fn decode_screenshot(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
	STANDARD.decode(encoded.trim())
}
