//! Error types for the browser and bulb drivers.

use std::time::Duration;

use thiserror::Error;

/// Result alias for WebDriver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// WebDriver error codes that mean the session itself is gone.
const SESSION_GONE_CODES: &[&str] = &["invalid session id", "no such window", "session not created", "disconnected"];

/// `unknown error` messages chromedriver uses when the browser died underneath it.
const BROWSER_GONE_MESSAGES: &[&str] = &["chrome not reachable", "not connected to devtools", "target window already closed"];

/// Failure talking to a WebDriver server.
#[derive(Debug, Error)]
pub enum DriverError {
	/// The HTTP exchange itself failed (refused, reset, timed out).
	#[error("webdriver transport failure: {0}")]
	Transport(String),

	/// The server answered with a WebDriver error payload.
	#[error("webdriver error `{code}`: {message}")]
	Command { code: String, message: String },

	/// A bounded wait elapsed without the condition becoming true.
	#[error("timed out after {ms}ms waiting for {condition}")]
	Timeout { ms: u64, condition: String },

	/// The server answered with something that is not a WebDriver payload.
	#[error("malformed webdriver response: {0}")]
	Protocol(String),

	/// The driver process could not be started.
	#[error("failed to launch webdriver: {0}")]
	Launch(String),
}

impl DriverError {
	/// Returns `true` when the failure means the session's transport is gone,
	/// as opposed to an application-level error inside a healthy session.
	pub fn is_transport_fault(&self) -> bool {
		match self {
			DriverError::Transport(_) => true,
			DriverError::Command { code, message } => {
				if SESSION_GONE_CODES.contains(&code.as_str()) {
					return true;
				}
				let message = message.to_ascii_lowercase();
				code == "unknown error" && BROWSER_GONE_MESSAGES.iter().any(|m| message.contains(m))
			}
			DriverError::Timeout { .. } | DriverError::Protocol(_) | DriverError::Launch(_) => false,
		}
	}

	/// Returns `true` for the `no such element` WebDriver error.
	pub fn is_no_such_element(&self) -> bool {
		matches!(self, DriverError::Command { code, .. } if code == "no such element")
	}
}

impl From<reqwest::Error> for DriverError {
	fn from(err: reqwest::Error) -> Self {
		DriverError::Transport(err.to_string())
	}
}

/// Failure talking to a Yeelight bulb.
#[derive(Debug, Error)]
pub enum LightError {
	#[error("bulb i/o failure: {0}")]
	Io(#[from] std::io::Error),

	#[error("bulb did not answer within {0:?}")]
	Timeout(Duration),

	/// The bulb answered with an error object, e.g. when it is busy.
	#[error("bulb rejected command (code {code}): {message}")]
	Reply { code: i64, message: String },

	#[error("malformed bulb reply: {0}")]
	Protocol(String),
}
