//! Browser session seam consumed by the session keeper and status classifier.

use std::time::Duration;

use async_trait::async_trait;
use statusbulb_protocol::{Cookie, ElementRef, Locator};

use crate::error::Result;

/// One live browser automation session.
///
/// Implementations must map "the browser or its driver is gone" onto errors
/// for which [`DriverError::is_transport_fault`](crate::DriverError::is_transport_fault)
/// is `true`; liveness probing relies on it.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
	/// Opaque identifier of the underlying session.
	fn session_id(&self) -> &str;

	async fn navigate(&self, url: &str) -> Result<()>;

	async fn refresh(&self) -> Result<()>;

	/// Finds the first element matching `locator`, polling until `timeout`.
	///
	/// Returns [`DriverError::Timeout`](crate::DriverError::Timeout) when
	/// nothing matched in time.
	async fn find_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef>;

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

	async fn text(&self, element: &ElementRef) -> Result<String>;

	async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

	async fn click(&self, element: &ElementRef) -> Result<()>;

	/// Runs a no-op script; used only to exercise the transport.
	async fn execute_trivial(&self) -> Result<()>;

	async fn cookies(&self) -> Result<Vec<Cookie>>;

	async fn add_cookie(&self, cookie: &Cookie) -> Result<()>;

	/// Captures the viewport as PNG bytes.
	async fn screenshot(&self) -> Result<Vec<u8>>;

	async fn page_source(&self) -> Result<String>;

	/// Ends the session and closes its browser.
	async fn quit(&self) -> Result<()>;
}

/// Creates fresh browser sessions.
#[async_trait]
pub trait DriverFactory: Send + Sync {
	async fn create(&self) -> Result<Box<dyn BrowserDriver>>;
}
