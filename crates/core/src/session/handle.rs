use statusbulb_runtime::{BrowserDriver, Cookie};
use tracing::debug;

/// One browser session owned by the sync loop.
///
/// Alongside the driver it keeps the cookie jar captured the last time the
/// session was known to be signed in, so a later recreate still has
/// something to replay when the browser can no longer be asked.
pub struct SessionHandle {
	driver: Box<dyn BrowserDriver>,
	saved_jar: Vec<Cookie>,
}

impl std::fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHandle")
			.field("session_id", &self.driver.session_id())
			.field("saved_cookies", &self.saved_jar.len())
			.finish()
	}
}

impl SessionHandle {
	pub fn new(driver: Box<dyn BrowserDriver>) -> Self {
		Self {
			driver,
			saved_jar: Vec::new(),
		}
	}

	pub fn driver(&self) -> &dyn BrowserDriver {
		self.driver.as_ref()
	}

	pub fn session_id(&self) -> &str {
		self.driver.session_id()
	}

	pub fn saved_jar(&self) -> &[Cookie] {
		&self.saved_jar
	}

	/// Refreshes the saved jar from the browser; keeps the old one on failure.
	pub async fn save_jar(&mut self) {
		match self.driver.cookies().await {
			Ok(cookies) => {
				debug!(target = "statusbulb.session", session_id = self.session_id(), count = cookies.len(), "cookie jar saved");
				self.saved_jar = cookies;
			}
			Err(err) => debug!(target = "statusbulb.session", error = %err, "cookie jar not saved"),
		}
	}

	/// Current cookies if the browser still answers, otherwise the saved jar.
	pub async fn harvest_jar(&self) -> Vec<Cookie> {
		match self.driver.cookies().await {
			Ok(cookies) => cookies,
			Err(err) => {
				debug!(
					target = "statusbulb.session",
					error = %err,
					saved = self.saved_jar.len(),
					"live cookie read failed; using saved jar"
				);
				self.saved_jar.clone()
			}
		}
	}

	pub(crate) fn into_driver(self) -> Box<dyn BrowserDriver> {
		self.driver
	}
}
