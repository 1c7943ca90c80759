//! The interactive sign-in sequence run against a fresh browser session.

use std::time::Duration;

use statusbulb_runtime::{BrowserDriver, DriverError, Locator};
use tracing::{debug, info};

use crate::error::SessionError;

/// Account used to sign in.
#[derive(Clone)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl Credentials {
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			password: password.into(),
		}
	}
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Elements the sign-in sequence interacts with.
#[derive(Debug, Clone)]
pub struct LoginSelectors {
	pub email_input: Locator,
	pub email_submit: Locator,
	pub password_input: Locator,
	pub password_submit: Locator,
	/// Element whose text is the number to approve on the second factor.
	pub mfa_code: Locator,
	pub stay_signed_in: Locator,
	/// Present once the target page has loaded.
	pub page_marker: Locator,
}

impl Default for LoginSelectors {
	fn default() -> Self {
		Self {
			email_input: Locator::css("input[type='email']"),
			email_submit: Locator::css("#idSIButton9"),
			password_input: Locator::css("input[type='password']"),
			password_submit: Locator::css("#idSIButton9"),
			mfa_code: Locator::css("#idRichContext_DisplaySign"),
			stay_signed_in: Locator::css("#idSIButton9"),
			page_marker: Locator::css("body"),
		}
	}
}

/// Bounded waits used by the sign-in sequence.
#[derive(Debug, Clone, Copy)]
pub struct LoginTimeouts {
	pub step: Duration,
	pub mfa_poll: Duration,
	pub stay_signed_in: Duration,
	pub page_marker: Duration,
}

impl Default for LoginTimeouts {
	fn default() -> Self {
		Self {
			step: Duration::from_secs(30),
			mfa_poll: Duration::from_secs(5),
			stay_signed_in: Duration::from_secs(5),
			page_marker: Duration::from_secs(60),
		}
	}
}

/// Types `text` into the field at `input`, then clicks `submit`.
pub(crate) async fn fill_and_submit(
	driver: &dyn BrowserDriver,
	step: &'static str,
	input: &Locator,
	submit: &Locator,
	text: &str,
	timeout: Duration,
) -> Result<(), SessionError> {
	let failed = |source: DriverError| SessionError::AuthFailed { step, source };

	let field = driver.find_element(input, timeout).await.map_err(failed)?;
	driver.send_keys(&field, text).await.map_err(failed)?;
	let button = driver.find_element(submit, timeout).await.map_err(failed)?;
	driver.click(&button).await.map_err(failed)?;
	debug!(target = "statusbulb.session", step, "login step submitted");
	Ok(())
}

/// Reads the second-factor code once; empty text counts as not shown yet.
pub(crate) async fn read_mfa_code(driver: &dyn BrowserDriver, locator: &Locator, timeout: Duration) -> Result<String, DriverError> {
	let element = driver.find_element(locator, timeout).await?;
	let code = driver.text(&element).await?;
	let code = code.trim();
	if code.is_empty() {
		return Err(DriverError::Protocol(format!("{locator} has no text yet")));
	}
	Ok(code.to_string())
}

/// Clicks the "stay signed in" prompt if it shows up.
pub(crate) async fn confirm_stay_signed_in(driver: &dyn BrowserDriver, locator: &Locator, timeout: Duration) {
	let clicked = match driver.find_element(locator, timeout).await {
		Ok(button) => driver.click(&button).await,
		Err(err) => Err(err),
	};
	match clicked {
		Ok(()) => info!(target = "statusbulb.session", "confirmed stay signed in"),
		Err(err) => debug!(target = "statusbulb.session", error = %err, "no stay-signed-in prompt"),
	}
}

pub(crate) async fn wait_for_marker(driver: &dyn BrowserDriver, marker: &Locator, timeout: Duration) -> Result<(), SessionError> {
	driver
		.find_element(marker, timeout)
		.await
		.map(|_| ())
		.map_err(SessionError::MarkerMissing)
}

#[cfg(test)]
mod tests {
	use statusbulb_runtime::fake::{BrowserEvent, FakeBrowser};

	use super::*;

	#[tokio::test]
	async fn fill_and_submit_types_then_clicks() {
		let sel = LoginSelectors::default();
		let browser = FakeBrowser::new("s1")
			.with_element(&sel.email_input, &[], "")
			.with_element(&sel.email_submit, &[], "");

		fill_and_submit(&browser, "email", &sel.email_input, &sel.email_submit, "me@example.com", Duration::from_secs(1))
			.await
			.unwrap();

		assert_eq!(
			browser.events(),
			vec![
				BrowserEvent::SendKeys {
					locator: sel.email_input.to_string(),
					text: "me@example.com".to_string(),
				},
				BrowserEvent::Click(sel.email_submit.to_string()),
			]
		);
	}

	#[tokio::test]
	async fn missing_field_names_the_step() {
		let sel = LoginSelectors::default();
		let browser = FakeBrowser::new("s1");
		let err = fill_and_submit(&browser, "password", &sel.password_input, &sel.password_submit, "pw", Duration::from_secs(1))
			.await
			.unwrap_err();
		assert!(matches!(err, SessionError::AuthFailed { step: "password", .. }));
	}

	#[tokio::test]
	async fn blank_mfa_text_is_not_a_code() {
		let sel = LoginSelectors::default();
		let browser = FakeBrowser::new("s1").with_element(&sel.mfa_code, &[], "  ");
		assert!(read_mfa_code(&browser, &sel.mfa_code, Duration::from_secs(1)).await.is_err());
	}

	#[test]
	fn credentials_debug_hides_password() {
		let rendered = format!("{:?}", Credentials::new("me@example.com", "hunter2"));
		assert!(rendered.contains("me@example.com"));
		assert!(!rendered.contains("hunter2"));
	}
}
