//! Owns the browser session from first sign-in to disposal.

use std::sync::Arc;
use std::time::Duration;

use statusbulb_runtime::{BrowserDriver, DisabledNotifier, DriverFactory, Notifier};
use tracing::{debug, info, warn};

use super::handle::SessionHandle;
use super::login::{self, Credentials, LoginSelectors, LoginTimeouts};
use crate::backoff::{Backoff, RetryError};
use crate::diagnostics::{Diagnostics, SnapshotTag};
use crate::error::SessionError;
use crate::shutdown::ShutdownSignal;

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
	Alive,
	Dead,
}

/// Static inputs of the session keeper.
#[derive(Debug, Clone)]
pub struct SessionSettings {
	pub target_url: String,
	pub credentials: Credentials,
	pub selectors: LoginSelectors,
	pub timeouts: LoginTimeouts,
	pub mfa_backoff: Backoff,
}

impl SessionSettings {
	pub fn new(target_url: impl Into<String>, credentials: Credentials) -> Self {
		Self {
			target_url: target_url.into(),
			credentials,
			selectors: LoginSelectors::default(),
			timeouts: LoginTimeouts::default(),
			mfa_backoff: Backoff::new(5, Duration::from_secs(1), Duration::from_secs(60)),
		}
	}
}

/// Creates, signs in, probes and replaces browser sessions.
pub struct SessionKeeper<F> {
	factory: F,
	settings: SessionSettings,
	notifier: Arc<dyn Notifier>,
	relay_number: Option<String>,
	diagnostics: Diagnostics,
	shutdown: ShutdownSignal,
}

impl<F> std::fmt::Debug for SessionKeeper<F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionKeeper")
			.field("settings", &self.settings)
			.field("relay_number", &self.relay_number)
			.field("diagnostics", &self.diagnostics)
			.finish_non_exhaustive()
	}
}

impl<F: DriverFactory> SessionKeeper<F> {
	pub fn new(factory: F, settings: SessionSettings) -> Self {
		Self {
			factory,
			settings,
			notifier: Arc::new(DisabledNotifier),
			relay_number: None,
			diagnostics: Diagnostics::disabled(),
			shutdown: ShutdownSignal::never(),
		}
	}

	/// Relays second-factor codes to `number` through `notifier`.
	pub fn with_relay(mut self, notifier: Arc<dyn Notifier>, number: Option<String>) -> Self {
		self.notifier = notifier;
		self.relay_number = number;
		self
	}

	pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
		self.diagnostics = diagnostics;
		self
	}

	pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
		self.shutdown = shutdown;
		self
	}

	/// Opens a session and runs the full sign-in sequence on it.
	///
	/// On failure the half-built session is quit and a snapshot is written.
	pub async fn authenticate(&self) -> Result<SessionHandle, SessionError> {
		let driver = self.factory.create().await.map_err(SessionError::Create)?;
		info!(target = "statusbulb.session", session_id = driver.session_id(), "session created; signing in");

		let signed_in = async {
			driver
				.navigate(&self.settings.target_url)
				.await
				.map_err(|source| SessionError::AuthFailed { step: "navigate", source })?;
			self.sign_in(driver.as_ref()).await
		}
		.await;

		if let Err(err) = signed_in {
			warn!(target = "statusbulb.session", error = %err, "authentication failed");
			self.diagnostics.capture(driver.as_ref(), SnapshotTag::AuthFailure).await;
			self.quit_quietly(driver.as_ref()).await;
			return Err(err);
		}

		let mut handle = SessionHandle::new(driver);
		handle.save_jar().await;
		info!(target = "statusbulb.session", session_id = handle.session_id(), "signed in");
		Ok(handle)
	}

	async fn sign_in(&self, driver: &dyn BrowserDriver) -> Result<(), SessionError> {
		let SessionSettings {
			credentials,
			selectors,
			timeouts,
			..
		} = &self.settings;

		login::fill_and_submit(driver, "email", &selectors.email_input, &selectors.email_submit, &credentials.email, timeouts.step).await?;
		login::fill_and_submit(
			driver,
			"password",
			&selectors.password_input,
			&selectors.password_submit,
			&credentials.password,
			timeouts.step,
		)
		.await?;

		if let Some(code) = self.resolve_mfa(driver).await {
			self.relay_code(&code).await;
		}

		login::confirm_stay_signed_in(driver, &selectors.stay_signed_in, timeouts.stay_signed_in).await;
		login::wait_for_marker(driver, &selectors.page_marker, timeouts.page_marker).await
	}

	/// Polls for the second-factor code with the shared backoff.
	///
	/// Exhaustion is not an error: a snapshot is written and `None` returned.
	pub async fn resolve_mfa(&self, driver: &dyn BrowserDriver) -> Option<String> {
		let SessionSettings {
			selectors,
			timeouts,
			mfa_backoff,
			..
		} = &self.settings;

		let polled = mfa_backoff
			.retry("mfa code", &self.shutdown, |_| login::read_mfa_code(driver, &selectors.mfa_code, timeouts.mfa_poll))
			.await;

		match polled {
			Ok(code) => {
				info!(target = "statusbulb.session", "second-factor code displayed");
				Some(code)
			}
			Err(RetryError::Exhausted { attempts, .. }) => {
				warn!(target = "statusbulb.session", attempts, "no second-factor code found; continuing");
				self.diagnostics.capture(driver, SnapshotTag::MfaFailure).await;
				None
			}
			Err(RetryError::Cancelled { .. }) => None,
		}
	}

	async fn relay_code(&self, code: &str) {
		let Some(number) = &self.relay_number else {
			debug!(target = "statusbulb.session", "no relay number configured; code not forwarded");
			return;
		};
		let text = format!("Teams sign-in code: {code}");
		if !self.notifier.send(number, &text).await {
			debug!(target = "statusbulb.session", "code relay not delivered");
		}
	}

	/// `Dead` exactly when the trivial script fails with a transport fault.
	pub async fn probe_liveness(&self, handle: &SessionHandle) -> Liveness {
		match handle.driver().execute_trivial().await {
			Ok(()) => Liveness::Alive,
			Err(err) if err.is_transport_fault() => {
				warn!(target = "statusbulb.session", session_id = handle.session_id(), error = %err, "session is dead");
				Liveness::Dead
			}
			Err(err) => {
				debug!(target = "statusbulb.session", error = %err, "probe script failed but transport is up");
				Liveness::Alive
			}
		}
	}

	/// Retires `old` and brings up a replacement session.
	///
	/// Cookies from `old` are replayed onto the new session when there are
	/// any; otherwise the sign-in sequence runs. Every failure is logged and
	/// yields `None`.
	pub async fn recreate(&self, old: Option<SessionHandle>) -> Option<SessionHandle> {
		let jar = match old {
			Some(old) => {
				let jar = old.harvest_jar().await;
				self.dispose(old).await;
				jar
			}
			None => Vec::new(),
		};
		info!(target = "statusbulb.session", cookies = jar.len(), "recreating session");

		let driver = match self.factory.create().await {
			Ok(driver) => driver,
			Err(err) => {
				warn!(target = "statusbulb.session", error = %err, "could not open replacement session");
				return None;
			}
		};

		let SessionSettings { selectors, timeouts, .. } = &self.settings;
		let opened = async {
			driver
				.navigate(&self.settings.target_url)
				.await
				.map_err(|source| SessionError::AuthFailed { step: "navigate", source })?;
			login::wait_for_marker(driver.as_ref(), &selectors.page_marker, timeouts.page_marker).await
		}
		.await;
		if let Err(err) = opened {
			warn!(target = "statusbulb.session", error = %err, "replacement session did not load");
			self.quit_quietly(driver.as_ref()).await;
			return None;
		}

		if jar.is_empty() {
			if let Err(err) = self.sign_in(driver.as_ref()).await {
				warn!(target = "statusbulb.session", error = %err, "sign-in on replacement session failed");
				self.diagnostics.capture(driver.as_ref(), SnapshotTag::AuthFailure).await;
				self.quit_quietly(driver.as_ref()).await;
				return None;
			}
		} else {
			let mut restored = 0usize;
			for cookie in &jar {
				match driver.add_cookie(cookie).await {
					Ok(()) => restored += 1,
					Err(err) => debug!(target = "statusbulb.session", cookie = %cookie.name, error = %err, "cookie not restored"),
				}
			}
			debug!(target = "statusbulb.session", restored, total = jar.len(), "cookies replayed");
			if let Err(err) = driver.refresh().await {
				warn!(target = "statusbulb.session", error = %err, "refresh after cookie replay failed");
				self.quit_quietly(driver.as_ref()).await;
				return None;
			}
		}

		let mut handle = SessionHandle::new(driver);
		handle.save_jar().await;
		info!(target = "statusbulb.session", session_id = handle.session_id(), "session recreated");
		Some(handle)
	}

	/// Ends the session; failures are logged and dropped.
	pub async fn dispose(&self, handle: SessionHandle) {
		let driver = handle.into_driver();
		self.quit_quietly(driver.as_ref()).await;
	}

	async fn quit_quietly(&self, driver: &dyn BrowserDriver) {
		match driver.quit().await {
			Ok(()) => debug!(target = "statusbulb.session", session_id = driver.session_id(), "session closed"),
			Err(err) => debug!(target = "statusbulb.session", session_id = driver.session_id(), error = %err, "session close failed"),
		}
	}
}
