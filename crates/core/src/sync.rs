//! The orchestrating loop: probe, classify, drive, sleep.

use std::time::Duration;

use statusbulb_runtime::{DriverFactory, LightConnector};
use tracing::{debug, error, info};

use crate::device::DeviceController;
use crate::error::{DeviceError, SyncError};
use crate::session::{Liveness, SessionHandle, SessionKeeper};
use crate::shutdown::ShutdownSignal;
use crate::status::{StatusClassifier, StatusRecord};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Owns the session and the light for the lifetime of the process.
pub struct SyncLoop<F, C> {
	keeper: SessionKeeper<F>,
	classifier: StatusClassifier,
	device: DeviceController<C>,
	session: Option<SessionHandle>,
	interval: Duration,
	shutdown: ShutdownSignal,
	last: Option<StatusRecord>,
}

impl<F: DriverFactory, C: LightConnector> SyncLoop<F, C> {
	/// `session` may be `None`; the first tick then creates one.
	pub fn new(
		keeper: SessionKeeper<F>,
		classifier: StatusClassifier,
		device: DeviceController<C>,
		session: Option<SessionHandle>,
		shutdown: ShutdownSignal,
	) -> Self {
		Self {
			keeper,
			classifier,
			device,
			session,
			interval: DEFAULT_REFRESH_INTERVAL,
			shutdown,
			last: None,
		}
	}

	/// A zero interval keeps the default.
	pub fn with_interval(mut self, interval: Duration) -> Self {
		if !interval.is_zero() {
			self.interval = interval;
		}
		self
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn session(&self) -> Option<&SessionHandle> {
		self.session.as_ref()
	}

	pub fn device(&self) -> &DeviceController<C> {
		&self.device
	}

	/// Last record applied to the light.
	pub fn last_status(&self) -> Option<&StatusRecord> {
		self.last.as_ref()
	}

	/// One pass. Returns `Ok(None)` when no usable session could be obtained.
	///
	/// A live session has its cookie jar re-saved so a later recreate replays
	/// the freshest cookies. Only an unreachable light (or shutdown during its
	/// reconnect) is an error.
	pub async fn tick(&mut self) -> Result<Option<StatusRecord>, SyncError> {
		let alive = match self.session.as_mut() {
			None => false,
			Some(handle) => match self.keeper.probe_liveness(handle).await {
				Liveness::Alive => {
					handle.save_jar().await;
					true
				}
				Liveness::Dead => false,
			},
		};
		if !alive {
			let old = self.session.take();
			self.session = self.keeper.recreate(old).await;
		}
		let Some(session) = &self.session else {
			info!(target = "statusbulb.sync", "no live session; skipping tick");
			return Ok(None);
		};

		let record = self.classifier.read_status(session.driver()).await;
		self.device.drive(record.color).await?;

		if self.last.as_ref() == Some(&record) {
			debug!(target = "statusbulb.sync", status = %record.label, color = %record.color, "status unchanged");
		} else {
			info!(target = "statusbulb.sync", status = %record.label, color = %record.color, "status changed");
		}
		self.last = Some(record.clone());
		Ok(Some(record))
	}

	/// Ticks until shutdown or a fatal error, then always runs [`shutdown`](Self::shutdown).
	pub async fn run(mut self) -> Result<(), SyncError> {
		info!(target = "statusbulb.sync", interval_secs = self.interval.as_secs(), "sync loop started");
		let outcome = loop {
			if self.shutdown.is_triggered() {
				break Ok(());
			}
			match self.tick().await {
				Ok(_) => {}
				Err(SyncError::Device(DeviceError::Cancelled)) => break Ok(()),
				Err(err) => {
					error!(target = "statusbulb.sync", error = %err, "fatal error; stopping");
					break Err(err);
				}
			}
			if !self.shutdown.sleep(self.interval).await {
				break Ok(());
			}
		};

		self.shutdown().await;
		outcome
	}

	/// Terminal color first, then session disposal; each step swallows its own failures.
	pub async fn shutdown(&mut self) {
		info!(target = "statusbulb.sync", "shutting down");
		self.device.release_safely().await;
		if let Some(session) = self.session.take() {
			self.keeper.dispose(session).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use statusbulb_runtime::{Cookie, Rgb};
	use statusbulb_runtime::fake::{BrowserEvent, FakeBrowser, FakeDriverFactory, FakeLightConnector};

	use super::*;
	use crate::backoff::Backoff;
	use crate::diagnostics::Diagnostics;
	use crate::session::{Credentials, LoginSelectors, SessionSettings};
	use crate::shutdown;
	use crate::status::{StatusMapping, StatusProbe};

	fn status_page(id: &str, label: &str) -> FakeBrowser {
		FakeBrowser::new(id)
			.with_element(&StatusProbe::default().locator, &[("aria-label", label)], "")
			.with_element(&LoginSelectors::default().page_marker, &[], "")
	}

	async fn sync_loop(
		factory: &FakeDriverFactory,
		light: &FakeLightConnector,
		session: Option<SessionHandle>,
		signal: ShutdownSignal,
	) -> SyncLoop<FakeDriverFactory, FakeLightConnector> {
		let settings = SessionSettings::new("https://teams.example/", Credentials::new("me@example.com", "pw"));
		let keeper = SessionKeeper::new(factory.clone(), settings).with_shutdown(signal.clone());
		let classifier = StatusClassifier::new(StatusProbe::default(), StatusMapping::builtin(), Diagnostics::disabled());
		let backoff = Backoff::new(3, Duration::from_secs(1), Duration::from_secs(60));
		let device = DeviceController::connect(light.clone(), "10.0.0.5", backoff, signal.clone()).await.unwrap();
		SyncLoop::new(keeper, classifier, device, session, signal)
	}

	#[tokio::test(start_paused = true)]
	async fn tick_drives_classified_color() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let browser = status_page("s1", "status busy");
		let mut sync = sync_loop(&factory, &light, Some(SessionHandle::new(Box::new(browser))), ShutdownSignal::never()).await;

		let record = sync.tick().await.unwrap().unwrap();

		assert_eq!(record.label, "Busy");
		assert_eq!(light.colors(), vec![Rgb::new(255, 0, 0)]);
		assert_eq!(factory.created(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn status_change_is_tracked_across_ticks() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let browser = status_page("s1", "status available");
		let mut sync = sync_loop(&factory, &light, Some(SessionHandle::new(Box::new(browser.clone()))), ShutdownSignal::never()).await;
		assert!(sync.last_status().is_none());

		sync.tick().await.unwrap();
		assert_eq!(sync.last_status().map(|r| r.label.as_str()), Some("Available"));

		browser.set_attribute(&StatusProbe::default().locator, "aria-label", "status busy");
		sync.tick().await.unwrap();
		assert_eq!(sync.last_status().map(|r| r.label.as_str()), Some("Busy"));
		assert_eq!(light.colors(), vec![Rgb::new(0, 255, 0), Rgb::new(255, 0, 0)]);
	}

	#[tokio::test(start_paused = true)]
	async fn live_tick_refreshes_saved_cookies() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let browser = status_page("s1", "status available").with_cookies(vec![Cookie::new("auth", "old")]);
		let mut sync = sync_loop(&factory, &light, Some(SessionHandle::new(Box::new(browser.clone()))), ShutdownSignal::never()).await;

		sync.tick().await.unwrap();
		browser.set_cookies(vec![Cookie::new("auth", "rotated")]);
		sync.tick().await.unwrap();

		let saved = sync.session().map(|s| s.saved_jar().to_vec()).unwrap_or_default();
		assert_eq!(saved, vec![Cookie::new("auth", "rotated")]);
	}

	#[tokio::test(start_paused = true)]
	async fn tick_without_session_recreates_or_skips() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let mut sync = sync_loop(&factory, &light, None, ShutdownSignal::never()).await;

		assert!(sync.tick().await.unwrap().is_none());
		assert!(light.colors().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn zero_interval_keeps_default() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let sync = sync_loop(&factory, &light, None, ShutdownSignal::never()).await;
		assert_eq!(sync.with_interval(Duration::ZERO).interval(), DEFAULT_REFRESH_INTERVAL);
	}

	#[tokio::test(start_paused = true)]
	async fn run_stops_on_interrupt_and_releases_in_order() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let browser = status_page("s1", "status available");
		let (trigger, signal) = shutdown::channel();
		let sync = sync_loop(&factory, &light, Some(SessionHandle::new(Box::new(browser.clone()))), signal).await;

		let running = tokio::spawn(sync.run());
		tokio::time::sleep(Duration::from_secs(20)).await;
		trigger.trigger();
		running.await.unwrap().unwrap();

		let colors = light.colors();
		assert_eq!(colors.first(), Some(&Rgb::new(0, 255, 0)));
		assert_eq!(colors.last(), Some(&Rgb::WHITE));
		assert_eq!(browser.events().last(), Some(&BrowserEvent::Quit));
	}

	#[tokio::test(start_paused = true)]
	async fn unreachable_light_is_fatal_after_shutdown_path() {
		let factory = FakeDriverFactory::default();
		let light = FakeLightConnector::default();
		let browser = status_page("s1", "status away");
		let sync = sync_loop(&factory, &light, Some(SessionHandle::new(Box::new(browser.clone()))), ShutdownSignal::never()).await;
		light.break_connections();
		light.fail_connects(4);

		let err = sync.run().await.unwrap_err();

		assert!(matches!(err, SyncError::Device(DeviceError::Unreachable { .. })));
		assert_eq!(browser.events().last(), Some(&BrowserEvent::Quit));
	}
}
