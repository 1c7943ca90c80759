//! Process wiring: config, chromedriver, light, session, loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use statusbulb::shutdown::{self, ShutdownTrigger};
use statusbulb::{
	Backoff, Credentials, DeviceController, DeviceError, Diagnostics, SessionKeeper, SessionSettings, StatusClassifier, StatusProbe, SyncLoop,
};
use statusbulb_runtime::{ChromeDriverService, DisabledNotifier, Notifier, TwilioNotifier, WebDriverFactory, YeelightConnector};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::{FileConfig, Settings};
use crate::error::{CliError, Result};

const DEVICE_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEVICE_BACKOFF_CAP: Duration = Duration::from_secs(60);
const DEFAULT_CHROMEDRIVER: &str = if cfg!(windows) { "chromedriver.exe" } else { "chromedriver" };

/// Runs until interrupted. Errors are fatal and map to exit status 1.
pub async fn run(cli: Cli) -> Result<()> {
	let settings = FileConfig::load(&cli.config)?.resolve(&cli)?;
	info!(target = "statusbulb", config = %cli.config.display(), bulb = %settings.bulb_ip, "configuration loaded");

	let (trigger, signal) = shutdown::channel();
	spawn_signal_listener(trigger);

	let (service, base_url) = match &cli.webdriver_url {
		Some(url) => (None, url.clone()),
		None => {
			let binary = chromedriver_binary(cli.chromedriver.as_ref())?;
			let service = ChromeDriverService::start(&binary).await?;
			let url = service.url();
			(Some(service), url)
		}
	};

	let backoff = Backoff::new(cli.connect_attempts.max(1), DEVICE_BACKOFF_BASE, DEVICE_BACKOFF_CAP);
	let device = match DeviceController::connect(YeelightConnector::default(), settings.bulb_ip.clone(), backoff, signal.clone()).await {
		Ok(device) => device,
		Err(err) => {
			if let Some(service) = service {
				service.shutdown().await;
			}
			return match err {
				DeviceError::Cancelled => Ok(()),
				other => Err(other.into()),
			};
		}
	};

	let outcome = sync(&cli, settings, &base_url, device, signal).await;

	if let Some(service) = service {
		service.shutdown().await;
	}
	outcome
}

async fn sync(
	cli: &Cli,
	settings: Settings,
	base_url: &str,
	mut device: DeviceController<YeelightConnector>,
	signal: shutdown::ShutdownSignal,
) -> Result<()> {
	let factory = match WebDriverFactory::new(base_url, WebDriverFactory::default_chrome_args(cli.headless)) {
		Ok(factory) => factory,
		Err(err) => {
			device.release_safely().await;
			return Err(err.into());
		}
	};

	let diagnostics = Diagnostics::new(&settings.diagnostics_dir);
	let (notifier, relay_number) = notifier(&settings);
	let keeper = SessionKeeper::new(
		factory,
		SessionSettings::new(&settings.teams_url, Credentials::new(&settings.email, &settings.password)),
	)
	.with_relay(notifier, relay_number)
	.with_diagnostics(diagnostics.clone())
	.with_shutdown(signal.clone());

	let classifier = StatusClassifier::new(StatusProbe::default().with_prefix(&settings.status_prefix), settings.mapping, diagnostics);

	let session = match keeper.authenticate().await {
		Ok(session) => Some(session),
		Err(err) => {
			warn!(target = "statusbulb", error = %err, "initial sign-in failed; retrying on the first tick");
			None
		}
	};

	SyncLoop::new(keeper, classifier, device, session, signal)
		.with_interval(settings.refresh_interval)
		.run()
		.await?;
	Ok(())
}

/// `--chromedriver`/`CHROMEDRIVER_PATH`, else `chromedriver` in the working directory.
fn chromedriver_binary(configured: Option<&PathBuf>) -> Result<PathBuf> {
	if let Some(path) = configured {
		return Ok(path.clone());
	}
	let cwd = std::env::current_dir().map_err(|err| CliError::Config(format!("cannot resolve working directory: {err}")))?;
	Ok(cwd.join(DEFAULT_CHROMEDRIVER))
}

fn notifier(settings: &Settings) -> (Arc<dyn Notifier>, Option<String>) {
	let disabled: Arc<dyn Notifier> = Arc::new(DisabledNotifier);
	let Some(twilio) = &settings.twilio else {
		return (disabled, None);
	};
	match TwilioNotifier::new(&twilio.account_sid, &twilio.auth_token, &twilio.from_number) {
		Ok(twilio_notifier) => {
			let relay: Arc<dyn Notifier> = Arc::new(twilio_notifier);
			(relay, Some(twilio.to_number.clone()))
		}
		Err(err) => {
			warn!(target = "statusbulb", error = %err, "could not build SMS client; MFA relay disabled");
			(disabled, None)
		}
	}
}

fn spawn_signal_listener(trigger: ShutdownTrigger) {
	tokio::spawn(async move {
		wait_for_interrupt().await;
		info!(target = "statusbulb", "interrupt received; finishing up");
		trigger.trigger();
	});
}

#[cfg(unix)]
async fn wait_for_interrupt() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut terminate = match signal(SignalKind::terminate()) {
		Ok(terminate) => terminate,
		Err(err) => {
			warn!(target = "statusbulb", error = %err, "SIGTERM handler unavailable");
			ctrl_c().await;
			return;
		}
	};
	tokio::select! {
		_ = ctrl_c() => {}
		_ = terminate.recv() => {}
	}
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
	ctrl_c().await;
}

async fn ctrl_c() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		warn!(target = "statusbulb", error = %err, "Ctrl-C handler unavailable");
		std::future::pending::<()>().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn configured_chromedriver_wins() {
		let path = PathBuf::from("/opt/drivers/chromedriver");
		assert_eq!(chromedriver_binary(Some(&path)).unwrap(), path);
	}

	#[test]
	fn chromedriver_defaults_to_working_directory() {
		let binary = chromedriver_binary(None).unwrap();
		assert_eq!(binary.parent(), Some(std::env::current_dir().unwrap().as_path()));
		assert_eq!(binary.file_name().and_then(|n| n.to_str()), Some(DEFAULT_CHROMEDRIVER));
	}
}
