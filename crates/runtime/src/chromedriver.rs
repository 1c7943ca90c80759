//! `chromedriver` process lifecycle.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use statusbulb_protocol::{Envelope, StatusValue};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{DriverError, Result};
use crate::process::free_local_port;

const READY_POLL_ATTEMPTS: u32 = 40;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A spawned `chromedriver` serving WebDriver on a local port.
///
/// The child is killed when the service is dropped.
#[derive(Debug)]
pub struct ChromeDriverService {
	child: Child,
	port: u16,
	binary: PathBuf,
}

impl ChromeDriverService {
	/// Spawns `binary` on a free port and waits until `/status` reports ready.
	pub async fn start(binary: &Path) -> Result<Self> {
		if !binary.exists() {
			return Err(DriverError::Launch(format!(
				"ChromeDriver not found at {}. \n\
				 Pass --chromedriver <path>, set CHROMEDRIVER_PATH, or place chromedriver in the working directory.",
				binary.display()
			)));
		}

		let port = free_local_port().map_err(|e| DriverError::Launch(format!("Failed to reserve a local port: {}", e)))?;
		let mut cmd = Command::new(binary);
		cmd.arg(format!("--port={}", port))
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		let child = cmd
			.spawn()
			.map_err(|e| DriverError::Launch(format!("Failed to launch chromedriver at {}: {}", binary.display(), e)))?;

		let mut service = Self {
			child,
			port,
			binary: binary.to_path_buf(),
		};
		service.wait_ready().await?;
		info!(target = "statusbulb.webdriver", port, binary = %service.binary.display(), "chromedriver ready");
		Ok(service)
	}

	/// Base URL for WebDriver requests.
	pub fn url(&self) -> String {
		format!("http://127.0.0.1:{}", self.port)
	}

	async fn wait_ready(&mut self) -> Result<()> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_millis(400))
			.build()
			.map_err(|e| DriverError::Launch(format!("Failed to create HTTP client: {}", e)))?;
		let status_url = format!("{}/status", self.url());
		let mut last_error = "endpoint not reachable".to_string();

		for _ in 0..READY_POLL_ATTEMPTS {
			tokio::time::sleep(READY_POLL_INTERVAL).await;

			if let Ok(Some(status)) = self.child.try_wait() {
				return Err(DriverError::Launch(format!(
					"chromedriver exited before becoming ready (status: {}). \
					 Check that its version matches the installed Chrome.",
					status
				)));
			}

			match probe_status(&client, &status_url).await {
				Ok(true) => return Ok(()),
				Ok(false) => last_error = "driver reported not ready".to_string(),
				Err(e) => last_error = e,
			}
		}

		Err(DriverError::Launch(format!(
			"chromedriver did not become ready on port {}. Last error: {}",
			self.port, last_error
		)))
	}

	/// Stops the child process.
	pub async fn shutdown(mut self) {
		if let Err(err) = self.child.kill().await {
			debug!(target = "statusbulb.webdriver", error = %err, "chromedriver already exited");
		}
	}
}

async fn probe_status(client: &reqwest::Client, url: &str) -> std::result::Result<bool, String> {
	let response = client.get(url).send().await.map_err(|e| e.to_string())?;
	if !response.status().is_success() {
		return Err(format!("unexpected status {}", response.status()));
	}
	let envelope: Envelope<StatusValue> = response.json().await.map_err(|e| e.to_string())?;
	Ok(envelope.value.ready)
}
