//! Failure snapshots: a screenshot and the page source under a fixed tag.

use std::path::{Path, PathBuf};

use statusbulb_runtime::BrowserDriver;
use tracing::{debug, info};

/// Names the failure a snapshot belongs to; also the file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTag {
	AuthFailure,
	MfaFailure,
	StatusFailure,
}

impl SnapshotTag {
	pub fn as_str(self) -> &'static str {
		match self {
			SnapshotTag::AuthFailure => "auth_failure",
			SnapshotTag::MfaFailure => "mfa_failure",
			SnapshotTag::StatusFailure => "status_failure",
		}
	}
}

/// Writes `<dir>/<tag>.png` and `<dir>/<tag>.html`, overwriting earlier ones.
#[derive(Debug, Clone)]
pub struct Diagnostics {
	dir: Option<PathBuf>,
}

impl Diagnostics {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: Some(dir.into()) }
	}

	/// Snapshots are skipped entirely.
	pub fn disabled() -> Self {
		Self { dir: None }
	}

	/// Best effort: every failure is logged at debug and dropped.
	pub async fn capture(&self, driver: &dyn BrowserDriver, tag: SnapshotTag) {
		let Some(dir) = &self.dir else {
			return;
		};

		let png = dir.join(format!("{}.png", tag.as_str()));
		match driver.screenshot().await {
			Ok(bytes) => write_quietly(&png, bytes).await,
			Err(err) => debug!(target = "statusbulb.diagnostics", tag = tag.as_str(), error = %err, "screenshot unavailable"),
		}

		let html = dir.join(format!("{}.html", tag.as_str()));
		match driver.page_source().await {
			Ok(source) => write_quietly(&html, source.into_bytes()).await,
			Err(err) => debug!(target = "statusbulb.diagnostics", tag = tag.as_str(), error = %err, "page source unavailable"),
		}

		info!(target = "statusbulb.diagnostics", tag = tag.as_str(), dir = %dir.display(), "diagnostic snapshot written");
	}
}

async fn write_quietly(path: &Path, bytes: Vec<u8>) {
	if let Err(err) = tokio::fs::write(path, bytes).await {
		debug!(target = "statusbulb.diagnostics", path = %path.display(), error = %err, "snapshot write failed");
	}
}

#[cfg(test)]
mod tests {
	use statusbulb_runtime::fake::{BrowserEvent, FakeBrowser};

	use super::*;

	#[tokio::test]
	async fn capture_writes_png_and_html() {
		let dir = tempfile::tempdir().unwrap();
		let browser = FakeBrowser::new("s1");
		Diagnostics::new(dir.path()).capture(&browser, SnapshotTag::AuthFailure).await;

		assert!(dir.path().join("auth_failure.png").exists());
		let html = std::fs::read_to_string(dir.path().join("auth_failure.html")).unwrap();
		assert_eq!(html, "<html></html>");
	}

	#[tokio::test]
	async fn capture_ignores_dead_browser_and_missing_dir() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("does/not/exist");
		let browser = FakeBrowser::new("s1");

		Diagnostics::new(&missing).capture(&browser, SnapshotTag::StatusFailure).await;
		assert!(!missing.exists());

		browser.kill();
		Diagnostics::new(dir.path()).capture(&browser, SnapshotTag::MfaFailure).await;
		assert!(!dir.path().join("mfa_failure.png").exists());
	}

	#[tokio::test]
	async fn disabled_diagnostics_touch_nothing() {
		let browser = FakeBrowser::new("s1");
		Diagnostics::disabled().capture(&browser, SnapshotTag::AuthFailure).await;
		assert!(!browser.events().contains(&BrowserEvent::Screenshot));
	}
}
