//! Presence extraction and classification.
//!
//! Extraction reads one accessible-label attribute off the page; classification
//! is a pure first-match substring lookup in an ordered table.

use std::time::Duration;

use statusbulb_runtime::{BrowserDriver, Locator, Rgb};
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostics, SnapshotTag};
use crate::error::ExtractError;

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const DEFAULT_STATUS_XPATH: &str = "//*[contains(@aria-label, 'status')]";
pub const DEFAULT_STATUS_ATTRIBUTE: &str = "aria-label";
pub const DEFAULT_STATUS_WAIT: Duration = Duration::from_secs(30);

/// Normalized presence: a display label and the color it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
	pub label: String,
	pub color: Rgb,
}

impl StatusRecord {
	pub fn new(label: impl Into<String>, color: Rgb) -> Self {
		Self { label: label.into(), color }
	}

	/// The fallback record, shown in `color`.
	pub fn unknown(color: Rgb) -> Self {
		Self::new(UNKNOWN_LABEL, color)
	}
}

impl Default for StatusRecord {
	fn default() -> Self {
		Self::unknown(Rgb::GRAY)
	}
}

/// Ordered `(key, record)` table; the first key contained in the raw signal wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapping {
	entries: Vec<(String, StatusRecord)>,
	fallback: StatusRecord,
}

impl StatusMapping {
	/// Keys are lowercased to match the normalized signal. Empty keys are dropped.
	pub fn new(entries: impl IntoIterator<Item = (String, StatusRecord)>, fallback: StatusRecord) -> Self {
		let entries = entries
			.into_iter()
			.map(|(key, record)| (key.trim().to_lowercase(), record))
			.filter(|(key, _)| !key.is_empty())
			.collect();
		Self { entries, fallback }
	}

	/// available → green, busy → red, away → yellow.
	pub fn builtin() -> Self {
		Self::new(
			[
				("available".to_string(), StatusRecord::new("Available", Rgb::new(0, 255, 0))),
				("busy".to_string(), StatusRecord::new("Busy", Rgb::new(255, 0, 0))),
				("away".to_string(), StatusRecord::new("Away", Rgb::new(255, 255, 0))),
			],
			StatusRecord::default(),
		)
	}

	pub fn with_fallback(mut self, fallback: StatusRecord) -> Self {
		self.fallback = fallback;
		self
	}

	pub fn entries(&self) -> &[(String, StatusRecord)] {
		&self.entries
	}

	pub fn fallback(&self) -> &StatusRecord {
		&self.fallback
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Maps a normalized raw signal onto a record; deterministic and order-sensitive.
pub fn classify(raw: &str, mapping: &StatusMapping) -> StatusRecord {
	mapping
		.entries
		.iter()
		.find(|(key, _)| raw.contains(key.as_str()))
		.map(|(_, record)| record.clone())
		.unwrap_or_else(|| mapping.fallback.clone())
}

/// Where the presence signal lives on the page.
#[derive(Debug, Clone)]
pub struct StatusProbe {
	pub locator: Locator,
	pub attribute: String,
	pub wait: Duration,
	/// Lowercase phrase removed from the signal before classification.
	pub prefix: String,
}

impl Default for StatusProbe {
	fn default() -> Self {
		Self {
			locator: Locator::xpath(DEFAULT_STATUS_XPATH),
			attribute: DEFAULT_STATUS_ATTRIBUTE.to_string(),
			wait: DEFAULT_STATUS_WAIT,
			prefix: String::new(),
		}
	}
}

impl StatusProbe {
	pub fn with_prefix(mut self, prefix: &str) -> Self {
		self.prefix = prefix.to_lowercase();
		self
	}

	/// Lowercases `label` and removes the first occurrence of the prefix.
	pub fn normalize(&self, label: &str) -> String {
		let lowered = label.to_lowercase();
		if self.prefix.is_empty() {
			return lowered.trim().to_string();
		}
		lowered.replacen(self.prefix.as_str(), "", 1).trim().to_string()
	}
}

/// Reads and classifies the presence signal of a live session.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
	probe: StatusProbe,
	mapping: StatusMapping,
	diagnostics: Diagnostics,
}

impl StatusClassifier {
	pub fn new(probe: StatusProbe, mapping: StatusMapping, diagnostics: Diagnostics) -> Self {
		Self { probe, mapping, diagnostics }
	}

	pub async fn extract_raw_signal(&self, driver: &dyn BrowserDriver) -> Result<String, ExtractError> {
		let element = driver
			.find_element(&self.probe.locator, self.probe.wait)
			.await
			.map_err(ExtractError::NotFound)?;
		let label = driver
			.attribute(&element, &self.probe.attribute)
			.await
			.map_err(ExtractError::Read)?
			.ok_or_else(|| ExtractError::MissingAttribute(self.probe.attribute.clone()))?;
		let raw = self.probe.normalize(&label);
		debug!(target = "statusbulb.status", %raw, "status signal extracted");
		Ok(raw)
	}

	pub fn classify(&self, raw: &str) -> StatusRecord {
		classify(raw, &self.mapping)
	}

	/// Extraction failures degrade to the fallback record and a snapshot.
	pub async fn read_status(&self, driver: &dyn BrowserDriver) -> StatusRecord {
		match self.extract_raw_signal(driver).await {
			Ok(raw) => self.classify(&raw),
			Err(err) => {
				warn!(target = "statusbulb.status", error = %err, "could not read status; using fallback");
				self.diagnostics.capture(driver, SnapshotTag::StatusFailure).await;
				self.mapping.fallback.clone()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use statusbulb_runtime::fake::{BrowserEvent, FakeBrowser};

	use super::*;

	fn red() -> StatusRecord {
		StatusRecord::new("Busy", Rgb::new(255, 0, 0))
	}

	#[test]
	fn first_matching_key_wins() {
		let mapping = StatusMapping::new(
			[
				("busy".to_string(), red()),
				("busy-away".to_string(), StatusRecord::new("X", Rgb::new(1, 1, 1))),
			],
			StatusRecord::default(),
		);
		assert_eq!(classify("busy-away", &mapping), red());
	}

	#[test]
	fn no_match_is_exactly_unknown_gray() {
		let record = classify("in a meeting", &StatusMapping::builtin());
		assert_eq!(record, StatusRecord::new("Unknown", Rgb::new(128, 128, 128)));
	}

	#[test]
	fn substring_anywhere_matches() {
		assert_eq!(classify("your status: busy now", &StatusMapping::builtin()), red());
	}

	#[test]
	fn configured_fallback_color_is_used() {
		let mapping = StatusMapping::builtin().with_fallback(StatusRecord::unknown(Rgb::new(0, 0, 64)));
		assert_eq!(classify("", &mapping).color, Rgb::new(0, 0, 64));
	}

	#[test]
	fn empty_keys_never_match() {
		let mapping = StatusMapping::new([(" ".to_string(), red())], StatusRecord::default());
		assert!(mapping.is_empty());
		assert_eq!(classify("anything", &mapping), StatusRecord::default());
	}

	#[test]
	fn normalize_lowercases_and_strips_prefix() {
		let probe = StatusProbe::default().with_prefix("Your profile picture with status displayed as ");
		assert_eq!(probe.normalize("Your profile picture with status displayed as Busy."), "busy.");
		assert_eq!(StatusProbe::default().normalize("  Away "), "away");
	}

	fn classifier(dir: &std::path::Path) -> StatusClassifier {
		StatusClassifier::new(StatusProbe::default(), StatusMapping::builtin(), Diagnostics::new(dir))
	}

	#[tokio::test]
	async fn read_status_classifies_attribute() {
		let dir = tempfile::tempdir().unwrap();
		let probe = StatusProbe::default();
		let browser = FakeBrowser::new("s1").with_element(&probe.locator, &[("aria-label", "Status Available")], "");
		let record = classifier(dir.path()).read_status(&browser).await;
		assert_eq!(record.label, "Available");
		assert_eq!(record.color, Rgb::new(0, 255, 0));
	}

	#[tokio::test]
	async fn missing_element_falls_back_and_snapshots() {
		let dir = tempfile::tempdir().unwrap();
		let browser = FakeBrowser::new("s1");
		let record = classifier(dir.path()).read_status(&browser).await;
		assert_eq!(record, StatusRecord::default());
		assert!(browser.events().contains(&BrowserEvent::Screenshot));
		assert!(dir.path().join("status_failure.html").exists());
	}

	#[tokio::test]
	async fn missing_attribute_is_reported() {
		let probe = StatusProbe::default();
		let browser = FakeBrowser::new("s1").with_element(&probe.locator, &[], "");
		let err = classifier(std::path::Path::new("."))
			.extract_raw_signal(&browser)
			.await
			.unwrap_err();
		assert!(matches!(err, ExtractError::MissingAttribute(name) if name == "aria-label"));
	}
}
