//! Error types for the core components.
//!
//! Only [`SyncError`] ever leaves the sync loop; the others are absorbed at
//! their component boundary.

use statusbulb_runtime::{DriverError, LightError};
use thiserror::Error;

/// Device controller failures.
#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("failed to connect to light at {address}: {source}")]
	ConnectFailed {
		address: String,
		#[source]
		source: LightError,
	},

	#[error("light command failed: {0}")]
	CommandFailed(#[source] LightError),

	#[error("light handle is not connected")]
	NotConnected,

	#[error("light at {address} unreachable after {attempts} attempts: {source}")]
	Unreachable {
		address: String,
		attempts: u32,
		#[source]
		source: LightError,
	},

	#[error("shutdown requested while reconnecting to the light")]
	Cancelled,
}

/// Session keeper failures.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("authentication failed at {step}: {source}")]
	AuthFailed {
		step: &'static str,
		#[source]
		source: DriverError,
	},

	#[error("failed to open browser session: {0}")]
	Create(#[source] DriverError),

	#[error("page identity marker missing after navigation: {0}")]
	MarkerMissing(#[source] DriverError),
}

/// Status extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
	#[error("status element not found: {0}")]
	NotFound(#[source] DriverError),

	#[error("status element has no `{0}` attribute")]
	MissingAttribute(String),

	#[error("failed to read status attribute: {0}")]
	Read(#[source] DriverError),
}

/// Conditions that end the sync loop.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Device(#[from] DeviceError),
}
