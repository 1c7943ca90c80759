use std::path::PathBuf;

use statusbulb::{DeviceError, SyncError};
use statusbulb_runtime::DriverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Conditions that end the process with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read config {path}: {source}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config {path}: {source}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("browser driver unavailable: {0}")]
	Driver(#[from] DriverError),

	#[error(transparent)]
	Device(#[from] DeviceError),

	#[error(transparent)]
	Sync(#[from] SyncError),
}
