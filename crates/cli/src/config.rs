//! YAML configuration: file schema, CLI overrides, validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use statusbulb::{DEFAULT_REFRESH_INTERVAL, Rgb, StatusMapping, StatusRecord};
use tracing::warn;

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub const DEFAULT_TEAMS_URL: &str = "https://teams.microsoft.com/";

/// Raw file contents; every key is optional until [`FileConfig::resolve`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	pub email: Option<String>,
	pub password: Option<String>,
	pub bulb_ip: Option<String>,
	/// Kept loose so a bad value degrades to the default instead of failing the parse.
	pub refresh_interval: Option<serde_yaml::Value>,
	pub teams_url: Option<String>,
	pub unknown_color: Option<String>,
	pub status_prefix: Option<String>,
	pub diagnostics_dir: Option<PathBuf>,
	pub twilio: Option<TwilioConfig>,
	pub status_mapping: Option<IndexMap<String, MappingEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TwilioConfig {
	pub account_sid: String,
	pub auth_token: String,
	pub from_number: String,
	pub to_number: String,
}

impl TwilioConfig {
	fn is_complete(&self) -> bool {
		[&self.account_sid, &self.auth_token, &self.from_number, &self.to_number]
			.iter()
			.all(|v| !v.trim().is_empty())
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
	pub status: String,
	pub color: String,
}

/// Validated settings the application runs with.
#[derive(Debug, Clone)]
pub struct Settings {
	pub email: String,
	pub password: String,
	pub bulb_ip: String,
	pub refresh_interval: Duration,
	pub teams_url: String,
	pub status_prefix: String,
	pub diagnostics_dir: PathBuf,
	pub twilio: Option<TwilioConfig>,
	pub mapping: StatusMapping,
}

impl FileConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
			path: path.to_path_buf(),
			source,
		})?;
		Self::parse(&text).map_err(|source| CliError::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}

	pub fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
		if text.trim().is_empty() {
			return Ok(Self::default());
		}
		serde_yaml::from_str(text)
	}

	/// Applies CLI/env overrides and checks required keys.
	pub fn resolve(self, cli: &Cli) -> Result<Settings> {
		let email = required("email", self.email)?;
		let password = required("password", self.password)?;
		let bulb_ip = required("bulb_ip", cli.bulb_ip.clone().or(self.bulb_ip))?.trim().to_string();

		let refresh_interval = match cli.interval {
			Some(secs) if secs > 0 => Duration::from_secs(secs),
			Some(_) => {
				warn!(target = "statusbulb.config", "--interval must be positive; using default");
				DEFAULT_REFRESH_INTERVAL
			}
			None => refresh_interval(self.refresh_interval.as_ref()),
		};

		let unknown_color = match self.unknown_color.as_deref() {
			None => Rgb::GRAY,
			Some(raw) => raw.parse::<Rgb>().unwrap_or_else(|err| {
				warn!(target = "statusbulb.config", error = %err, "invalid unknown_color; using 128,128,128");
				Rgb::GRAY
			}),
		};
		let fallback = StatusRecord::unknown(unknown_color);
		let mapping = match self.status_mapping {
			Some(entries) if !entries.is_empty() => status_mapping(entries, fallback),
			_ => StatusMapping::builtin().with_fallback(fallback),
		};

		let twilio = match self.twilio {
			Some(twilio) if twilio.is_complete() => Some(twilio),
			Some(_) => {
				warn!(target = "statusbulb.config", "twilio section incomplete; MFA relay disabled");
				None
			}
			None => None,
		};

		Ok(Settings {
			email,
			password,
			bulb_ip,
			refresh_interval,
			teams_url: self.teams_url.filter(|u| !u.trim().is_empty()).unwrap_or_else(|| DEFAULT_TEAMS_URL.to_string()),
			status_prefix: self.status_prefix.unwrap_or_default(),
			diagnostics_dir: cli.diagnostics_dir.clone().or(self.diagnostics_dir).unwrap_or_else(|| PathBuf::from(".")),
			twilio,
			mapping,
		})
	}
}

fn required(key: &str, value: Option<String>) -> Result<String> {
	match value {
		Some(v) if !v.trim().is_empty() => Ok(v),
		_ => Err(CliError::Config(format!("`{key}` is required"))),
	}
}

/// Positive integer (or numeric string) seconds; anything else is the default.
fn refresh_interval(value: Option<&serde_yaml::Value>) -> Duration {
	let Some(value) = value else {
		return DEFAULT_REFRESH_INTERVAL;
	};
	let secs = match value {
		serde_yaml::Value::Number(n) => n.as_u64(),
		serde_yaml::Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	};
	match secs {
		Some(secs) if secs > 0 => Duration::from_secs(secs),
		_ => {
			warn!(target = "statusbulb.config", ?value, "invalid refresh_interval; using 15s");
			DEFAULT_REFRESH_INTERVAL
		}
	}
}

/// Entries keep file order; a malformed color turns that entry into the fallback record.
fn status_mapping(entries: IndexMap<String, MappingEntry>, fallback: StatusRecord) -> StatusMapping {
	let records: Vec<(String, StatusRecord)> = entries
		.into_iter()
		.map(|(key, entry)| {
			let record = match entry.color.parse::<Rgb>() {
				Ok(color) => StatusRecord::new(entry.status, color),
				Err(err) => {
					warn!(target = "statusbulb.config", %key, error = %err, "invalid mapping color; entry maps to Unknown");
					fallback.clone()
				}
			};
			(key, record)
		})
		.collect();
	StatusMapping::new(records, fallback)
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	fn cli(args: &[&str]) -> Cli {
		let mut argv = vec!["statusbulb"];
		argv.extend_from_slice(args);
		Cli::try_parse_from(argv).unwrap()
	}

	const MINIMAL: &str = "email: me@example.com\npassword: hunter2\nbulb_ip: 192.168.1.100\n";

	#[test]
	fn minimal_config_uses_defaults() {
		let settings = FileConfig::parse(MINIMAL).unwrap().resolve(&cli(&[])).unwrap();
		assert_eq!(settings.refresh_interval, Duration::from_secs(15));
		assert_eq!(settings.teams_url, DEFAULT_TEAMS_URL);
		assert_eq!(settings.mapping, StatusMapping::builtin());
		assert!(settings.twilio.is_none());
	}

	#[test]
	fn missing_required_key_is_an_error() {
		let err = FileConfig::parse("email: me@example.com\nbulb_ip: 1.2.3.4\n")
			.unwrap()
			.resolve(&cli(&[]))
			.unwrap_err();
		assert!(matches!(err, CliError::Config(msg) if msg.contains("password")));
	}

	#[test]
	fn blank_bulb_ip_is_rejected_unless_overridden() {
		let text = "email: a\npassword: b\nbulb_ip: \"  \"\n";
		assert!(FileConfig::parse(text).unwrap().resolve(&cli(&[])).is_err());
		let settings = FileConfig::parse(text).unwrap().resolve(&cli(&["--bulb-ip", "10.0.0.9"])).unwrap();
		assert_eq!(settings.bulb_ip, "10.0.0.9");
	}

	#[test]
	fn non_positive_or_garbage_interval_falls_back() {
		for raw in ["0", "-5", "0.5", "0.001", "1e30", "\"2.5\"", "99999999999999999999", "soon", "[1]"] {
			let text = format!("{MINIMAL}refresh_interval: {raw}\n");
			let settings = FileConfig::parse(&text).unwrap().resolve(&cli(&[])).unwrap();
			assert_eq!(settings.refresh_interval, DEFAULT_REFRESH_INTERVAL, "{raw}");
		}
		let settings = FileConfig::parse(&format!("{MINIMAL}refresh_interval: 30\n")).unwrap().resolve(&cli(&[])).unwrap();
		assert_eq!(settings.refresh_interval, Duration::from_secs(30));
		let settings = FileConfig::parse(&format!("{MINIMAL}refresh_interval: \" 45 \"\n")).unwrap().resolve(&cli(&[])).unwrap();
		assert_eq!(settings.refresh_interval, Duration::from_secs(45));
	}

	#[test]
	fn cli_interval_wins() {
		let text = format!("{MINIMAL}refresh_interval: 30\n");
		let settings = FileConfig::parse(&text).unwrap().resolve(&cli(&["--interval", "5"])).unwrap();
		assert_eq!(settings.refresh_interval, Duration::from_secs(5));
	}

	#[test]
	fn mapping_keeps_file_order_and_degrades_bad_colors() {
		let text = format!(
			"{MINIMAL}unknown_color: \"10,10,10\"\nstatus_mapping:\n  busy: {{ status: Busy, color: \"255,0,0\" }}\n  do not disturb: {{ status: DND, color: \"purple\" }}\n  available: {{ status: Available, color: \"0, 255, 0\" }}\n"
		);
		let settings = FileConfig::parse(&text).unwrap().resolve(&cli(&[])).unwrap();
		let keys: Vec<&str> = settings.mapping.entries().iter().map(|(k, _)| k.as_str()).collect();
		assert_eq!(keys, vec!["busy", "do not disturb", "available"]);
		assert_eq!(settings.mapping.entries()[1].1, StatusRecord::unknown(Rgb::new(10, 10, 10)));
		assert_eq!(settings.mapping.entries()[2].1.color, Rgb::new(0, 255, 0));
		assert_eq!(settings.mapping.fallback().color, Rgb::new(10, 10, 10));
	}

	#[test]
	fn partial_twilio_section_disables_relay() {
		let text = format!("{MINIMAL}twilio:\n  account_sid: AC1\n  auth_token: t\n");
		let settings = FileConfig::parse(&text).unwrap().resolve(&cli(&[])).unwrap();
		assert!(settings.twilio.is_none());
	}
}
