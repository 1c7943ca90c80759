use std::io::ErrorKind;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use statusbulb::Rgb;
use statusbulb_cli::cli::Cli;
use statusbulb_cli::config::FileConfig;
use statusbulb_cli::error::CliError;
use tempfile::TempDir;

fn statusbulb_binary() -> PathBuf {
	let mut path = std::env::current_exe().expect("current_exe should resolve");
	path.pop();
	path.pop();
	path.push("statusbulb");
	path
}

fn run_statusbulb(workdir: &Path, args: &[&str]) -> (Option<i32>, String) {
	let output = Command::new(statusbulb_binary())
		.current_dir(workdir)
		.args(args)
		.env_remove("BULB_IP")
		.env_remove("CHROMEDRIVER_PATH")
		.env_remove("STATUSBULB_CONFIG")
		.env_remove("STATUSBULB_CONNECT_ATTEMPTS")
		.env("RUST_LOG", "error")
		.output()
		.expect("failed to execute statusbulb");
	(output.status.code(), String::from_utf8_lossy(&output.stderr).to_string())
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
	let path = dir.path().join("config.yaml");
	std::fs::write(&path, body).expect("config should be written");
	path
}

#[test]
fn full_config_file_resolves() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	let path = write_config(
		&dir,
		r#"
email: me@example.com
password: hunter2
bulb_ip: 192.168.1.100
refresh_interval: 20
teams_url: https://teams.microsoft.com/v2/
unknown_color: "64,64,64"
status_prefix: "Your profile picture with status displayed as "
twilio:
  account_sid: ACxxxx
  auth_token: secret
  from_number: "+15550001111"
  to_number: "+15552223333"
status_mapping:
  available: { status: Available, color: "0,255,0" }
  busy:      { status: Busy, color: "255,0,0" }
  away:      { status: Away, color: "255,255,0" }
"#,
	);

	let cli = Cli::try_parse_from(["statusbulb", "--config", path.to_str().expect("utf-8 path")])?;
	let settings = FileConfig::load(&path)?.resolve(&cli)?;

	assert_eq!(settings.refresh_interval.as_secs(), 20);
	assert_eq!(settings.teams_url, "https://teams.microsoft.com/v2/");
	assert_eq!(settings.mapping.len(), 3);
	assert_eq!(settings.mapping.fallback().color, Rgb::new(64, 64, 64));
	assert_eq!(settings.twilio.map(|t| t.to_number), Some("+15552223333".to_string()));
	Ok(())
}

#[test]
fn malformed_yaml_is_a_parse_error() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	let path = write_config(&dir, "email: [unterminated\n");
	assert!(matches!(FileConfig::load(&path), Err(CliError::ConfigParse { .. })));
	Ok(())
}

#[test]
fn missing_file_is_a_read_error() {
	let dir = TempDir::new().expect("tempdir");
	let err = FileConfig::load(&dir.path().join("nope.yaml")).expect_err("missing file");
	assert!(matches!(err, CliError::ConfigRead { .. }));
}

#[test]
fn binary_exits_1_without_required_config() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	write_config(&dir, "email: me@example.com\n");

	let (code, _stderr) = run_statusbulb(dir.path(), &[]);
	assert_eq!(code, Some(1));
	Ok(())
}

#[test]
fn binary_exits_1_without_chromedriver() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	write_config(&dir, "email: a\npassword: b\nbulb_ip: 127.0.0.1\n");

	let (code, _stderr) = run_statusbulb(dir.path(), &["--chromedriver", "/definitely/not/chromedriver"]);
	assert_eq!(code, Some(1));
	Ok(())
}

#[test]
fn chromedriver_defaults_to_working_directory() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	write_config(&dir, "email: a\npassword: b\nbulb_ip: 127.0.0.1\n");

	let (code, stderr) = run_statusbulb(dir.path(), &[]);
	assert_eq!(code, Some(1));
	let expected = dir.path().canonicalize()?.join("chromedriver");
	assert!(stderr.contains(&expected.display().to_string()), "stderr: {stderr}");
	Ok(())
}

#[test]
fn unreachable_light_exits_before_any_webdriver_request() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	let webdriver = TcpListener::bind("127.0.0.1:0")?;
	webdriver.set_nonblocking(true)?;
	let closed_port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
	write_config(&dir, &format!("email: a\npassword: b\nbulb_ip: \"127.0.0.1:{closed_port}\"\n"));

	let url = format!("http://{}", webdriver.local_addr()?);
	let (code, _stderr) = run_statusbulb(dir.path(), &["--webdriver-url", &url, "--connect-attempts", "2"]);

	assert_eq!(code, Some(1));
	assert!(matches!(webdriver.accept(), Err(err) if err.kind() == ErrorKind::WouldBlock));
	Ok(())
}
