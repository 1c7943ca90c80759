use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "statusbulb")]
#[command(about = "Mirror Microsoft Teams presence onto a Yeelight bulb")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// YAML configuration file
	#[arg(short, long, value_name = "FILE", default_value = "config.yaml", env = "STATUSBULB_CONFIG")]
	pub config: PathBuf,

	/// Bulb address, overriding `bulb_ip` from the config file
	#[arg(long, value_name = "IP", env = "BULB_IP")]
	pub bulb_ip: Option<String>,

	/// chromedriver binary to spawn
	#[arg(long, value_name = "PATH", env = "CHROMEDRIVER_PATH")]
	pub chromedriver: Option<PathBuf>,

	/// Attach to an already running WebDriver server instead of spawning chromedriver
	#[arg(long, value_name = "URL")]
	pub webdriver_url: Option<String>,

	/// Run Chrome without a window
	#[arg(long)]
	pub headless: bool,

	/// Seconds between status checks, overriding `refresh_interval`
	#[arg(long, value_name = "SECS")]
	pub interval: Option<u64>,

	/// Light connect attempts at startup and on reconnect
	#[arg(long, value_name = "N", default_value_t = 5, env = "STATUSBULB_CONNECT_ATTEMPTS")]
	pub connect_attempts: u32,

	/// Directory for failure screenshots and page dumps
	#[arg(long, value_name = "DIR")]
	pub diagnostics_dir: Option<PathBuf>,
}
