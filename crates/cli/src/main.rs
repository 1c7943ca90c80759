use clap::Parser;
use statusbulb_cli::{app, cli::Cli, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = app::run(cli).await {
		error!(target = "statusbulb", error = %err, "fatal");
		std::process::exit(1);
	}
}
