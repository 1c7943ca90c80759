use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(verbose: u8) -> String {
	let crate_level = match verbose {
		0 | 1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let global = if verbose >= 3 { "debug" } else { "warn" };
	format!("{global},statusbulb={crate_level}")
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose >= 2)
		.try_init();
}
