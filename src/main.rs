extern crate fsrcnn_rust;
#[macro_use]
extern crate tracing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::ArgMatches;
use fsrcnn_rust::logging::{self, LogConfig, LogFormat};
use fsrcnn_rust::{cli, commands};

fn log_config(matches: &ArgMatches) -> LogConfig {
	let mut config = LogConfig::default().with_verbosity(matches.occurrences_of("VERBOSE"));
	if let Some(format) = matches.value_of("LOG_FORMAT").and_then(LogFormat::from_str) {
		config.format = format;
	}
	config.log_directory = matches.value_of("LOG_DIR").map(Into::into);
	config
}

fn main() {
	let app_m = cli::build_cli();

	// global flags are propagated into the subcommand's matches
	let log_matches = match app_m.subcommand() {
		(_, Some(sub_m)) => sub_m,
		_ => &app_m,
	};
	let _guard = match logging::init_logging(log_config(log_matches)) {
		Ok(guard) => guard,
		Err(err) => {
			eprintln!("Failed to initialise logging: {}", err);
			std::process::exit(1);
		},
	};

	let stop = Arc::new(AtomicBool::new(false));
	let handler_stop = Arc::clone(&stop);
	if let Err(err) = ctrlc::set_handler(move || {
		handler_stop.store(true, Ordering::SeqCst);
	}) {
		warn!("Could not install the interrupt handler: {}", err);
	}

	let result = match app_m.subcommand() {
		("train", Some(sub_m)) => commands::train(sub_m, stop),
		("test", Some(sub_m)) => commands::test(sub_m),
		("test-single", Some(sub_m)) => commands::test_single(sub_m),
		("psnr", Some(sub_m)) => commands::psnr(sub_m),
		("generate-config", Some(sub_m)) => commands::generate_config(sub_m),
		_ => Ok(()),
	};

	if let Err(err) = result {
		error!("Error: {}", err);
		std::process::exit(1);
	}
}
