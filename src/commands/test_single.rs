use std::path::Path;

use clap::ArgMatches;

use super::resolve_config;
use crate::error::{FsrcnnError, Result};
use crate::logging::OperationLogger;
use crate::training::Trainer;

pub fn test_single(app_m: &ArgMatches) -> Result<()> {
	let image = app_m
		.value_of("IMAGE")
		.ok_or_else(|| FsrcnnError::InvalidParameter("No IMAGE file given".to_string()))?;
	let config = resolve_config(app_m)?;
	let operation = OperationLogger::new("test-single");
	let report = Trainer::new(config)?.test_single(Path::new(image))?;

	let (height, width) = report.output_size;
	println!(
		"Saved {}x{} result from the {} model to {}",
		width,
		height,
		report.model_state,
		report.output_path.display()
	);
	operation.complete();
	Ok(())
}
