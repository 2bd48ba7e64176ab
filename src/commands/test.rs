use clap::ArgMatches;

use super::resolve_config;
use crate::error::Result;
use crate::logging::OperationLogger;
use crate::training::Trainer;

pub fn test(app_m: &ArgMatches) -> Result<()> {
	let config = resolve_config(app_m)?;
	let operation = OperationLogger::new("test");
	let report = Trainer::new(config)?.test()?;

	println!("Model: {}", report.model_state);
	for score in &report.scores {
		println!(
			"Image {:4}\tBicubic PSNR: {:.4}\tReconstruction PSNR: {:.4}",
			score.index, score.bicubic_psnr, score.recon_psnr
		);
	}
	println!(
		"Average\t\tBicubic PSNR: {:.4}\tReconstruction PSNR: {:.4}",
		report.mean_bicubic_psnr, report.mean_recon_psnr
	);
	operation.complete();
	Ok(())
}
