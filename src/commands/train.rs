use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::ArgMatches;
use tracing::info;

use super::resolve_config;
use crate::error::Result;
use crate::logging::OperationLogger;
use crate::training::Trainer;

pub fn train(app_m: &ArgMatches, stop: Arc<AtomicBool>) -> Result<()> {
	let config = resolve_config(app_m)?;
	let operation = OperationLogger::new("train");
	let trainer = Trainer::new(config)?.with_stop_flag(stop);

	let report = match trainer.train() {
		Ok(report) => report,
		Err(err) => {
			operation.log_error(&err);
			return Err(err);
		},
	};

	if let Some(last) = report.metrics.last() {
		info!(
			epochs = report.loss_history.len(),
			steps = report.steps,
			avg_loss = last.avg_loss,
			bicubic_psnr = last.bicubic_psnr,
			recon_psnr = last.recon_psnr,
			"Final epoch"
		);
	}
	if report.interrupted {
		info!("Training was interrupted; parameters so far were saved");
	}
	for path in &report.checkpoints {
		info!(path = %path.display(), "Checkpoint");
	}
	operation.complete();
	Ok(())
}
