use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::info;

use super::artifacts::{self, Stage};
use super::checkpoint::{CheckpointStore, ModelState};
use super::data_loader::BatchLoader;
use super::session::Session;
use crate::config::Config;
use crate::dataset::SampleSource;
use crate::error::{FsrcnnError, Result};

/// PSNRs of one held-out image, numbered from 1 across the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageScore {
	pub index: usize,
	pub bicubic_psnr: f32,
	pub recon_psnr: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
	pub scores: Vec<ImageScore>,
	pub mean_bicubic_psnr: f32,
	pub mean_recon_psnr: f32,
	pub model_state: ModelState,
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
	let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
	if count == 0 {
		0.0
	} else {
		sum / count as f32
	}
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
	let bar = ProgressBar::new(len as u64);
	bar.set_style(
		ProgressStyle::default_bar()
			.template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
			.map_err(|e| FsrcnnError::InvalidParameter(format!("progress template: {}", e)))?
			.progress_chars("#>-"),
	);
	Ok(bar)
}

/// Restore the canonical checkpoint, if any, and score every image of `test_set`.
pub fn run<T: SampleSource, R: Rng + ?Sized>(config: &Config, test_set: &T, rng: &mut R) -> Result<TestReport> {
	let mut session = Session::new(config, rng)?;
	let store = CheckpointStore::new(&config.run.save_dir, &config.run.model_name, config.training.save_epochs);
	let model_state = ModelState::from(&store.load(session.network_mut())?);

	let loader = BatchLoader::new(test_set, config.training.test_batch_size, false, config.training.num_threads)?;
	let bar = progress_bar(test_set.len())?;
	bar.set_message("Testing");
	info!(images = test_set.len(), model = %model_state, "Test is started.");

	let mut scores = Vec::with_capacity(test_set.len());
	let mut img_num = 0;
	for batch in loader.iter(rng) {
		let batch = batch?;
		for evaluation in session.evaluate(&batch)? {
			img_num += 1;
			artifacts::save_comparison(&config.run.save_dir, Stage::Test, img_num, &evaluation)?;
			info!(
				image = img_num,
				bicubic_psnr = evaluation.bicubic_psnr,
				recon_psnr = evaluation.recon_psnr,
				"Saving test result images"
			);
			scores.push(ImageScore {
				index: img_num,
				bicubic_psnr: evaluation.bicubic_psnr,
				recon_psnr: evaluation.recon_psnr,
			});
			bar.inc(1);
		}
	}
	bar.finish_with_message("Test is finished");

	let report = TestReport {
		mean_bicubic_psnr: mean(scores.iter().map(|s| s.bicubic_psnr)),
		mean_recon_psnr: mean(scores.iter().map(|s| s.recon_psnr)),
		scores,
		model_state,
	};
	info!(
		mean_bicubic_psnr = report.mean_bicubic_psnr,
		mean_recon_psnr = report.mean_recon_psnr,
		"Average PSNR"
	);
	Ok(report)
}
