use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use super::artifacts::{self, Stage};
use super::checkpoint::CheckpointStore;
use super::data_loader::{Batch, BatchLoader};
use super::inference::{self, InferenceReport};
use super::metrics::{EpochRecord, MetricsHistory, ScalarLogger};
use super::session::Session;
use super::tester::{self, TestReport};
use crate::config::Config;
use crate::constants::file;
use crate::dataset::{ImageFolderDataset, SampleSource};
use crate::error::{FsrcnnError, Result};

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingReport {
	/// Average loss of every completed epoch.
	pub loss_history: Vec<f32>,
	pub metrics: MetricsHistory,
	/// Every checkpoint written, the canonical one last.
	pub checkpoints: Vec<PathBuf>,
	pub steps: usize,
	pub interrupted: bool,
}

/// Runs one of the three modes for a validated configuration.
pub struct Trainer {
	config: Config,
	stop: Arc<AtomicBool>,
}

impl Trainer {
	pub fn new(config: Config) -> Result<Self> {
		config.validate()?;
		Ok(Trainer {
			config,
			stop: Arc::new(AtomicBool::new(false)),
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Share `stop` with whoever should be able to end training early.
	pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
		self.stop = stop;
		self
	}

	/// Raising this flag ends training after the current epoch.
	pub fn stop_flag(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.stop)
	}

	pub(crate) fn rng(&self) -> StdRng {
		match self.config.training.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		}
	}

	fn open_training_set(&self) -> Result<ImageFolderDataset> {
		info!("Loading train datasets...");
		let set = ImageFolderDataset::training_set(
			&self.config.run.data_dir,
			&self.config.run.train_dataset,
			self.config.training.crop_size,
			self.config.network.scale_factor,
			self.config.is_grayscale(),
			false,
		)?;
		Ok(match self.config.training.seed {
			Some(seed) => set.with_random_crops(seed),
			None => set,
		})
	}

	pub(crate) fn open_test_set(&self) -> Result<ImageFolderDataset> {
		info!("Loading test datasets...");
		ImageFolderDataset::test_set(
			&self.config.run.data_dir,
			&self.config.run.test_dataset,
			self.config.network.scale_factor,
			self.config.is_grayscale(),
			false,
		)
	}

	/// Train on the configured image folders.
	pub fn train(&self) -> Result<TrainingReport> {
		let train_set = self.open_training_set()?;
		let test_set = self.open_test_set()?;
		self.train_with(&train_set, &test_set)
	}

	/// Train on `train_set`, probing sample `probe_index` of `test_set` after every epoch.
	pub fn train_with<S: SampleSource, T: SampleSource>(&self, train_set: &S, test_set: &T) -> Result<TrainingReport> {
		let config = &self.config;
		let save_dir = &config.run.save_dir;
		if train_set.is_empty() {
			return Err(FsrcnnError::Dataset("training set is empty".into()));
		}
		if config.training.probe_index >= test_set.len() {
			return Err(FsrcnnError::Dataset(format!(
				"probe index {} is out of range for a test set of {} images",
				config.training.probe_index,
				test_set.len()
			)));
		}

		let mut rng = self.rng();
		let mut session = Session::new(config, &mut rng)?;
		info!("---------- Networks architecture -------------");
		for line in session.network().to_string().lines() {
			info!("{}", line);
		}
		info!("----------------------------------------------");
		info!(
			"Device: {}, learning rate: {}, momentum: {}",
			session.device(),
			session.optimizer().learning_rate(),
			session.optimizer().momentum()
		);

		let probe = Batch::from_samples(&[test_set.get(config.training.probe_index)?])?;
		let loader = BatchLoader::new(
			train_set,
			config.training.batch_size,
			true,
			config.training.num_threads,
		)?;
		let num_batches = loader.num_batches();
		let mut scalars = ScalarLogger::create(save_dir.join(file::LOG_DIR).join(file::SCALAR_LOG_FILE))?;
		info!("Writing scalars to {}", scalars.path().display());
		let store = CheckpointStore::new(save_dir, &config.run.model_name, config.training.save_epochs);

		info!("Training is started.");
		let mut report = TrainingReport {
			loss_history: Vec::with_capacity(config.training.num_epochs),
			metrics: MetricsHistory::new(),
			checkpoints: Vec::new(),
			steps: 0,
			interrupted: false,
		};

		for epoch in 1..=config.training.num_epochs {
			if self.stop.load(Ordering::SeqCst) {
				warn!(epoch, "Stop requested, ending training early");
				report.interrupted = true;
				break;
			}

			let mut epoch_loss = 0.0;
			for (iter, batch) in loader.iter(&mut rng).enumerate() {
				let loss = session.train_step(&batch?)?;
				epoch_loss += loss;
				report.steps += 1;
				info!(
					"Epoch: [{:2}] [{:4}/{:4}] loss: {:.8}",
					epoch,
					iter + 1,
					num_batches,
					loss
				);
				scalars.scalar("loss", loss, report.steps)?;
			}
			let avg_loss = epoch_loss / num_batches as f32;
			report.loss_history.push(avg_loss);

			let evaluation = session
				.evaluate(&probe)?
				.pop()
				.ok_or_else(|| FsrcnnError::Shape("probe evaluation produced no image".into()))?;
			artifacts::save_comparison(save_dir, Stage::Train, epoch, &evaluation)?;
			info!(
				epoch,
				avg_loss,
				bicubic_psnr = evaluation.bicubic_psnr,
				recon_psnr = evaluation.recon_psnr,
				"Saving training result images"
			);
			scalars.scalar("bicubic_psnr", evaluation.bicubic_psnr, epoch)?;
			scalars.scalar("recon_psnr", evaluation.recon_psnr, epoch)?;
			report.metrics.push(EpochRecord {
				epoch,
				avg_loss,
				bicubic_psnr: evaluation.bicubic_psnr,
				recon_psnr: evaluation.recon_psnr,
			});

			if store.should_checkpoint(epoch) {
				report.checkpoints.push(store.save(session.network(), Some(epoch))?);
			}
		}

		artifacts::save_loss_history(save_dir, &report.loss_history)?;
		report
			.metrics
			.save_json(save_dir.join(file::LOG_DIR).join(file::METRICS_FILE))?;
		info!("Training is finished.");
		report.checkpoints.push(store.save(session.network(), None)?);
		Ok(report)
	}

	/// Score the canonical checkpoint on the configured test folder.
	pub fn test(&self) -> Result<TestReport> {
		let test_set = self.open_test_set()?;
		self.test_with(&test_set)
	}

	pub fn test_with<T: SampleSource>(&self, test_set: &T) -> Result<TestReport> {
		tester::run(&self.config, test_set, &mut self.rng())
	}

	/// Upscale one image file with the canonical checkpoint.
	pub fn test_single(&self, image_path: &std::path::Path) -> Result<InferenceReport> {
		inference::run(&self.config, image_path, &mut self.rng())
	}
}
