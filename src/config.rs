use std::path::PathBuf;

use crate::constants::{network, training};
use crate::error::{FsrcnnError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub num_channels: usize,
	pub scale_factor: usize,
	pub d: usize,
	pub s: usize,
	pub m: usize,
}

impl Default for NetworkConfig {
	fn default() -> Self {
		Self {
			num_channels: network::DEFAULT_NUM_CHANNELS,
			scale_factor: network::DEFAULT_SCALE_FACTOR,
			d: network::DEFAULT_D,
			s: network::DEFAULT_S,
			m: network::DEFAULT_M,
		}
	}
}

impl NetworkConfig {
	pub fn builder() -> NetworkConfigBuilder {
		NetworkConfigBuilder::default()
	}

	pub fn validate(&self) -> Result<()> {
		if self.num_channels != 1 && self.num_channels != 3 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Channel count ({}) must be 1 or 3",
				self.num_channels
			)));
		}
		if self.scale_factor == 0 {
			return Err(FsrcnnError::InvalidParameter(
				"Scale factor must be greater than 0".into(),
			));
		}
		if self.d == 0 || self.s == 0 {
			return Err(FsrcnnError::InvalidParameter(
				"Feature widths d and s must be greater than 0".into(),
			));
		}
		Ok(())
	}

	/// Border trimmed from high-resolution images before comparison.
	pub fn border(&self) -> usize {
		2 * self.scale_factor
	}
}

#[derive(Default)]
pub struct NetworkConfigBuilder {
	num_channels: Option<usize>,
	scale_factor: Option<usize>,
	d: Option<usize>,
	s: Option<usize>,
	m: Option<usize>,
}

impl NetworkConfigBuilder {
	pub fn num_channels(mut self, num_channels: usize) -> Self {
		self.num_channels = Some(num_channels);
		self
	}

	pub fn scale_factor(mut self, scale_factor: usize) -> Self {
		self.scale_factor = Some(scale_factor);
		self
	}

	pub fn d(mut self, d: usize) -> Self {
		self.d = Some(d);
		self
	}

	pub fn s(mut self, s: usize) -> Self {
		self.s = Some(s);
		self
	}

	pub fn m(mut self, m: usize) -> Self {
		self.m = Some(m);
		self
	}

	pub fn build(self) -> NetworkConfig {
		NetworkConfig {
			num_channels: self.num_channels.unwrap_or(network::DEFAULT_NUM_CHANNELS),
			scale_factor: self.scale_factor.unwrap_or(network::DEFAULT_SCALE_FACTOR),
			d: self.d.unwrap_or(network::DEFAULT_D),
			s: self.s.unwrap_or(network::DEFAULT_S),
			m: self.m.unwrap_or(network::DEFAULT_M),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
	pub num_epochs: usize,
	pub save_epochs: usize,
	pub batch_size: usize,
	pub test_batch_size: usize,
	pub learning_rate: f32,
	pub crop_size: usize,
	pub num_threads: usize,
	pub probe_index: usize,
	pub seed: Option<u64>,
}

impl Default for TrainingConfig {
	fn default() -> Self {
		Self {
			num_epochs: training::DEFAULT_NUM_EPOCHS,
			save_epochs: training::DEFAULT_SAVE_EPOCHS,
			batch_size: training::DEFAULT_BATCH_SIZE,
			test_batch_size: training::DEFAULT_TEST_BATCH_SIZE,
			learning_rate: training::DEFAULT_LEARNING_RATE,
			crop_size: training::DEFAULT_CROP_SIZE,
			num_threads: training::DEFAULT_NUM_THREADS,
			probe_index: training::PROBE_INDEX,
			seed: None,
		}
	}
}

impl TrainingConfig {
	pub fn builder() -> TrainingConfigBuilder {
		TrainingConfigBuilder::default()
	}

	pub fn validate(&self) -> Result<()> {
		if self.learning_rate <= 0.0 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Learning rate ({}) must be greater than 0",
				self.learning_rate
			)));
		}
		if self.save_epochs == 0 {
			return Err(FsrcnnError::InvalidParameter(
				"Checkpoint cadence (save_epochs) must be greater than 0".into(),
			));
		}
		if self.batch_size == 0 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Batch size ({}) must be greater than 0",
				self.batch_size
			)));
		}
		if self.test_batch_size == 0 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Test batch size ({}) must be greater than 0",
				self.test_batch_size
			)));
		}
		if self.crop_size == 0 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Crop size ({}) must be greater than 0",
				self.crop_size
			)));
		}
		Ok(())
	}
}

#[derive(Default)]
pub struct TrainingConfigBuilder {
	num_epochs: Option<usize>,
	save_epochs: Option<usize>,
	batch_size: Option<usize>,
	test_batch_size: Option<usize>,
	learning_rate: Option<f32>,
	crop_size: Option<usize>,
	num_threads: Option<usize>,
	probe_index: Option<usize>,
	seed: Option<u64>,
}

impl TrainingConfigBuilder {
	pub fn num_epochs(mut self, epochs: usize) -> Self {
		self.num_epochs = Some(epochs);
		self
	}

	pub fn save_epochs(mut self, epochs: usize) -> Self {
		self.save_epochs = Some(epochs);
		self
	}

	pub fn batch_size(mut self, size: usize) -> Self {
		self.batch_size = Some(size);
		self
	}

	pub fn test_batch_size(mut self, size: usize) -> Self {
		self.test_batch_size = Some(size);
		self
	}

	pub fn learning_rate(mut self, rate: f32) -> Self {
		self.learning_rate = Some(rate);
		self
	}

	pub fn crop_size(mut self, size: usize) -> Self {
		self.crop_size = Some(size);
		self
	}

	pub fn num_threads(mut self, threads: usize) -> Self {
		self.num_threads = Some(threads);
		self
	}

	pub fn probe_index(mut self, index: usize) -> Self {
		self.probe_index = Some(index);
		self
	}

	pub fn seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	pub fn build(self) -> TrainingConfig {
		TrainingConfig {
			num_epochs: self.num_epochs.unwrap_or(training::DEFAULT_NUM_EPOCHS),
			save_epochs: self.save_epochs.unwrap_or(training::DEFAULT_SAVE_EPOCHS),
			batch_size: self.batch_size.unwrap_or(training::DEFAULT_BATCH_SIZE),
			test_batch_size: self.test_batch_size.unwrap_or(training::DEFAULT_TEST_BATCH_SIZE),
			learning_rate: self.learning_rate.unwrap_or(training::DEFAULT_LEARNING_RATE),
			crop_size: self.crop_size.unwrap_or(training::DEFAULT_CROP_SIZE),
			num_threads: self.num_threads.unwrap_or(training::DEFAULT_NUM_THREADS),
			probe_index: self.probe_index.unwrap_or(training::PROBE_INDEX),
			seed: self.seed,
		}
	}
}

/// Names and locations of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
	pub model_name: String,
	pub train_dataset: String,
	pub test_dataset: String,
	pub data_dir: PathBuf,
	pub save_dir: PathBuf,
	pub gpu_mode: bool,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			model_name: "FSRCNN".to_string(),
			train_dataset: "bsds300".to_string(),
			test_dataset: "bsds300".to_string(),
			data_dir: PathBuf::from("../Data"),
			save_dir: PathBuf::from("Result"),
			gpu_mode: false,
		}
	}
}

impl RunConfig {
	pub fn validate(&self) -> Result<()> {
		if self.model_name.is_empty() {
			return Err(FsrcnnError::InvalidParameter("Model name must not be empty".into()));
		}
		if self.model_name.contains(|c| c == '/' || c == '\\') {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Model name ({}) must not contain path separators",
				self.model_name
			)));
		}
		Ok(())
	}
}

/// The complete, immutable configuration of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
	pub network: NetworkConfig,
	pub training: TrainingConfig,
	pub run: RunConfig,
}

impl Config {
	pub fn validate(&self) -> Result<()> {
		self.network.validate()?;
		self.training.validate()?;
		self.run.validate()
	}

	pub fn is_grayscale(&self) -> bool {
		self.network.num_channels == 1
	}
}
