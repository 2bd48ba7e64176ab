pub mod network {
	pub const DEFAULT_NUM_CHANNELS: usize = 1;
	pub const DEFAULT_SCALE_FACTOR: usize = 4;
	pub const DEFAULT_D: usize = 56;
	pub const DEFAULT_S: usize = 12;
	pub const DEFAULT_M: usize = 4;
	pub const FEATURE_KERNEL: usize = 5;
	pub const MAPPING_KERNEL: usize = 3;
	pub const DECONV_KERNEL: usize = 9;
	pub const WEIGHT_INIT_MEAN: f32 = 0.0;
	pub const WEIGHT_INIT_STD: f32 = 0.02;
	pub const DECONV_INIT_STD: f32 = 0.0001;
	pub const PRELU_INIT: f32 = 0.25;
	pub const LEAKY_RELU_SLOPE: f32 = 0.2;
	pub const NORM_EPSILON: f32 = 1e-5;
}

pub mod training {
	pub const DEFAULT_LEARNING_RATE: f32 = 1e-3;
	pub const MOMENTUM: f32 = 0.9;
	pub const DEFAULT_NUM_EPOCHS: usize = 100;
	pub const DEFAULT_SAVE_EPOCHS: usize = 10;
	pub const DEFAULT_BATCH_SIZE: usize = 64;
	pub const DEFAULT_TEST_BATCH_SIZE: usize = 1;
	pub const DEFAULT_CROP_SIZE: usize = 32;
	pub const DEFAULT_NUM_THREADS: usize = 4;
	pub const PROBE_INDEX: usize = 2;
	/// Low-res images are trimmed by this many pixels when shown next to results.
	pub const LR_BORDER: usize = 2;
}

pub mod psnr {
	pub const MAX_VALUE: f32 = 1.0;
	pub const LOG10_MULTIPLIER: f32 = 10.0;
}

pub mod file {
	pub const PARAM_EXTENSION: &str = "rsr";
	pub const PNG_EXTENSION: &str = "png";
	pub const MODEL_DIR: &str = "model";
	pub const LOG_DIR: &str = "logs";
	pub const RESULT_DIR: &str = "result";
	pub const TRAIN_RESULT_DIR: &str = "train_result";
	pub const TEST_RESULT_DIR: &str = "test_result";
	pub const SR_RESULT_FILE: &str = "SR_result.png";
	pub const SCALAR_LOG_FILE: &str = "scalars.jsonl";
	pub const METRICS_FILE: &str = "metrics.json";
	pub const LOSS_HISTORY_FILE: &str = "avg_loss.json";
	pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];
}
