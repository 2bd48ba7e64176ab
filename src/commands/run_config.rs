use std::path::PathBuf;

use clap::ArgMatches;
use tracing::info;

use crate::config::Config;
use crate::config_file::ConfigFile;
use crate::error::Result;
use crate::parse_param;

/// Builds the run configuration: defaults, then `--config`, then individual flags.
pub fn resolve_config(app_m: &ArgMatches) -> Result<Config> {
	let mut file = match app_m.value_of("CONFIG") {
		Some(path) => {
			info!("Loaded configuration from: {}", path);
			ConfigFile::from_path(path)?
		},
		None => ConfigFile::default(),
	};

	if let Some(name) = app_m.value_of("MODEL_NAME") {
		file.output.model_name = name.to_string();
	}
	if let Some(dataset) = app_m.value_of("TRAIN_DATASET") {
		file.data.train_dataset = dataset.to_string();
	}
	if let Some(dataset) = app_m.value_of("TEST_DATASET") {
		file.data.test_dataset = dataset.to_string();
	}
	if let Some(dir) = app_m.value_of("DATA_DIR") {
		file.data.data_dir = PathBuf::from(dir);
	}
	if let Some(dir) = app_m.value_of("SAVE_DIR") {
		file.output.save_dir = PathBuf::from(dir);
	}
	if app_m.is_present("GPU_MODE") {
		file.output.gpu_mode = true;
	}

	let network = &mut file.network;
	if let Some(v) = parse_param!(app_m, "NUM_CHANNELS", usize, "1 or 3") {
		network.num_channels = v;
	}
	if let Some(v) = parse_param!(app_m, "SCALE_FACTOR", usize, "a positive integer") {
		network.scale_factor = v;
	}
	if let Some(v) = parse_param!(app_m, "D", usize, "a positive integer") {
		network.d = v;
	}
	if let Some(v) = parse_param!(app_m, "S", usize, "a positive integer") {
		network.s = v;
	}
	if let Some(v) = parse_param!(app_m, "M", usize, "a non-negative integer") {
		network.m = v;
	}

	let training = &mut file.training;
	if let Some(v) = parse_param!(app_m, "NUM_EPOCHS", usize, "a non-negative integer") {
		training.num_epochs = v;
	}
	if let Some(v) = parse_param!(app_m, "SAVE_EPOCHS", usize, "a positive integer") {
		training.save_epochs = v;
	}
	if let Some(v) = parse_param!(app_m, "BATCH_SIZE", usize, "a positive integer") {
		training.batch_size = v;
	}
	if let Some(v) = parse_param!(app_m, "TEST_BATCH_SIZE", usize, "a positive integer") {
		training.test_batch_size = v;
	}
	if let Some(v) = parse_param!(app_m, "LEARNING_RATE", f32, "a positive number") {
		training.lr = v;
	}
	if let Some(v) = parse_param!(app_m, "CROP_SIZE", usize, "a positive integer") {
		training.crop_size = v;
	}
	if let Some(v) = parse_param!(app_m, "NUM_THREADS", usize, "a non-negative integer") {
		training.num_threads = v;
	}
	if let Some(v) = parse_param!(app_m, "PROBE_INDEX", usize, "a non-negative integer") {
		training.probe_index = v;
	}
	if let Some(v) = parse_param!(app_m, "SEED", u64, "a non-negative integer") {
		training.seed = Some(v);
	}

	file.to_config()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cli::build_app;
	use std::fs;
	use tempfile::TempDir;

	fn resolve(args: Vec<&str>) -> Result<Config> {
		let matches = build_app().get_matches_from_safe(args).unwrap();
		let (_, sub) = matches.subcommand();
		resolve_config(sub.unwrap())
	}

	#[test]
	fn test_flags_override_defaults() {
		let config = resolve(vec!["fsrcnn", "train", "--scale-factor", "2", "--seed", "5", "--save-dir", "out"]).unwrap();
		assert_eq!(config.network.scale_factor, 2);
		assert_eq!(config.training.seed, Some(5));
		assert_eq!(config.run.save_dir, PathBuf::from("out"));
		assert_eq!(config.training.batch_size, 64);
	}

	#[test]
	fn test_flags_override_the_file() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("run.toml");
		fs::write(&path, "[training]\nbatch_size = 8\nnum_epochs = 3\n").unwrap();
		let config = resolve(vec![
			"fsrcnn",
			"test",
			"--config",
			path.to_str().unwrap(),
			"--num-epochs",
			"7",
		])
		.unwrap();
		assert_eq!(config.training.batch_size, 8);
		assert_eq!(config.training.num_epochs, 7);
	}

	#[test]
	fn test_bad_numbers_are_reported() {
		assert!(resolve(vec!["fsrcnn", "train", "--lr", "fast"]).is_err());
		assert!(resolve(vec!["fsrcnn", "train", "--num-channels", "2"]).is_err());
	}
}
