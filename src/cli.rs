use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub fn build_cli() -> ArgMatches<'static> {
	build_app().get_matches()
}

pub fn build_app() -> App<'static, 'static> {
	App::new("fsrcnn")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Train and apply an FSRCNN super-resolution network")
		.settings(&[AppSettings::SubcommandRequiredElseHelp, AppSettings::VersionlessSubcommands])
		.arg(
			Arg::with_name("VERBOSE")
				.short("v")
				.long("verbose")
				.multiple(true)
				.global(true)
				.help("Log more detail; repeat for trace output"),
		)
		.arg(
			Arg::with_name("LOG_FORMAT")
				.long("log-format")
				.value_name("FORMAT")
				.possible_values(&["compact", "pretty", "json"])
				.global(true)
				.help("Console log format. Default: compact"),
		)
		.arg(
			Arg::with_name("LOG_DIR")
				.long("log-dir")
				.value_name("DIR")
				.global(true)
				.empty_values(false)
				.help("Also write a JSON log file into this directory"),
		)
		.subcommand(build_train_subcommand())
		.subcommand(build_test_subcommand())
		.subcommand(build_test_single_subcommand())
		.subcommand(build_psnr_subcommand())
		.subcommand(build_generate_config_subcommand())
}

fn build_train_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("train")
		.about("Train a network on {data_dir}/{train_dataset}/train, probing the test set every epoch")
		.args(&run_config_args())
}

fn build_test_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("test")
		.about("Score the saved model against bicubic upscaling on {data_dir}/{test_dataset}/test")
		.args(&run_config_args())
}

fn build_test_single_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("test-single")
		.about("Super-resolve one image with the saved model into {save_dir}/result/SR_result.png")
		.arg(
			Arg::with_name("IMAGE")
				.required(true)
				.index(1)
				.help("The image to super-resolve"),
		)
		.args(&run_config_args())
}

fn build_psnr_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("psnr")
		.about("Print the PSNR value from the differences between the two images")
		.arg(
			Arg::with_name("IMAGE1")
				.required(true)
				.index(1)
				.help("PSNR is calculated using the difference between this image and IMAGE2"),
		)
		.arg(
			Arg::with_name("IMAGE2")
				.required(true)
				.index(2)
				.help("PSNR is calculated using the difference between this image and IMAGE1"),
		)
}

fn build_generate_config_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("generate-config")
		.about("Write a configuration file with the default settings")
		.arg(
			Arg::with_name("OUTPUT_FILE")
				.index(1)
				.help("Where to write the configuration. Default: fsrcnn.toml"),
		)
		.arg(
			Arg::with_name("FORMAT")
				.long("format")
				.value_name("FORMAT")
				.possible_values(&["toml", "json"])
				.help("File format. Default: toml"),
		)
		.arg(
			Arg::with_name("EXAMPLE")
				.long("example")
				.help("Write a commented example instead (TOML only)"),
		)
		.arg(
			Arg::with_name("FORCE")
				.long("force")
				.help("Overwrite an existing file"),
		)
}

fn value_arg(name: &'static str, long: &'static str, help: &'static str) -> Arg<'static, 'static> {
	Arg::with_name(name)
		.long(long)
		.value_name(name)
		.takes_value(true)
		.empty_values(false)
		.help(help)
}

/// Options shared by the three modes. Each overrides the configuration file.
fn run_config_args() -> Vec<Arg<'static, 'static>> {
	vec![
		value_arg("CONFIG", "config", "Read settings from this TOML or JSON file first"),
		value_arg("MODEL_NAME", "model-name", "Name used for checkpoint files. Default: FSRCNN"),
		value_arg("TRAIN_DATASET", "train-dataset", "Dataset folder used for training. Default: bsds300"),
		value_arg("TEST_DATASET", "test-dataset", "Dataset folder used for testing. Default: bsds300"),
		value_arg("CROP_SIZE", "crop-size", "Training patch size. Default: 32"),
		value_arg("NUM_THREADS", "num-threads", "Threads decoding images. Default: 4"),
		value_arg("NUM_CHANNELS", "num-channels", "1 for luma, 3 for RGB. Default: 1"),
		value_arg("SCALE_FACTOR", "scale-factor", "Upscaling factor. Default: 4"),
		value_arg("NUM_EPOCHS", "num-epochs", "Number of training epochs. Default: 100"),
		value_arg("SAVE_EPOCHS", "save-epochs", "Save a numbered checkpoint every N epochs. Default: 10"),
		value_arg("BATCH_SIZE", "batch-size", "Training batch size. Default: 64"),
		value_arg("TEST_BATCH_SIZE", "test-batch-size", "Testing batch size. Default: 1"),
		value_arg("LEARNING_RATE", "lr", "SGD learning rate. Default: 0.001"),
		value_arg("DATA_DIR", "data-dir", "Directory holding the datasets. Default: ../Data"),
		value_arg("SAVE_DIR", "save-dir", "Directory for models, logs and results. Default: Result"),
		value_arg("D", "d", "Feature width. Default: 56"),
		value_arg("S", "s", "Shrunk width. Default: 12"),
		value_arg("M", "m", "Number of mapping layers. Default: 4"),
		value_arg("PROBE_INDEX", "probe-index", "Test image evaluated after every epoch. Default: 2"),
		value_arg("SEED", "seed", "Seed for initialisation, shuffling and crops"),
		Arg::with_name("GPU_MODE")
			.long("gpu-mode")
			.help("Run on an accelerator; fails when none is available"),
	]
}
