use crate::config::{Config, NetworkConfig, RunConfig, TrainingConfig};
use crate::error::{FsrcnnError, Result};
use crate::utils::{file_io, ParseErrorMapper};
use std::path::{Path, PathBuf};

/// Run configuration as stored in a TOML or JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Network architecture
    #[serde(default)]
    pub network: NetworkConfigSection,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingConfigSection,

    /// Dataset locations
    #[serde(default)]
    pub data: DataConfigSection,

    /// Output locations and model name
    #[serde(default)]
    pub output: OutputConfigSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfigSection {
    /// 1 (luma) or 3 (RGB) (default: 1)
    pub num_channels: usize,

    /// Upscaling factor (default: 4)
    pub scale_factor: usize,

    /// Feature width (default: 56)
    pub d: usize,

    /// Shrunk width (default: 12)
    pub s: usize,

    /// Number of mapping layers (default: 4)
    pub m: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfigSection {
    pub num_epochs: usize,
    /// Save an epoch checkpoint every N epochs (default: 10)
    pub save_epochs: usize,
    pub batch_size: usize,
    pub test_batch_size: usize,
    /// SGD learning rate (default: 0.001)
    pub lr: f32,
    /// Training patch size before downscaling (default: 32)
    pub crop_size: usize,
    /// Loader worker threads (default: 4)
    pub num_threads: usize,
    /// Held-out image evaluated after every epoch (default: 2)
    pub probe_index: usize,
    /// Seed for initialisation, shuffling and crops (optional)
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfigSection {
    /// Directory holding one folder per dataset
    pub data_dir: PathBuf,
    pub train_dataset: String,
    pub test_dataset: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfigSection {
    pub model_name: String,
    /// Root of model/, logs/, train_result/, test_result/ and result/
    pub save_dir: PathBuf,
    /// Run on an accelerator; fails when none is available (default: false)
    pub gpu_mode: bool,
}

impl Default for NetworkConfigSection {
    fn default() -> Self {
        NetworkConfigSection::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for NetworkConfigSection {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            num_channels: config.num_channels,
            scale_factor: config.scale_factor,
            d: config.d,
            s: config.s,
            m: config.m,
        }
    }
}

impl Default for TrainingConfigSection {
    fn default() -> Self {
        TrainingConfigSection::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for TrainingConfigSection {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            num_epochs: config.num_epochs,
            save_epochs: config.save_epochs,
            batch_size: config.batch_size,
            test_batch_size: config.test_batch_size,
            lr: config.learning_rate,
            crop_size: config.crop_size,
            num_threads: config.num_threads,
            probe_index: config.probe_index,
            seed: config.seed,
        }
    }
}

impl Default for DataConfigSection {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            data_dir: run.data_dir,
            train_dataset: run.train_dataset,
            test_dataset: run.test_dataset,
        }
    }
}

impl Default for OutputConfigSection {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            model_name: run.model_name,
            save_dir: run.save_dir,
            gpu_mode: run.gpu_mode,
        }
    }
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = file_io::read_file_string(path)?;
        toml::from_str(&contents).map_parse_err("Failed to parse TOML config")
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = file_io::read_file_string(path)?;
        serde_json::from_str(&contents).map_parse_err("Failed to parse JSON config")
    }

    /// Load a `.json` file as JSON and anything else as TOML
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FsrcnnError::Serialization(format!("Failed to serialize to TOML: {}", e)))?;
        file_io::write_file_atomic(path, contents.as_bytes())
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| FsrcnnError::Serialization(format!("Failed to serialize to JSON: {}", e)))?;
        file_io::write_file_atomic(path, contents.as_bytes())
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            network: NetworkConfigSection::from(&config.network),
            training: TrainingConfigSection::from(&config.training),
            data: DataConfigSection {
                data_dir: config.run.data_dir.clone(),
                train_dataset: config.run.train_dataset.clone(),
                test_dataset: config.run.test_dataset.clone(),
            },
            output: OutputConfigSection {
                model_name: config.run.model_name.clone(),
                save_dir: config.run.save_dir.clone(),
                gpu_mode: config.run.gpu_mode,
            },
        }
    }

    /// Convert to a validated [`Config`]
    pub fn to_config(&self) -> Result<Config> {
        let config = Config {
            network: NetworkConfig {
                num_channels: self.network.num_channels,
                scale_factor: self.network.scale_factor,
                d: self.network.d,
                s: self.network.s,
                m: self.network.m,
            },
            training: TrainingConfig {
                num_epochs: self.training.num_epochs,
                save_epochs: self.training.save_epochs,
                batch_size: self.training.batch_size,
                test_batch_size: self.training.test_batch_size,
                learning_rate: self.training.lr,
                crop_size: self.training.crop_size,
                num_threads: self.training.num_threads,
                probe_index: self.training.probe_index,
                seed: self.training.seed,
            },
            run: RunConfig {
                model_name: self.output.model_name.clone(),
                train_dataset: self.data.train_dataset.clone(),
                test_dataset: self.data.test_dataset.clone(),
                data_dir: self.data.data_dir.clone(),
                save_dir: self.output.save_dir.clone(),
                gpu_mode: self.output.gpu_mode,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Create an example configuration file with comments
    pub fn create_example_toml() -> String {
        r#"# FSRCNN training configuration

[network]
# 1 trains on the Y channel of YCbCr, 3 on RGB
num_channels = 1

# Upscaling factor
scale_factor = 4

# Feature width, shrunk width and number of mapping layers
d = 56
s = 12
m = 4

[training]
num_epochs = 100

# Save a numbered checkpoint every N epochs
save_epochs = 10

batch_size = 64
test_batch_size = 1

# SGD learning rate (momentum is fixed at 0.9)
lr = 0.001

# Size of training patches, rounded down to a multiple of scale_factor
crop_size = 32

# Threads decoding training images
num_threads = 4

# Held-out image evaluated after every epoch
probe_index = 2

# Seed for weight initialisation, shuffling and crop positions (optional)
# seed = 42

[data]
# Images are read from {data_dir}/{dataset}/train and {data_dir}/{dataset}/test
data_dir = "../Data"
train_dataset = "bsds300"
test_dataset = "bsds300"

[output]
model_name = "FSRCNN"

# Checkpoints, logs and result images are written below this directory
save_dir = "Result"

# Fail unless an accelerator is available
gpu_mode = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_matches_config_defaults() {
        let config = ConfigFile::default().to_config().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_example_toml_parses_to_defaults() {
        let parsed: ConfigFile = toml::from_str(&ConfigFile::create_example_toml()).unwrap();
        assert_eq!(parsed.to_config().unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: ConfigFile = toml::from_str("[network]\nscale_factor = 3\n").unwrap();
        let config = parsed.to_config().unwrap();
        assert_eq!(config.network.scale_factor, 3);
        assert_eq!(config.network.d, 56);
        assert_eq!(config.training.batch_size, 64);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let parsed: ConfigFile = toml::from_str("[training]\nlr = 0.0\n").unwrap();
        assert!(parsed.to_config().is_err());
    }

    #[test]
    fn test_save_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.training.seed = Some(7);
        let file = ConfigFile::from_config(&config);
        file.to_toml_file(&path).unwrap();

        let loaded = ConfigFile::from_path(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_save_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let file = ConfigFile::default();
        file.to_json_file(&path).unwrap();

        let loaded = ConfigFile::from_path(&path).unwrap();
        assert_eq!(loaded, file);
    }
}
