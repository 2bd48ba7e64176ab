use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::constants::file;
use crate::error::{FsrcnnError, Result};
use crate::network::Network;
use crate::utils::file_io;
use crate::{checkpoint_from_bytes, checkpoint_to_bytes, Checkpoint};

/// Result of looking for the canonical checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
	Loaded(PathBuf),
	NotFound(PathBuf),
}

/// Whether a network runs with trained parameters or its initial ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelState {
	Trained,
	Untrained,
}

impl From<&LoadOutcome> for ModelState {
	fn from(outcome: &LoadOutcome) -> Self {
		match outcome {
			LoadOutcome::Loaded(_) => ModelState::Trained,
			LoadOutcome::NotFound(_) => ModelState::Untrained,
		}
	}
}

impl fmt::Display for ModelState {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ModelState::Trained => write!(f, "trained"),
			ModelState::Untrained => write!(f, "untrained"),
		}
	}
}

/// Named parameter snapshots under `{save_dir}/model`.
pub struct CheckpointStore {
	model_dir: PathBuf,
	model_name: String,
	interval: usize,
}

impl CheckpointStore {
	pub fn new(save_dir: impl AsRef<Path>, model_name: &str, interval: usize) -> Self {
		Self {
			model_dir: save_dir.as_ref().join(file::MODEL_DIR),
			model_name: model_name.to_string(),
			interval,
		}
	}

	/// `epoch` counts from 1.
	pub fn should_checkpoint(&self, epoch: usize) -> bool {
		self.interval > 0 && epoch % self.interval == 0
	}

	pub fn path(&self, epoch: Option<usize>) -> PathBuf {
		let stem = match epoch {
			Some(epoch) => format!("{}_param_epoch_{}", self.model_name, epoch),
			None => format!("{}_param", self.model_name),
		};
		self.model_dir.join(format!("{}.{}", stem, file::PARAM_EXTENSION))
	}

	pub fn canonical_path(&self) -> PathBuf {
		self.path(None)
	}

	/// Writes the network's parameters, replacing any previous file whole.
	pub fn save(&self, network: &Network, epoch: Option<usize>) -> Result<PathBuf> {
		let path = self.path(epoch);
		let bytes = checkpoint_to_bytes(Checkpoint::from_network(network))?;
		file_io::write_file_atomic(&path, &bytes)?;
		info!(path = %path.display(), "Trained model is saved");
		Ok(path)
	}

	/// Restores the canonical checkpoint into `network`. A missing file is not
	/// an error; a file for another architecture is.
	pub fn load(&self, network: &mut Network) -> Result<LoadOutcome> {
		let path = self.canonical_path();
		if !path.is_file() {
			warn!(path = %path.display(), "No trained model found, running with initial parameters");
			return Ok(LoadOutcome::NotFound(path));
		}
		let checkpoint = checkpoint_from_bytes(&file_io::read_file_bytes(&path)?)?;
		if &checkpoint.architecture != network.config() {
			return Err(FsrcnnError::InvalidParameter(format!(
				"checkpoint {} was trained for {:?}, not {:?}",
				path.display(),
				checkpoint.architecture,
				network.config()
			)));
		}
		network.load_parameters(&checkpoint.parameters)?;
		info!(path = %path.display(), "Trained model is loaded");
		Ok(LoadOutcome::Loaded(path))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::NetworkConfig;
	use rand::rngs::StdRng;
	use rand::SeedableRng;
	use tempfile::TempDir;

	fn network(seed: u64) -> Network {
		let mut network = Network::new(&NetworkConfig::builder().scale_factor(2).d(4).s(2).m(1).build()).unwrap();
		network.weight_init(0.0, 0.02, &mut StdRng::seed_from_u64(seed)).unwrap();
		network
	}

	#[test]
	fn test_paths() {
		let store = CheckpointStore::new("Result", "FSRCNN", 10);
		assert_eq!(store.canonical_path(), PathBuf::from("Result/model/FSRCNN_param.rsr"));
		assert_eq!(store.path(Some(20)), PathBuf::from("Result/model/FSRCNN_param_epoch_20.rsr"));
		assert!(store.should_checkpoint(10));
		assert!(!store.should_checkpoint(11));
	}

	#[test]
	fn test_save_then_load() {
		let dir = TempDir::new().unwrap();
		let store = CheckpointStore::new(dir.path(), "net", 1);
		let trained = network(1);
		store.save(&trained, None).unwrap();

		let mut fresh = network(2);
		assert_eq!(store.load(&mut fresh).unwrap(), LoadOutcome::Loaded(store.canonical_path()));
		assert_eq!(fresh.parameters(), trained.parameters());
	}

	#[test]
	fn test_missing_checkpoint_is_reported() {
		let dir = TempDir::new().unwrap();
		let store = CheckpointStore::new(dir.path(), "net", 1);
		let mut fresh = network(2);
		let before = fresh.parameters();
		let outcome = store.load(&mut fresh).unwrap();
		assert_eq!(ModelState::from(&outcome), ModelState::Untrained);
		assert_eq!(fresh.parameters(), before);
	}

	#[test]
	fn test_epoch_checkpoint_is_not_loaded() {
		let dir = TempDir::new().unwrap();
		let store = CheckpointStore::new(dir.path(), "net", 1);
		store.save(&network(1), Some(3)).unwrap();
		assert!(matches!(store.load(&mut network(2)).unwrap(), LoadOutcome::NotFound(_)));
	}

	#[test]
	fn test_architecture_mismatch_is_fatal() {
		let dir = TempDir::new().unwrap();
		let store = CheckpointStore::new(dir.path(), "net", 1);
		store.save(&network(1), None).unwrap();
		let mut other = Network::new(&NetworkConfig::builder().scale_factor(3).d(4).s(2).m(1).build()).unwrap();
		assert!(store.load(&mut other).is_err());
	}
}
