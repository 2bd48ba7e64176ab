//! Comparison images and annotations written during training and testing.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::session::Evaluation;
use crate::constants::file;
use crate::error::{FsrcnnError, Result};
use crate::utils::file_io;
use crate::utils::image::save_tensor_png;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	/// Probe image at the end of an epoch.
	Train,
	/// Held-out image during batch testing.
	Test,
}

#[derive(Serialize)]
struct Annotation {
	index: usize,
	bicubic_psnr: f32,
	recon_psnr: f32,
	images: Vec<String>,
}

/// Writes the four images of `evaluation` as PNGs plus a JSON file with their
/// PSNRs. `index` is the epoch for [`Stage::Train`] and the image number for
/// [`Stage::Test`]. Returns the annotation path.
pub fn save_comparison(save_dir: &Path, stage: Stage, index: usize, evaluation: &Evaluation) -> Result<PathBuf> {
	let (dir, stem) = match stage {
		Stage::Train => (file::TRAIN_RESULT_DIR, format!("Train_result_epoch_{}", index)),
		Stage::Test => (file::TEST_RESULT_DIR, format!("Test_result_{}", index)),
	};
	let dir = save_dir.join(dir);
	let images = [
		("gt", &evaluation.ground_truth),
		("lr", &evaluation.low_res),
		("bicubic", &evaluation.bicubic),
		("recon", &evaluation.reconstruction),
	];
	let mut names = Vec::with_capacity(images.len());
	for (kind, image) in images.iter() {
		let name = format!("{}_{}.{}", stem, kind, file::PNG_EXTENSION);
		save_tensor_png(image.view(), dir.join(&name))?;
		names.push(name);
	}

	let annotation = Annotation {
		index,
		bicubic_psnr: evaluation.bicubic_psnr,
		recon_psnr: evaluation.recon_psnr,
		images: names,
	};
	let json = serde_json::to_string_pretty(&annotation)
		.map_err(|e| FsrcnnError::Serialization(format!("annotation encoding failed: {}", e)))?;
	let path = dir.join(format!("{}.json", stem));
	file_io::write_file_atomic(&path, json.as_bytes())?;
	debug!(path = %path.display(), "Saved result images");
	Ok(path)
}

/// Writes the per-epoch average losses to `{save_dir}/logs/avg_loss.json`.
pub fn save_loss_history(save_dir: &Path, losses: &[f32]) -> Result<PathBuf> {
	let path = save_dir.join(file::LOG_DIR).join(file::LOSS_HISTORY_FILE);
	let json = serde_json::to_string_pretty(losses)
		.map_err(|e| FsrcnnError::Serialization(format!("loss history encoding failed: {}", e)))?;
	file_io::write_file_atomic(&path, json.as_bytes())?;
	Ok(path)
}
