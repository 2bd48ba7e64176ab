use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Axis};
use rand::Rng;
use tracing::info;

use super::checkpoint::{CheckpointStore, ModelState};
use super::session::Session;
use crate::config::Config;
use crate::constants::file;
use crate::error::{FsrcnnError, Result};
use crate::utils::image::{load_image, resize_plane, save_png, Ycbcr};

#[derive(Debug, Clone)]
pub struct InferenceReport {
	pub output_path: PathBuf,
	/// `(height, width)` of the saved image.
	pub output_size: (usize, usize),
	pub model_state: ModelState,
	/// The reconstructed luma after rescaling into `[0, 255]`.
	pub luma: Array2<f32>,
}

/// Stretch `plane` so its minimum maps to 0 and its maximum to 255, truncating
/// to whole levels. A constant plane maps to 0.
pub fn rescale_to_levels(plane: &Array2<f32>) -> Array2<f32> {
	let min = plane.iter().cloned().fold(f32::INFINITY, f32::min);
	let max = plane.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
	let range = max - min;
	if !(range > 0.0) || !range.is_finite() {
		return Array2::zeros(plane.raw_dim());
	}
	plane.mapv(|v| ((v - min) / range * 255.0).floor().max(0.0).min(255.0))
}

/// Super-resolve the luma of `image_path` and write the recombined colour image
/// to `{save_dir}/result/SR_result.png`.
pub fn run<R: Rng + ?Sized>(config: &Config, image_path: &Path, rng: &mut R) -> Result<InferenceReport> {
	if config.network.num_channels != 1 {
		return Err(FsrcnnError::InvalidParameter(format!(
			"single-image mode runs on luma only and needs num_channels = 1, not {}",
			config.network.num_channels
		)));
	}
	let mut session = Session::new(config, rng)?;
	let store = CheckpointStore::new(&config.run.save_dir, &config.run.model_name, config.training.save_epochs);
	let model_state = ModelState::from(&store.load(session.network_mut())?);

	let image = load_image(image_path)?;
	let ycbcr = Ycbcr::from_rgb(&image.to_rgb8());
	let input = (&ycbcr.y / 255.0).insert_axis(Axis(0)).insert_axis(Axis(0));

	let output = session.reconstruct(&input)?;
	let luma = rescale_to_levels(&output.slice(s![0, 0, .., ..]).to_owned());
	let (height, width) = luma.dim();

	let resize_chroma = |plane: &Array2<f32>| -> Result<Array2<f32>> {
		Ok(resize_plane((plane / 255.0).view(), height, width)? * 255.0)
	};
	let result = Ycbcr {
		cb: resize_chroma(&ycbcr.cb)?,
		cr: resize_chroma(&ycbcr.cr)?,
		y: luma,
	};

	let output_path = config.run.save_dir.join(file::RESULT_DIR).join(file::SR_RESULT_FILE);
	save_png(&image::DynamicImage::ImageRgb8(result.to_rgb()?), &output_path)?;
	info!(
		input = %image_path.display(),
		output = %output_path.display(),
		height,
		width,
		model = %model_state,
		"Saved super-resolved image"
	);

	Ok(InferenceReport {
		output_path,
		output_size: (height, width),
		model_state,
		luma: result.y,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rescale_stretches_to_full_range() {
		let plane = Array2::from_shape_vec((1, 3), vec![-1.0, 0.0, 1.0]).unwrap();
		let levels = rescale_to_levels(&plane);
		assert_eq!(levels.iter().cloned().collect::<Vec<_>>(), vec![0.0, 127.0, 255.0]);
	}

	#[test]
	fn test_constant_plane_maps_to_zero() {
		let plane = Array2::from_elem((2, 2), 0.3);
		assert!(rescale_to_levels(&plane).iter().all(|&v| v == 0.0));
	}

	#[test]
	fn test_color_network_is_rejected() {
		let mut config = Config::default();
		config.network.num_channels = 3;
		let mut rng = rand::thread_rng();
		assert!(matches!(
			run(&config, Path::new("missing.png"), &mut rng),
			Err(FsrcnnError::InvalidParameter(_))
		));
	}
}
