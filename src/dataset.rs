//! Image-folder training and test sources.

use std::path::{Path, PathBuf};

use ndarray::{s, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{FsrcnnError, Result};
use crate::utils::{file_io, image as image_utils};

/// A low-resolution input paired with its high-resolution target, both `[C, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
	pub input: Array3<f32>,
	pub target: Array3<f32>,
}

impl Sample {
	/// Pairs `input` and `target`, checking that the target is exactly `scale`
	/// times larger.
	pub fn new(input: Array3<f32>, target: Array3<f32>, scale: usize) -> Result<Self> {
		let (ci, hi, wi) = input.dim();
		let (ct, ht, wt) = target.dim();
		if ci != ct || hi * scale != ht || wi * scale != wt {
			return Err(FsrcnnError::Shape(format!(
				"target {:?} is not input {:?} scaled by {}",
				target.dim(),
				input.dim(),
				scale
			)));
		}
		Ok(Sample { input, target })
	}
}

/// Random access to samples by integer index.
pub trait SampleSource: Sync {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get(&self, index: usize) -> Result<Sample>;
}

/// Samples held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
	samples: Vec<Sample>,
}

impl InMemoryDataset {
	pub fn new(samples: Vec<Sample>) -> Self {
		InMemoryDataset { samples }
	}
}

impl SampleSource for InMemoryDataset {
	fn len(&self) -> usize {
		self.samples.len()
	}

	fn get(&self, index: usize) -> Result<Sample> {
		self.samples.get(index).cloned().ok_or_else(|| {
			FsrcnnError::Dataset(format!("index {} out of range for {} samples", index, self.samples.len()))
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cropping {
	/// Square patch of the given size at a random position. With a seed the
	/// position is fixed per index.
	Patch { size: usize, seed: Option<u64> },
	/// Whole image, trimmed to a multiple of the scale factor.
	Full,
}

/// Decodes images from `{data_dir}/{dataset}/{train|test}` on demand.
#[derive(Debug, Clone)]
pub struct ImageFolderDataset {
	files: Vec<PathBuf>,
	cropping: Cropping,
	scale_factor: usize,
	is_grayscale: bool,
	normalize: bool,
}

impl ImageFolderDataset {
	pub fn training_set<P: AsRef<Path>>(
		data_dir: P,
		dataset: &str,
		crop_size: usize,
		scale_factor: usize,
		is_grayscale: bool,
		normalize: bool,
	) -> Result<Self> {
		let crop = crop_size - crop_size % scale_factor.max(1);
		if crop == 0 {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Crop size ({}) is smaller than the scale factor ({})",
				crop_size, scale_factor
			)));
		}
		let dir = data_dir.as_ref().join(dataset).join("train");
		Self::open(&dir, Cropping::Patch { size: crop, seed: None }, scale_factor, is_grayscale, normalize)
	}

	pub fn test_set<P: AsRef<Path>>(
		data_dir: P,
		dataset: &str,
		scale_factor: usize,
		is_grayscale: bool,
		normalize: bool,
	) -> Result<Self> {
		let dir = data_dir.as_ref().join(dataset).join("test");
		Self::open(&dir, Cropping::Full, scale_factor, is_grayscale, normalize)
	}

	/// Make training crops reproducible. Each index gets its own fixed
	/// position derived from `seed`.
	pub fn with_random_crops(mut self, seed: u64) -> Self {
		if let Cropping::Patch { size, .. } = self.cropping {
			self.cropping = Cropping::Patch { size, seed: Some(seed) };
		}
		self
	}

	fn open(dir: &Path, cropping: Cropping, scale_factor: usize, is_grayscale: bool, normalize: bool) -> Result<Self> {
		if scale_factor == 0 {
			return Err(FsrcnnError::InvalidParameter("Scale factor must be greater than 0".into()));
		}
		let files = file_io::list_images(dir)?;
		if files.is_empty() {
			return Err(FsrcnnError::Dataset(format!("no images found in {}", dir.display())));
		}
		debug!(dir = %dir.display(), images = files.len(), "Opened image folder");
		Ok(ImageFolderDataset {
			files,
			cropping,
			scale_factor,
			is_grayscale,
			normalize,
		})
	}

	fn crop(&self, index: usize, image: Array3<f32>) -> Result<Array3<f32>> {
		let (_, height, width) = image.dim();
		let path = &self.files[index];
		match self.cropping {
			Cropping::Patch { size, seed } => {
				if height < size || width < size {
					return Err(FsrcnnError::Dataset(format!(
						"{} ({}x{}) is smaller than the {} crop",
						path.display(),
						height,
						width,
						size
					)));
				}
				let (top, left) = match seed {
					Some(seed) => {
						let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
						(rng.gen_range(0..=height - size), rng.gen_range(0..=width - size))
					},
					None => {
						let mut rng = rand::thread_rng();
						(rng.gen_range(0..=height - size), rng.gen_range(0..=width - size))
					},
				};
				Ok(image.slice(s![.., top..top + size, left..left + size]).to_owned())
			},
			Cropping::Full => {
				let h = height - height % self.scale_factor;
				let w = width - width % self.scale_factor;
				if h == 0 || w == 0 {
					return Err(FsrcnnError::Dataset(format!(
						"{} ({}x{}) is smaller than the scale factor",
						path.display(),
						height,
						width
					)));
				}
				Ok(image.slice(s![.., 0..h, 0..w]).to_owned())
			},
		}
	}
}

impl SampleSource for ImageFolderDataset {
	fn len(&self) -> usize {
		self.files.len()
	}

	fn get(&self, index: usize) -> Result<Sample> {
		let path = self
			.files
			.get(index)
			.ok_or_else(|| FsrcnnError::Dataset(format!("index {} out of range for {} images", index, self.files.len())))?;
		let image = image_utils::load_image(path)?;
		let target = self.crop(index, image_utils::image_to_tensor(&image, self.is_grayscale))?;
		let (_, h, w) = target.dim();
		let input = image_utils::resize_tensor(target.view(), h / self.scale_factor, w / self.scale_factor)?;
		let (input, target) = if self.normalize {
			(input.mapv(|x| 2.0 * x - 1.0), target.mapv(|x| 2.0 * x - 1.0))
		} else {
			(input, target)
		};
		Sample::new(input, target, self.scale_factor)
	}
}
