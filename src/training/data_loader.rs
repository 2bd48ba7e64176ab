use std::vec;

use ndarray::{stack, Array4, ArrayView3, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::dataset::{Sample, SampleSource};
use crate::error::{FsrcnnError, Result};

/// A stacked group of samples, `[N, C, H, W]`.
#[derive(Debug, Clone)]
pub struct Batch {
	pub input: Array4<f32>,
	pub target: Array4<f32>,
}

impl Batch {
	pub fn from_samples(samples: &[Sample]) -> Result<Self> {
		if samples.is_empty() {
			return Err(FsrcnnError::Dataset("cannot build an empty batch".into()));
		}
		let inputs: Vec<ArrayView3<f32>> = samples.iter().map(|s| s.input.view()).collect();
		let targets: Vec<ArrayView3<f32>> = samples.iter().map(|s| s.target.view()).collect();
		Ok(Batch {
			input: stack_views(&inputs, "input")?,
			target: stack_views(&targets, "target")?,
		})
	}

	pub fn len(&self) -> usize {
		self.input.dim().0
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn input(&self, index: usize) -> ArrayView3<f32> {
		self.input.index_axis(Axis(0), index)
	}

	pub fn target(&self, index: usize) -> ArrayView3<f32> {
		self.target.index_axis(Axis(0), index)
	}
}

fn stack_views(views: &[ArrayView3<f32>], what: &str) -> Result<Array4<f32>> {
	let first = views[0].dim();
	if let Some(other) = views.iter().find(|v| v.dim() != first) {
		return Err(FsrcnnError::Shape(format!(
			"cannot batch {} images of shape {:?} and {:?}",
			what,
			first,
			other.dim()
		)));
	}
	Ok(stack(Axis(0), views)?)
}

/// Groups a source into batches, decoding each batch's samples on a worker pool.
pub struct BatchLoader<'a, S: SampleSource> {
	source: &'a S,
	batch_size: usize,
	shuffle: bool,
	pool: ThreadPool,
}

impl<'a, S: SampleSource> BatchLoader<'a, S> {
	pub fn new(source: &'a S, batch_size: usize, shuffle: bool, num_threads: usize) -> Result<Self> {
		if batch_size == 0 {
			return Err(FsrcnnError::InvalidParameter("Batch size must be greater than 0".into()));
		}
		let pool = ThreadPoolBuilder::new()
			.num_threads(num_threads)
			.thread_name(|i| format!("fsrcnn-loader-{}", i))
			.build()
			.map_err(|e| FsrcnnError::Dataset(format!("failed to start loader threads: {}", e)))?;
		Ok(BatchLoader {
			source,
			batch_size,
			shuffle,
			pool,
		})
	}

	/// Number of batches per pass, counting a final partial batch.
	pub fn num_batches(&self) -> usize {
		(self.source.len() + self.batch_size - 1) / self.batch_size
	}

	/// One pass over the source. The order is shuffled with `rng` when the loader shuffles.
	pub fn iter<R: Rng + ?Sized>(&self, rng: &mut R) -> Batches<'_, 'a, S> {
		let mut order: Vec<usize> = (0..self.source.len()).collect();
		if self.shuffle {
			order.shuffle(rng);
		}
		let chunks: Vec<Vec<usize>> = order.chunks(self.batch_size).map(|c| c.to_vec()).collect();
		Batches {
			loader: self,
			chunks: chunks.into_iter(),
		}
	}

	fn load(&self, indices: &[usize]) -> Result<Batch> {
		let source = self.source;
		let samples = self
			.pool
			.install(|| indices.par_iter().map(|&i| source.get(i)).collect::<Result<Vec<Sample>>>())?;
		Batch::from_samples(&samples)
	}
}

pub struct Batches<'l, 'a, S: SampleSource> {
	loader: &'l BatchLoader<'a, S>,
	chunks: vec::IntoIter<Vec<usize>>,
}

impl<S: SampleSource> Iterator for Batches<'_, '_, S> {
	type Item = Result<Batch>;

	fn next(&mut self) -> Option<Self::Item> {
		let indices = self.chunks.next()?;
		Some(self.loader.load(&indices))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.chunks.size_hint()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::InMemoryDataset;
	use ndarray::Array3;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	fn dataset(n: usize) -> InMemoryDataset {
		InMemoryDataset::new(
			(0..n)
				.map(|i| Sample {
					input: Array3::from_elem((1, 2, 2), i as f32),
					target: Array3::from_elem((1, 4, 4), i as f32),
				})
				.collect(),
		)
	}

	#[test]
	fn test_batches_cover_every_sample_once() {
		let data = dataset(7);
		let loader = BatchLoader::new(&data, 3, true, 2).unwrap();
		assert_eq!(loader.num_batches(), 3);
		let mut rng = StdRng::seed_from_u64(3);
		let mut seen: Vec<usize> = Vec::new();
		let mut sizes = Vec::new();
		for batch in loader.iter(&mut rng) {
			let batch = batch.unwrap();
			sizes.push(batch.len());
			for i in 0..batch.len() {
				seen.push(batch.input(i)[[0, 0, 0]] as usize);
			}
		}
		seen.sort();
		assert_eq!(seen, (0..7).collect::<Vec<_>>());
		assert_eq!(sizes, vec![3, 3, 1]);
	}

	#[test]
	fn test_unshuffled_order_is_stable() {
		let data = dataset(4);
		let loader = BatchLoader::new(&data, 2, false, 1).unwrap();
		let firsts: Vec<f32> = loader
			.iter(&mut StdRng::seed_from_u64(0))
			.map(|b| b.unwrap().input[[0, 0, 0, 0]])
			.collect();
		assert_eq!(firsts, vec![0.0, 2.0]);
	}

	#[test]
	fn test_mixed_shapes_cannot_be_batched() {
		let samples = vec![
			Sample {
				input: Array3::zeros((1, 2, 2)),
				target: Array3::zeros((1, 4, 4)),
			},
			Sample {
				input: Array3::zeros((1, 3, 3)),
				target: Array3::zeros((1, 6, 6)),
			},
		];
		assert!(matches!(Batch::from_samples(&samples), Err(FsrcnnError::Shape(_))));
	}

	#[test]
	fn test_zero_batch_size_is_rejected() {
		let data = dataset(1);
		assert!(BatchLoader::new(&data, 0, false, 1).is_err());
	}
}
