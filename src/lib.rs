extern crate clap;
extern crate image;
extern crate rand;
#[macro_use]
extern crate ndarray;
#[macro_use]
extern crate serde_derive;
extern crate bincode;
extern crate indexmap;
extern crate serde;
extern crate xz2;

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod dataset;
pub mod device;
pub mod error;
pub mod logging;
pub mod network;
pub mod psnr;
pub mod training;
pub mod utils;

use std::{io::Read, num::FpCategory};

use bincode::{deserialize, serialize};
use xz2::read::{XzDecoder, XzEncoder};

pub use crate::config::{Config, NetworkConfig, RunConfig, TrainingConfig};
pub use crate::error::{FsrcnnError, Result};
pub use crate::network::{Network, ParameterSet};

/// Compression level used for `.rsr` checkpoints.
const XZ_LEVEL: u32 = 7;

/// The architecture and parameters of a trained network, as stored in `.rsr` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
	pub architecture: NetworkConfig,
	pub parameters: ParameterSet,
}

impl Checkpoint {
	pub fn from_network(network: &Network) -> Self {
		Checkpoint {
			architecture: network.config().clone(),
			parameters: network.parameters(),
		}
	}

	/// Build a network of the stored architecture holding the stored parameters.
	pub fn into_network(self) -> Result<Network> {
		let mut network = Network::new(&self.architecture)?;
		network.load_parameters(&self.parameters)?;
		Ok(network)
	}
}

/// Decompresses and deserialises a checkpoint from the byte format used in .rsr files
pub fn checkpoint_from_bytes(data: &[u8]) -> Result<Checkpoint> {
	let decompressed = XzDecoder::new(data)
		.bytes()
		.collect::<::std::result::Result<Vec<_>, _>>()
		.map_err(|e| FsrcnnError::Serialization(format!("checkpoint decompression failed: {}", e)))?;
	let unshuffled = unshuffle(&decompressed, 4);
	deserialize(&unshuffled).map_err(|e| FsrcnnError::Serialization(format!("checkpoint decoding failed: {}", e)))
}

/// Serialises and compresses a checkpoint returning the byte format used in .rsr files.
/// Subnormal values are flushed to zero to improve compression.
pub fn checkpoint_to_bytes(mut checkpoint: Checkpoint) -> Result<Vec<u8>> {
	for arr in checkpoint.parameters.values_mut() {
		for e in arr.iter_mut() {
			if let FpCategory::Subnormal = e.classify() {
				*e = 0.0;
			}
		}
	}

	let serialized: Vec<u8> = serialize(&checkpoint)
		.map_err(|e| FsrcnnError::Serialization(format!("checkpoint encoding failed: {}", e)))?;
	let shuffled = shuffle(&serialized, 4);
	XzEncoder::new(shuffled.as_slice(), XZ_LEVEL)
		.bytes()
		.collect::<::std::result::Result<Vec<_>, _>>()
		.map_err(FsrcnnError::from)
}

/// Shuffle f32 bytes so that all first bytes are contiguous etc
/// Improves compression of floating point data
fn shuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut vec = Vec::with_capacity(data.len());
	for offset in 0..stride {
		for i in 0..(data.len() + stride - 1 - offset) / stride {
			vec.push(data[offset + i * stride])
		}
	}
	debug_assert_eq!(vec.len(), data.len());
	vec
}

/// Inverts `shuffle()`
fn unshuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut vec = vec![0; data.len()];
	let mut inc = 0;
	for offset in 0..stride {
		for i in 0..(data.len() + stride - 1 - offset) / stride {
			vec[offset + i * stride] = data[inc];
			inc += 1;
		}
	}
	debug_assert_eq!(inc, data.len());
	vec
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_shuffle_inverts_for_ragged_lengths() {
		for len in 0..11 {
			let data: Vec<u8> = (0..len as u8).collect();
			assert_eq!(unshuffle(&shuffle(&data, 4), 4), data);
		}
	}

	#[test]
	fn test_checkpoint_bytes_restore_network() {
		let config = NetworkConfig::builder().scale_factor(2).d(6).s(3).m(1).build();
		let mut network = Network::new(&config).unwrap();
		network.weight_init(0.0, 0.02, &mut StdRng::seed_from_u64(1)).unwrap();

		let bytes = checkpoint_to_bytes(Checkpoint::from_network(&network)).unwrap();
		let restored = checkpoint_from_bytes(&bytes).unwrap().into_network().unwrap();
		assert_eq!(restored.config(), network.config());
		assert_eq!(restored.parameters(), network.parameters());
	}

	#[test]
	fn test_garbage_is_a_serialization_error() {
		match checkpoint_from_bytes(b"not a checkpoint") {
			Err(FsrcnnError::Serialization(_)) => {},
			other => panic!("unexpected {:?}", other.map(|_| ())),
		}
	}
}
