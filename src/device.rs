use std::fmt;

use ndarray::Array4;

use crate::error::{FsrcnnError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backend {
	Cpu,
	Cuda,
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Backend::Cpu => write!(f, "CPU"),
			Backend::Cuda => write!(f, "CUDA"),
		}
	}
}

impl Backend {
	/// Only the host backend is compiled into this build.
	pub fn is_available(&self) -> bool {
		match self {
			Backend::Cpu => true,
			Backend::Cuda => false,
		}
	}
}

/// Where a session's network, loss and input tensors live.
///
/// Chosen once when a mode starts; tensors are never migrated afterwards
/// except through [`Device::place`] right before they reach the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Device {
	backend: Backend,
}

impl Device {
	/// Resolve the run's device. Accelerator mode never falls back to the host.
	pub fn select(gpu_mode: bool) -> Result<Self> {
		let backend = if gpu_mode { Backend::Cuda } else { Backend::Cpu };
		Self::with_backend(backend)
	}

	pub fn with_backend(backend: Backend) -> Result<Self> {
		if !backend.is_available() {
			return Err(FsrcnnError::DeviceUnavailable(format!(
				"{} backend was requested but is not available on this system",
				backend
			)));
		}
		Ok(Device { backend })
	}

	pub fn backend(&self) -> Backend {
		self.backend
	}

	pub fn place(&self, tensor: Array4<f32>) -> Result<Array4<f32>> {
		match self.backend {
			Backend::Cpu => Ok(tensor),
			other => Err(FsrcnnError::DeviceUnavailable(format!(
				"cannot place tensor on {}",
				other
			))),
		}
	}
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.backend)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cpu_selection() {
		let device = Device::select(false).unwrap();
		assert_eq!(device.backend(), Backend::Cpu);
		let tensor = Array4::<f32>::ones((1, 1, 4, 4));
		assert_eq!(device.place(tensor).unwrap().dim(), (1, 1, 4, 4));
	}

	#[test]
	fn test_accelerator_request_is_fatal() {
		match Device::select(true) {
			Err(FsrcnnError::DeviceUnavailable(msg)) => assert!(msg.contains("CUDA")),
			other => panic!("expected DeviceUnavailable, got {:?}", other),
		}
	}
}
