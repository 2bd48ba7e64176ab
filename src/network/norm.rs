use ndarray::{Array2, Array4, Axis};

use crate::constants::network;

/// Normalization applied between a block's convolution and its activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
	None,
	/// Per-sample, per-channel standardisation without affine parameters.
	Instance,
}

/// Values kept from an instance-norm forward pass for its backward pass.
#[derive(Debug, Clone)]
pub struct NormTrace {
	normalized: Array4<f32>,
	inv_std: Array2<f32>,
}

impl Norm {
	pub fn is_none(&self) -> bool {
		matches!(self, Norm::None)
	}

	pub fn forward(&self, input: &Array4<f32>) -> (Array4<f32>, Option<NormTrace>) {
		match self {
			Norm::None => (input.clone(), None),
			Norm::Instance => {
				let (batch, channels, _, _) = input.dim();
				let mut normalized = input.clone();
				let mut inv_std = Array2::zeros((batch, channels));
				for (n, mut sample) in normalized.outer_iter_mut().enumerate() {
					for (c, mut plane) in sample.outer_iter_mut().enumerate() {
						let count = plane.len() as f32;
						let mean = plane.sum() / count;
						let var = plane.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / count;
						let inv = 1.0 / (var + network::NORM_EPSILON).sqrt();
						plane.mapv_inplace(|v| (v - mean) * inv);
						inv_std[[n, c]] = inv;
					}
				}
				let trace = NormTrace {
					normalized: normalized.clone(),
					inv_std,
				};
				(normalized, Some(trace))
			},
		}
	}

	pub fn backward(&self, trace: Option<&NormTrace>, grad_output: &Array4<f32>) -> Array4<f32> {
		let trace = match (self, trace) {
			(Norm::Instance, Some(trace)) => trace,
			_ => return grad_output.clone(),
		};
		let mut grad_input = grad_output.clone();
		for (n, mut sample) in grad_input.outer_iter_mut().enumerate() {
			for (c, mut plane) in sample.outer_iter_mut().enumerate() {
				let xhat = trace.normalized.index_axis(Axis(0), n);
				let xhat = xhat.index_axis(Axis(0), c);
				let count = plane.len() as f32;
				let sum_g = plane.sum();
				let sum_gx = (&plane * &xhat).sum();
				let inv = trace.inv_std[[n, c]];
				plane.zip_mut_with(&xhat, |g, &x| {
					*g = inv / count * (count * *g - sum_g - x * sum_gx);
				});
			}
		}
		grad_input
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_instance_norm_standardises_each_plane() {
		let input = Array4::from_shape_fn((2, 3, 4, 4), |(n, c, h, w)| (n * 7 + c * 3 + h * w) as f32);
		let (output, trace) = Norm::Instance.forward(&input);
		assert!(trace.is_some());
		for sample in output.outer_iter() {
			for plane in sample.outer_iter() {
				let mean = plane.sum() / plane.len() as f32;
				let var = plane.iter().map(|v| v * v).sum::<f32>() / plane.len() as f32;
				assert!(mean.abs() < 1e-4);
				assert!((var - 1.0).abs() < 1e-3);
			}
		}
	}

	#[test]
	fn test_constant_gradient_vanishes_through_instance_norm() {
		let input = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, h, w)| (h * 3 + w) as f32);
		let (_, trace) = Norm::Instance.forward(&input);
		let grad = Norm::Instance.backward(trace.as_ref(), &Array4::ones((1, 1, 3, 3)));
		assert!(grad.iter().all(|g| g.abs() < 1e-5));
	}

	#[test]
	fn test_no_norm_passes_through() {
		let input = Array4::from_elem((1, 2, 2, 2), 3.0);
		let (output, trace) = Norm::None.forward(&input);
		assert_eq!(output, input);
		assert!(trace.is_none());
	}
}
