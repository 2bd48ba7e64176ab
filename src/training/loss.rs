use ndarray::{Array4, Zip};

use crate::error::{FsrcnnError, Result};

/// Mean squared error over every element of a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl MseLoss {
	/// Returns the loss and its gradient with respect to `prediction`.
	pub fn forward_backward(&self, prediction: &Array4<f32>, target: &Array4<f32>) -> Result<(f32, Array4<f32>)> {
		let loss = self.forward(prediction, target)?;
		let scale = 2.0 / prediction.len() as f32;
		let grad = Zip::from(prediction).and(target).map_collect(|&p, &t| scale * (p - t));
		Ok((loss, grad))
	}

	pub fn forward(&self, prediction: &Array4<f32>, target: &Array4<f32>) -> Result<f32> {
		if prediction.dim() != target.dim() {
			return Err(FsrcnnError::Shape(format!(
				"reconstruction {:?} and target {:?} differ in shape",
				prediction.dim(),
				target.dim()
			)));
		}
		if prediction.is_empty() {
			return Err(FsrcnnError::Shape("loss of an empty batch".into()));
		}
		let mut total = 0.0f64;
		Zip::from(prediction).and(target).for_each(|&p, &t| {
			let diff = (p - t) as f64;
			total += diff * diff;
		});
		Ok((total / prediction.len() as f64) as f32)
	}
}
