use ndarray::{s, Array3, Array4, ArrayView3, Axis};
use rand::Rng;
use tracing::debug;

use super::data_loader::Batch;
use super::loss::MseLoss;
use super::optimizer::Sgd;
use crate::config::Config;
use crate::constants::{network as network_constants, training as training_constants};
use crate::device::Device;
use crate::error::{FsrcnnError, Result};
use crate::network::{Gradients, Network};
use crate::psnr::psnr;
use crate::utils::image::{resize_tensor, shave};

/// The four images compared for one sample, all border-trimmed.
#[derive(Debug, Clone)]
pub struct Evaluation {
	pub ground_truth: Array3<f32>,
	pub low_res: Array3<f32>,
	pub bicubic: Array3<f32>,
	pub reconstruction: Array3<f32>,
	pub bicubic_psnr: f32,
	pub recon_psnr: f32,
}

impl Evaluation {
	/// Compare a reconstruction and the bicubic baseline against the target.
	/// High-resolution images lose a `2 × scale` border, the low-resolution
	/// input a fixed 2 pixel border.
	pub fn new(input: ArrayView3<f32>, target: ArrayView3<f32>, reconstruction: ArrayView3<f32>, scale: usize) -> Result<Self> {
		let border = 2 * scale;
		let (_, height, width) = input.dim();
		let bicubic = resize_tensor(input, height * scale, width * scale)?;

		let ground_truth = shave(target, border)?.to_owned();
		let low_res = shave(input, training_constants::LR_BORDER)?.to_owned();
		let bicubic = shave(bicubic.view(), border)?.to_owned();
		let reconstruction = shave(reconstruction, border)?.to_owned();

		let bicubic_psnr = psnr(bicubic.view().into_dyn(), ground_truth.view().into_dyn())?;
		let recon_psnr = psnr(reconstruction.view().into_dyn(), ground_truth.view().into_dyn())?;
		Ok(Evaluation {
			ground_truth,
			low_res,
			bicubic,
			reconstruction,
			bicubic_psnr,
			recon_psnr,
		})
	}
}

/// Everything one mode needs to run the network: the network itself, its
/// optimizer, loss, gradient buffers and device.
pub struct Session {
	network: Network,
	optimizer: Sgd,
	loss: MseLoss,
	grads: Gradients,
	device: Device,
}

impl Session {
	/// Build and initialise a fresh network for `config` on the configured device.
	pub fn new<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self> {
		let device = Device::select(config.run.gpu_mode)?;
		let mut network = Network::new(&config.network)?;
		network.weight_init(
			network_constants::WEIGHT_INIT_MEAN,
			network_constants::WEIGHT_INIT_STD,
			rng,
		)?;
		let optimizer = Sgd::new(config.training.learning_rate, training_constants::MOMENTUM)?;
		let grads = Gradients::zeros_like(&network);
		debug!(device = %device, parameters = network.num_parameters(), "Session ready");
		Ok(Session {
			network,
			optimizer,
			loss: MseLoss,
			grads,
			device,
		})
	}

	pub fn network(&self) -> &Network {
		&self.network
	}

	pub fn network_mut(&mut self) -> &mut Network {
		&mut self.network
	}

	pub fn device(&self) -> Device {
		self.device
	}

	pub fn optimizer(&self) -> &Sgd {
		&self.optimizer
	}

	fn border(&self) -> usize {
		self.network.config().border()
	}

	/// One optimisation step on `batch`; returns the batch loss.
	///
	/// The target and the reconstruction are both trimmed by the comparison
	/// border before the loss, so border pixels receive no gradient.
	pub fn train_step(&mut self, batch: &Batch) -> Result<f32> {
		let border = self.border();
		let input = self.device.place(batch.input.clone())?;
		let target = self.device.place(shave(batch.target.view(), border)?.to_owned())?;

		let (output, trace) = self.network.forward_with_trace(&input)?;
		if output.dim() != batch.target.dim() {
			return Err(FsrcnnError::Shape(format!(
				"reconstruction {:?} does not match target {:?}",
				output.dim(),
				batch.target.dim()
			)));
		}
		let trimmed = shave(output.view(), border)?.to_owned();
		let (loss, trimmed_grad) = self.loss.forward_backward(&trimmed, &target)?;

		let (_, _, height, width) = output.dim();
		let mut grad_output = Array4::zeros(output.raw_dim());
		grad_output
			.slice_mut(s![.., .., border..height - border, border..width - border])
			.assign(&trimmed_grad);

		self.grads.zero();
		self.network.backward(&trace, &grad_output, &mut self.grads)?;
		self.optimizer.step(&mut self.network, &self.grads)?;
		Ok(loss)
	}

	/// Forward pass with no gradient bookkeeping.
	pub fn reconstruct(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		let input = self.device.place(input.clone())?;
		self.network.forward(&input)
	}

	/// Reconstruct every image of `batch` and score it against its target.
	pub fn evaluate(&self, batch: &Batch) -> Result<Vec<Evaluation>> {
		let scale = self.network.config().scale_factor;
		let reconstructions = self.reconstruct(&batch.input)?;
		(0..batch.len())
			.map(|i| {
				Evaluation::new(
					batch.input(i),
					batch.target(i),
					reconstructions.index_axis(Axis(0), i),
					scale,
				)
			})
			.collect()
	}
}
