use ndarray::{Array1, Array4, ArrayViewD, ArrayViewMutD};

use super::activation::{Activation, ActivationKind};
use super::conv::{Conv2d, ConvGradients, ConvTranspose2d};
use super::norm::{Norm, NormTrace};
use super::Gradients;
use crate::error::Result;

/// The convolution at the head of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvOp {
	Conv(Conv2d),
	Transposed(ConvTranspose2d),
}

impl ConvOp {
	fn name(&self) -> &'static str {
		match self {
			ConvOp::Conv(_) => "conv",
			ConvOp::Transposed(_) => "deconv",
		}
	}

	fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		match self {
			ConvOp::Conv(conv) => conv.forward(input),
			ConvOp::Transposed(deconv) => deconv.forward(input),
		}
	}

	fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<ConvGradients> {
		match self {
			ConvOp::Conv(conv) => conv.backward(input, grad_output),
			ConvOp::Transposed(deconv) => deconv.backward(input, grad_output),
		}
	}

	pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
		match self {
			ConvOp::Conv(conv) => conv.output_size(height, width),
			ConvOp::Transposed(deconv) => deconv.output_size(height, width),
		}
	}

	fn parameters_mut(&mut self) -> (&mut Array4<f32>, &mut Array1<f32>) {
		match self {
			ConvOp::Conv(conv) => (&mut conv.weight, &mut conv.bias),
			ConvOp::Transposed(deconv) => (&mut deconv.weight, &mut deconv.bias),
		}
	}

	fn parameters(&self) -> (&Array4<f32>, &Array1<f32>) {
		match self {
			ConvOp::Conv(conv) => (&conv.weight, &conv.bias),
			ConvOp::Transposed(deconv) => (&deconv.weight, &deconv.bias),
		}
	}
}

/// Intermediate values of one block's forward pass.
#[derive(Debug, Clone)]
pub struct BlockTrace {
	input: Array4<f32>,
	conv_out: Array4<f32>,
	norm: Option<(Array4<f32>, Option<NormTrace>)>,
}

/// A convolution optionally followed by a normalization and a nonlinearity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvBlock {
	op: ConvOp,
	norm: Norm,
	activation: Activation,
}

impl ConvBlock {
	#[allow(clippy::too_many_arguments)]
	pub fn conv(
		in_channels: usize,
		out_channels: usize,
		kernel: usize,
		stride: usize,
		padding: usize,
		activation: ActivationKind,
		norm: Norm,
	) -> Self {
		ConvBlock {
			op: ConvOp::Conv(Conv2d::new(in_channels, out_channels, kernel, stride, padding)),
			norm,
			activation: activation.build(),
		}
	}

	#[allow(clippy::too_many_arguments)]
	pub fn deconv(
		in_channels: usize,
		out_channels: usize,
		kernel: usize,
		stride: usize,
		padding: usize,
		output_padding: usize,
		activation: ActivationKind,
		norm: Norm,
	) -> Self {
		ConvBlock {
			op: ConvOp::Transposed(ConvTranspose2d::new(
				in_channels,
				out_channels,
				kernel,
				stride,
				padding,
				output_padding,
			)),
			norm,
			activation: activation.build(),
		}
	}

	pub fn op(&self) -> &ConvOp {
		&self.op
	}

	pub fn op_mut(&mut self) -> &mut ConvOp {
		&mut self.op
	}

	pub fn norm(&self) -> Norm {
		self.norm
	}

	pub fn activation(&self) -> &Activation {
		&self.activation
	}

	pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
		self.op.output_size(height, width)
	}

	/// Forward pass without keeping anything for a backward pass.
	pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		let out = self.op.forward(input)?;
		let (out, _) = self.norm.forward(&out);
		Ok(self.activation.forward(&out))
	}

	pub fn forward_with_trace(&self, input: &Array4<f32>) -> Result<(Array4<f32>, BlockTrace)> {
		let conv_out = self.op.forward(input)?;
		let norm = if self.norm.is_none() {
			None
		} else {
			Some(self.norm.forward(&conv_out))
		};
		let pre_activation = norm.as_ref().map(|(out, _)| out).unwrap_or(&conv_out);
		let output = self.activation.forward(pre_activation);
		let trace = BlockTrace {
			input: input.clone(),
			conv_out,
			norm,
		};
		Ok((output, trace))
	}

	/// Accumulates parameter gradients under `prefix` and returns the input gradient.
	pub fn backward(
		&self,
		prefix: &str,
		trace: &BlockTrace,
		grad_output: &Array4<f32>,
		grads: &mut Gradients,
	) -> Result<Array4<f32>> {
		let pre_activation = trace.norm.as_ref().map(|(out, _)| out).unwrap_or(&trace.conv_out);
		let (grad, slope_grad) = self.activation.backward(pre_activation, grad_output);
		if let Some(slope_grad) = slope_grad {
			grads.accumulate(&format!("{}.act.weight", prefix), slope_grad.into_dyn())?;
		}
		let grad = match &trace.norm {
			Some((_, norm_trace)) => self.norm.backward(norm_trace.as_ref(), &grad),
			None => grad,
		};
		let conv_grads = self.op.backward(&trace.input, &grad)?;
		let name = self.op.name();
		grads.accumulate(&format!("{}.{}.weight", prefix, name), conv_grads.weight.into_dyn())?;
		grads.accumulate(&format!("{}.{}.bias", prefix, name), conv_grads.bias.into_dyn())?;
		Ok(conv_grads.input)
	}

	pub fn visit_parameters(&self, prefix: &str, f: &mut dyn FnMut(String, ArrayViewD<f32>)) {
		let name = self.op.name();
		let (weight, bias) = self.op.parameters();
		f(format!("{}.{}.weight", prefix, name), weight.view().into_dyn());
		f(format!("{}.{}.bias", prefix, name), bias.view().into_dyn());
		if let Some(slope) = self.activation.weight() {
			f(format!("{}.act.weight", prefix), slope.view().into_dyn());
		}
	}

	pub fn visit_parameters_mut(&mut self, prefix: &str, f: &mut dyn FnMut(String, ArrayViewMutD<f32>)) {
		let name = self.op.name();
		{
			let (weight, bias) = self.op.parameters_mut();
			f(format!("{}.{}.weight", prefix, name), weight.view_mut().into_dyn());
			f(format!("{}.{}.bias", prefix, name), bias.view_mut().into_dyn());
		}
		if let Some(slope) = self.activation.weight_mut() {
			f(format!("{}.act.weight", prefix), slope.view_mut().into_dyn());
		}
	}
}
