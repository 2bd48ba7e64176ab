use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis};

use crate::error::{FsrcnnError, Result};

/// Gradients produced by one convolution backward pass.
#[derive(Debug, Clone)]
pub struct ConvGradients {
	pub input: Array4<f32>,
	pub weight: Array4<f32>,
	pub bias: Array1<f32>,
}

/// Standard convolution output size, `floor((size + 2*pad - kernel) / stride) + 1`.
pub fn conv_output_size(size: usize, kernel: usize, stride: usize, padding: usize) -> Result<usize> {
	let padded = size + 2 * padding;
	if stride == 0 || padded < kernel {
		return Err(FsrcnnError::Shape(format!(
			"convolution with kernel {} stride {} padding {} cannot be applied to size {}",
			kernel, stride, padding, size
		)));
	}
	Ok((padded - kernel) / stride + 1)
}

/// Transposed convolution output size, `(size - 1)*stride - 2*pad + kernel + output_padding`.
pub fn deconv_output_size(
	size: usize,
	kernel: usize,
	stride: usize,
	padding: usize,
	output_padding: usize,
) -> Result<usize> {
	if size == 0 || stride == 0 || output_padding >= stride {
		return Err(FsrcnnError::Shape(format!(
			"transposed convolution with stride {} output padding {} cannot be applied to size {}",
			stride, output_padding, size
		)));
	}
	let full = (size - 1) * stride + kernel + output_padding;
	if full < 2 * padding {
		return Err(FsrcnnError::Shape(format!(
			"transposed convolution padding {} exceeds output extent {}",
			padding, full
		)));
	}
	Ok(full - 2 * padding)
}

/// Unfold a `[C, H, W]` image into `[C*k*k, out_h*out_w]` columns, one column per
/// output position.
fn im2col(
	image: ArrayView3<f32>,
	kernel: usize,
	stride: usize,
	padding: usize,
	out_h: usize,
	out_w: usize,
) -> Array2<f32> {
	let (channels, height, width) = image.dim();
	let mut cols = Array2::zeros((channels * kernel * kernel, out_h * out_w));
	for c in 0..channels {
		for kh in 0..kernel {
			for kw in 0..kernel {
				let row = (c * kernel + kh) * kernel + kw;
				for oh in 0..out_h {
					let ih = (oh * stride + kh) as isize - padding as isize;
					if ih < 0 || ih >= height as isize {
						continue;
					}
					for ow in 0..out_w {
						let iw = (ow * stride + kw) as isize - padding as isize;
						if iw < 0 || iw >= width as isize {
							continue;
						}
						cols[[row, oh * out_w + ow]] = image[[c, ih as usize, iw as usize]];
					}
				}
			}
		}
	}
	cols
}

/// Inverse of `im2col`: scatter columns back into a `[C, H, W]` image, summing
/// the contributions of overlapping windows.
#[allow(clippy::too_many_arguments)]
fn col2im(
	cols: ArrayView2<f32>,
	channels: usize,
	height: usize,
	width: usize,
	kernel: usize,
	stride: usize,
	padding: usize,
	out_h: usize,
	out_w: usize,
) -> Array3<f32> {
	let mut image = Array3::zeros((channels, height, width));
	for c in 0..channels {
		for kh in 0..kernel {
			for kw in 0..kernel {
				let row = (c * kernel + kh) * kernel + kw;
				for oh in 0..out_h {
					let ih = (oh * stride + kh) as isize - padding as isize;
					if ih < 0 || ih >= height as isize {
						continue;
					}
					for ow in 0..out_w {
						let iw = (ow * stride + kw) as isize - padding as isize;
						if iw < 0 || iw >= width as isize {
							continue;
						}
						image[[c, ih as usize, iw as usize]] += cols[[row, oh * out_w + ow]];
					}
				}
			}
		}
	}
	image
}

fn add_channel_bias(output: &mut Array4<f32>, bias: &Array1<f32>) {
	for mut sample in output.outer_iter_mut() {
		for (mut channel, &b) in sample.outer_iter_mut().zip(bias.iter()) {
			channel.mapv_inplace(|v| v + b);
		}
	}
}

fn channel_sums(grad: &Array4<f32>) -> Array1<f32> {
	grad.sum_axis(Axis(3)).sum_axis(Axis(2)).sum_axis(Axis(0))
}

/// 2D convolution with weight layout `[out, in, k, k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2d {
	pub weight: Array4<f32>,
	pub bias: Array1<f32>,
	stride: usize,
	padding: usize,
}

impl Conv2d {
	pub fn new(in_channels: usize, out_channels: usize, kernel: usize, stride: usize, padding: usize) -> Self {
		Conv2d {
			weight: Array4::zeros((out_channels, in_channels, kernel, kernel)),
			bias: Array1::zeros(out_channels),
			stride,
			padding,
		}
	}

	pub fn in_channels(&self) -> usize {
		self.weight.dim().1
	}

	pub fn out_channels(&self) -> usize {
		self.weight.dim().0
	}

	pub fn kernel(&self) -> usize {
		self.weight.dim().2
	}

	pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
		Ok((
			conv_output_size(height, self.kernel(), self.stride, self.padding)?,
			conv_output_size(width, self.kernel(), self.stride, self.padding)?,
		))
	}

	fn check_input(&self, channels: usize) -> Result<()> {
		if channels != self.in_channels() {
			return Err(FsrcnnError::Shape(format!(
				"convolution expects {} input channels but got {}",
				self.in_channels(),
				channels
			)));
		}
		Ok(())
	}

	pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		let (batch, channels, height, width) = input.dim();
		self.check_input(channels)?;
		let (out_h, out_w) = self.output_size(height, width)?;
		let (out_c, k) = (self.out_channels(), self.kernel());
		let weight = self.weight.view().into_shape((out_c, channels * k * k))?;

		let mut output = Array4::zeros((batch, out_c, out_h, out_w));
		for (i, sample) in input.outer_iter().enumerate() {
			let cols = im2col(sample, k, self.stride, self.padding, out_h, out_w);
			let result = weight.dot(&cols).into_shape((out_c, out_h, out_w))?;
			output.index_axis_mut(Axis(0), i).assign(&result);
		}
		add_channel_bias(&mut output, &self.bias);
		Ok(output)
	}

	pub fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<ConvGradients> {
		let (batch, channels, height, width) = input.dim();
		self.check_input(channels)?;
		let (out_h, out_w) = self.output_size(height, width)?;
		let (out_c, k) = (self.out_channels(), self.kernel());
		if grad_output.dim() != (batch, out_c, out_h, out_w) {
			return Err(FsrcnnError::Shape(format!(
				"convolution output gradient has shape {:?}, expected {:?}",
				grad_output.dim(),
				(batch, out_c, out_h, out_w)
			)));
		}
		let weight = self.weight.view().into_shape((out_c, channels * k * k))?;

		let mut grad_weight = Array2::<f32>::zeros((out_c, channels * k * k));
		let mut grad_input = Array4::zeros((batch, channels, height, width));
		for i in 0..batch {
			let cols = im2col(input.index_axis(Axis(0), i), k, self.stride, self.padding, out_h, out_w);
			let grad = grad_output
				.index_axis(Axis(0), i)
				.to_owned()
				.into_shape((out_c, out_h * out_w))?;
			grad_weight += &grad.dot(&cols.t());
			let grad_cols = weight.t().dot(&grad);
			let grad_image = col2im(
				grad_cols.view(),
				channels,
				height,
				width,
				k,
				self.stride,
				self.padding,
				out_h,
				out_w,
			);
			grad_input.index_axis_mut(Axis(0), i).assign(&grad_image);
		}

		Ok(ConvGradients {
			input: grad_input,
			weight: grad_weight.into_shape((out_c, channels, k, k))?,
			bias: channel_sums(grad_output),
		})
	}
}

/// Transposed convolution ("deconvolution") with weight layout `[in, out, k, k]`.
///
/// The forward pass is the input-gradient of a [`Conv2d`] with the same kernel,
/// stride and padding, so both directions reuse `im2col`/`col2im`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvTranspose2d {
	pub weight: Array4<f32>,
	pub bias: Array1<f32>,
	stride: usize,
	padding: usize,
	output_padding: usize,
}

impl ConvTranspose2d {
	pub fn new(
		in_channels: usize,
		out_channels: usize,
		kernel: usize,
		stride: usize,
		padding: usize,
		output_padding: usize,
	) -> Self {
		ConvTranspose2d {
			weight: Array4::zeros((in_channels, out_channels, kernel, kernel)),
			bias: Array1::zeros(out_channels),
			stride,
			padding,
			output_padding,
		}
	}

	pub fn in_channels(&self) -> usize {
		self.weight.dim().0
	}

	pub fn out_channels(&self) -> usize {
		self.weight.dim().1
	}

	pub fn kernel(&self) -> usize {
		self.weight.dim().2
	}

	pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
		let k = self.kernel();
		Ok((
			deconv_output_size(height, k, self.stride, self.padding, self.output_padding)?,
			deconv_output_size(width, k, self.stride, self.padding, self.output_padding)?,
		))
	}

	fn check_input(&self, channels: usize) -> Result<()> {
		if channels != self.in_channels() {
			return Err(FsrcnnError::Shape(format!(
				"transposed convolution expects {} input channels but got {}",
				self.in_channels(),
				channels
			)));
		}
		Ok(())
	}

	pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		let (batch, channels, height, width) = input.dim();
		self.check_input(channels)?;
		let (out_h, out_w) = self.output_size(height, width)?;
		let (out_c, k) = (self.out_channels(), self.kernel());
		let weight = self.weight.view().into_shape((channels, out_c * k * k))?;

		let mut output = Array4::zeros((batch, out_c, out_h, out_w));
		for (i, sample) in input.outer_iter().enumerate() {
			let flat = sample.to_owned().into_shape((channels, height * width))?;
			let cols = weight.t().dot(&flat);
			let image = col2im(
				cols.view(),
				out_c,
				out_h,
				out_w,
				k,
				self.stride,
				self.padding,
				height,
				width,
			);
			output.index_axis_mut(Axis(0), i).assign(&image);
		}
		add_channel_bias(&mut output, &self.bias);
		Ok(output)
	}

	pub fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> Result<ConvGradients> {
		let (batch, channels, height, width) = input.dim();
		self.check_input(channels)?;
		let (out_h, out_w) = self.output_size(height, width)?;
		let (out_c, k) = (self.out_channels(), self.kernel());
		if grad_output.dim() != (batch, out_c, out_h, out_w) {
			return Err(FsrcnnError::Shape(format!(
				"transposed convolution output gradient has shape {:?}, expected {:?}",
				grad_output.dim(),
				(batch, out_c, out_h, out_w)
			)));
		}
		let weight = self.weight.view().into_shape((channels, out_c * k * k))?;

		let mut grad_weight = Array2::<f32>::zeros((channels, out_c * k * k));
		let mut grad_input = Array4::zeros((batch, channels, height, width));
		for i in 0..batch {
			let grad_cols = im2col(
				grad_output.index_axis(Axis(0), i),
				k,
				self.stride,
				self.padding,
				height,
				width,
			);
			let flat = input
				.index_axis(Axis(0), i)
				.to_owned()
				.into_shape((channels, height * width))?;
			grad_weight += &flat.dot(&grad_cols.t());
			let grad = weight.dot(&grad_cols).into_shape((channels, height, width))?;
			grad_input.index_axis_mut(Axis(0), i).assign(&grad);
		}

		Ok(ConvGradients {
			input: grad_input,
			weight: grad_weight.into_shape((channels, out_c, k, k))?,
			bias: channel_sums(grad_output),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ramp(shape: (usize, usize, usize, usize)) -> Array4<f32> {
		let len = shape.0 * shape.1 * shape.2 * shape.3;
		Array4::from_shape_vec(shape, (0..len).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect()).unwrap()
	}

	#[test]
	fn test_conv_output_size_formula() {
		assert_eq!(conv_output_size(32, 5, 1, 0).unwrap(), 28);
		assert_eq!(conv_output_size(32, 3, 1, 1).unwrap(), 32);
		assert_eq!(conv_output_size(7, 3, 2, 1).unwrap(), 4);
		assert!(conv_output_size(2, 5, 1, 0).is_err());
	}

	#[test]
	fn test_deconv_output_size_formula() {
		assert_eq!(deconv_output_size(10, 9, 4, 3, 1).unwrap(), 40);
		assert_eq!(deconv_output_size(16, 9, 3, 4, 2).unwrap(), 48);
		assert!(deconv_output_size(4, 9, 2, 3, 2).is_err());
	}

	#[test]
	fn test_identity_kernel_copies_input() {
		let mut conv = Conv2d::new(1, 1, 3, 1, 1);
		conv.weight[[0, 0, 1, 1]] = 1.0;
		conv.bias[0] = 0.5;
		let input = ramp((2, 1, 5, 6));
		let output = conv.forward(&input).unwrap();
		assert_eq!(output.dim(), (2, 1, 5, 6));
		for (o, i) in output.iter().zip(input.iter()) {
			assert!((o - (i + 0.5)).abs() < 1e-6);
		}
	}

	#[test]
	fn test_conv_rejects_channel_mismatch() {
		let conv = Conv2d::new(3, 4, 3, 1, 1);
		assert!(conv.forward(&Array4::zeros((1, 1, 8, 8))).is_err());
	}

	#[test]
	fn test_conv_gradients_match_finite_differences() {
		let mut conv = Conv2d::new(2, 3, 3, 1, 1);
		conv.weight = ramp((3, 2, 3, 3));
		let input = ramp((1, 2, 4, 4)).mapv(|v| v * 1.7 + 0.05);
		let grads = conv.backward(&input, &Array4::ones((1, 3, 4, 4))).unwrap();

		let eps = 1e-2;
		let loss = |conv: &Conv2d, input: &Array4<f32>| conv.forward(input).unwrap().sum();
		for &(o, c, h, w) in &[(0, 0, 0, 0), (2, 1, 1, 2), (1, 1, 2, 2)] {
			let mut plus = conv.clone();
			plus.weight[[o, c, h, w]] += eps;
			let mut minus = conv.clone();
			minus.weight[[o, c, h, w]] -= eps;
			let numeric = (loss(&plus, &input) - loss(&minus, &input)) / (2.0 * eps);
			assert!((numeric - grads.weight[[o, c, h, w]]).abs() < 1e-2);
		}
		for &(c, h, w) in &[(0, 0, 0), (1, 2, 3), (0, 3, 1)] {
			let mut plus = input.clone();
			plus[[0, c, h, w]] += eps;
			let mut minus = input.clone();
			minus[[0, c, h, w]] -= eps;
			let numeric = (loss(&conv, &plus) - loss(&conv, &minus)) / (2.0 * eps);
			assert!((numeric - grads.input[[0, c, h, w]]).abs() < 1e-2);
		}
		assert!((grads.bias[0] - 16.0).abs() < 1e-5);
	}

	#[test]
	fn test_deconv_single_pixel_spreads_kernel() {
		let mut deconv = ConvTranspose2d::new(1, 1, 3, 2, 0, 0);
		deconv.weight = ramp((1, 1, 3, 3));
		let mut input = Array4::zeros((1, 1, 1, 1));
		input[[0, 0, 0, 0]] = 2.0;
		let output = deconv.forward(&input).unwrap();
		assert_eq!(output.dim(), (1, 1, 3, 3));
		for (o, w) in output.iter().zip(deconv.weight.iter()) {
			assert!((o - 2.0 * w).abs() < 1e-6);
		}
	}

	#[test]
	fn test_deconv_gradients_match_finite_differences() {
		let mut deconv = ConvTranspose2d::new(2, 1, 5, 2, 2, 1);
		deconv.weight = ramp((2, 1, 5, 5));
		let input = ramp((1, 2, 3, 3)).mapv(|v| v + 0.3);
		let (out_h, out_w) = deconv.output_size(3, 3).unwrap();
		assert_eq!((out_h, out_w), (6, 6));
		let weights = ramp((1, 1, out_h, out_w));
		let grads = deconv.backward(&input, &weights).unwrap();

		let eps = 1e-2;
		let loss = |d: &ConvTranspose2d, x: &Array4<f32>| (d.forward(x).unwrap() * &weights).sum();
		for &(i, o, h, w) in &[(0, 0, 0, 0), (1, 0, 2, 3), (1, 0, 4, 4)] {
			let mut plus = deconv.clone();
			plus.weight[[i, o, h, w]] += eps;
			let mut minus = deconv.clone();
			minus.weight[[i, o, h, w]] -= eps;
			let numeric = (loss(&plus, &input) - loss(&minus, &input)) / (2.0 * eps);
			assert!((numeric - grads.weight[[i, o, h, w]]).abs() < 1e-2);
		}
		for &(c, h, w) in &[(0, 0, 0), (1, 1, 2), (0, 2, 2)] {
			let mut plus = input.clone();
			plus[[0, c, h, w]] += eps;
			let mut minus = input.clone();
			minus[[0, c, h, w]] -= eps;
			let numeric = (loss(&deconv, &plus) - loss(&deconv, &minus)) / (2.0 * eps);
			assert!((numeric - grads.input[[0, c, h, w]]).abs() < 1e-2);
		}
	}
}
