//! The FSRCNN network: feature extraction, a shrink/map/expand stack and a
//! learned deconvolution, with hand-written forward and backward passes.

pub mod activation;
pub mod block;
pub mod conv;
pub mod norm;

use std::fmt;

use indexmap::IndexMap;
use ndarray::{Array4, ArrayD};
use rand::Rng;
use rand_distr::{Distribution, Normal};

pub use self::activation::{Activation, ActivationKind};
pub use self::block::{BlockTrace, ConvBlock, ConvOp};
pub use self::norm::Norm;

use crate::config::NetworkConfig;
use crate::constants::network as constants;
use crate::error::{FsrcnnError, Result};

/// Ordered mapping from parameter name to its values.
pub type ParameterSet = IndexMap<String, ArrayD<f32>>;

/// Gradient buffers keyed like the network's [`ParameterSet`].
#[derive(Debug, Clone)]
pub struct Gradients {
	buffers: ParameterSet,
}

impl Gradients {
	pub fn zeros_like(network: &Network) -> Self {
		let buffers = network
			.parameters()
			.into_iter()
			.map(|(name, param)| (name, ArrayD::zeros(param.raw_dim())))
			.collect();
		Gradients { buffers }
	}

	pub fn zero(&mut self) {
		for buffer in self.buffers.values_mut() {
			buffer.fill(0.0);
		}
	}

	pub fn accumulate(&mut self, name: &str, grad: ArrayD<f32>) -> Result<()> {
		let buffer = self
			.buffers
			.get_mut(name)
			.ok_or_else(|| FsrcnnError::Shape(format!("no gradient buffer named {}", name)))?;
		if buffer.shape() != grad.shape() {
			return Err(FsrcnnError::Shape(format!(
				"gradient for {} has shape {:?}, expected {:?}",
				name,
				grad.shape(),
				buffer.shape()
			)));
		}
		*buffer += &grad;
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
		self.buffers.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &ArrayD<f32>)> {
		self.buffers.iter()
	}
}

/// One entry of the mapping stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
	Block(ConvBlock),
	Activation(Activation),
}

#[derive(Debug, Clone)]
enum LayerTrace {
	Block(BlockTrace),
	Activation(Array4<f32>),
}

/// Everything [`Network::backward`] needs from a training forward pass.
#[derive(Debug, Clone)]
pub struct NetworkTrace {
	first: BlockTrace,
	mid: Vec<LayerTrace>,
	last: BlockTrace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
	config: NetworkConfig,
	first_part: ConvBlock,
	mid_part: Vec<Layer>,
	last_part: ConvBlock,
}

impl Network {
	pub fn new(config: &NetworkConfig) -> Result<Self> {
		config.validate()?;
		let NetworkConfig {
			num_channels,
			scale_factor,
			d,
			s,
			m,
		} = *config;

		let first_part = ConvBlock::conv(
			num_channels,
			d,
			constants::FEATURE_KERNEL,
			1,
			constants::FEATURE_KERNEL / 2,
			ActivationKind::PRelu,
			Norm::None,
		);

		let mut mid_part = Vec::with_capacity(m + 3);
		// Shrinking
		mid_part.push(Layer::Block(ConvBlock::conv(d, s, 1, 1, 0, ActivationKind::PRelu, Norm::None)));
		// Non-linear mapping, one activation shared by the whole stack
		for _ in 0..m {
			mid_part.push(Layer::Block(ConvBlock::conv(
				s,
				s,
				constants::MAPPING_KERNEL,
				1,
				constants::MAPPING_KERNEL / 2,
				ActivationKind::None,
				Norm::None,
			)));
		}
		mid_part.push(Layer::Activation(Activation::prelu()));
		// Expanding
		mid_part.push(Layer::Block(ConvBlock::conv(s, d, 1, 1, 0, ActivationKind::PRelu, Norm::None)));

		let last_part = ConvBlock::deconv(
			d,
			num_channels,
			constants::DECONV_KERNEL,
			scale_factor,
			constants::DECONV_KERNEL / 2,
			scale_factor - 1,
			ActivationKind::None,
			Norm::None,
		);

		Ok(Network {
			config: config.clone(),
			first_part,
			mid_part,
			last_part,
		})
	}

	pub fn config(&self) -> &NetworkConfig {
		&self.config
	}

	pub fn layers(&self) -> &[Layer] {
		&self.mid_part
	}

	/// Draw convolution weights from `Normal(mean, std)` and deconvolution weights
	/// from `Normal(0, 1e-4)`; zero every bias. PReLU slopes are left untouched.
	pub fn weight_init<R: Rng + ?Sized>(&mut self, mean: f32, std: f32, rng: &mut R) -> Result<()> {
		let conv_dist = Normal::new(mean, std)
			.map_err(|e| FsrcnnError::InvalidParameter(format!("weight init std {}: {}", std, e)))?;
		let deconv_dist = Normal::new(0.0, constants::DECONV_INIT_STD)
			.map_err(|e| FsrcnnError::InvalidParameter(e.to_string()))?;

		let mut init = |block: &mut ConvBlock| match block.op_mut() {
			ConvOp::Conv(conv) => {
				conv.weight.mapv_inplace(|_| conv_dist.sample(&mut *rng));
				conv.bias.fill(0.0);
			},
			ConvOp::Transposed(deconv) => {
				deconv.weight.mapv_inplace(|_| deconv_dist.sample(&mut *rng));
				deconv.bias.fill(0.0);
			},
		};

		init(&mut self.first_part);
		for layer in &mut self.mid_part {
			if let Layer::Block(block) = layer {
				init(block);
			}
		}
		init(&mut self.last_part);
		Ok(())
	}

	pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
		let (mut h, mut w) = self.first_part.output_size(height, width)?;
		for layer in &self.mid_part {
			if let Layer::Block(block) = layer {
				let size = block.output_size(h, w)?;
				h = size.0;
				w = size.1;
			}
		}
		self.last_part.output_size(h, w)
	}

	/// Reconstruct without recording anything for backpropagation.
	pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		self.check_input(input)?;
		let mut out = self.first_part.forward(input)?;
		for layer in &self.mid_part {
			out = match layer {
				Layer::Block(block) => block.forward(&out)?,
				Layer::Activation(activation) => activation.forward(&out),
			};
		}
		self.last_part.forward(&out)
	}

	pub fn forward_with_trace(&self, input: &Array4<f32>) -> Result<(Array4<f32>, NetworkTrace)> {
		self.check_input(input)?;
		let (mut out, first) = self.first_part.forward_with_trace(input)?;
		let mut mid = Vec::with_capacity(self.mid_part.len());
		for layer in &self.mid_part {
			out = match layer {
				Layer::Block(block) => {
					let (next, trace) = block.forward_with_trace(&out)?;
					mid.push(LayerTrace::Block(trace));
					next
				},
				Layer::Activation(activation) => {
					let next = activation.forward(&out);
					mid.push(LayerTrace::Activation(out));
					next
				},
			};
		}
		let (out, last) = self.last_part.forward_with_trace(&out)?;
		Ok((out, NetworkTrace { first, mid, last }))
	}

	/// Backpropagate `grad_output`, adding parameter gradients into `grads`.
	pub fn backward(&self, trace: &NetworkTrace, grad_output: &Array4<f32>, grads: &mut Gradients) -> Result<Array4<f32>> {
		let mut grad = self.last_part.backward("last_part", &trace.last, grad_output, grads)?;
		for (i, (layer, layer_trace)) in self.mid_part.iter().zip(trace.mid.iter()).enumerate().rev() {
			grad = match (layer, layer_trace) {
				(Layer::Block(block), LayerTrace::Block(block_trace)) => {
					block.backward(&format!("mid_part.{}", i), block_trace, &grad, grads)?
				},
				(Layer::Activation(activation), LayerTrace::Activation(input)) => {
					let (grad, slope_grad) = activation.backward(input, &grad);
					if let Some(slope_grad) = slope_grad {
						grads.accumulate(&format!("mid_part.{}.weight", i), slope_grad.into_dyn())?;
					}
					grad
				},
				_ => return Err(FsrcnnError::Shape(format!("trace does not match layer {}", i))),
			};
		}
		self.first_part.backward("first_part", &trace.first, &grad, grads)
	}

	fn check_input(&self, input: &Array4<f32>) -> Result<()> {
		let channels = input.dim().1;
		if channels != self.config.num_channels {
			return Err(FsrcnnError::Shape(format!(
				"network expects {} channels but input has {}",
				self.config.num_channels, channels
			)));
		}
		Ok(())
	}

	fn visit_parameters(&self, f: &mut dyn FnMut(String, ndarray::ArrayViewD<f32>)) {
		self.first_part.visit_parameters("first_part", f);
		for (i, layer) in self.mid_part.iter().enumerate() {
			match layer {
				Layer::Block(block) => block.visit_parameters(&format!("mid_part.{}", i), f),
				Layer::Activation(activation) => {
					if let Some(slope) = activation.weight() {
						f(format!("mid_part.{}.weight", i), slope.view().into_dyn());
					}
				},
			}
		}
		self.last_part.visit_parameters("last_part", f);
	}

	/// Visit every learnable tensor in a fixed order, mutably.
	pub fn visit_parameters_mut(&mut self, f: &mut dyn FnMut(String, ndarray::ArrayViewMutD<f32>)) {
		self.first_part.visit_parameters_mut("first_part", f);
		for (i, layer) in self.mid_part.iter_mut().enumerate() {
			match layer {
				Layer::Block(block) => block.visit_parameters_mut(&format!("mid_part.{}", i), f),
				Layer::Activation(activation) => {
					if let Some(slope) = activation.weight_mut() {
						f(format!("mid_part.{}.weight", i), slope.view_mut().into_dyn());
					}
				},
			}
		}
		self.last_part.visit_parameters_mut("last_part", f);
	}

	/// Snapshot of every parameter, in layer order.
	pub fn parameters(&self) -> ParameterSet {
		let mut params = ParameterSet::new();
		self.visit_parameters(&mut |name, param| {
			params.insert(name, param.to_owned());
		});
		params
	}

	/// Replace every parameter. The set must name exactly this network's
	/// parameters with matching shapes.
	pub fn load_parameters(&mut self, params: &ParameterSet) -> Result<()> {
		let mut error = None;
		let mut seen = 0;
		self.visit_parameters_mut(&mut |name, mut param| {
			if error.is_some() {
				return;
			}
			match params.get(&name) {
				Some(value) if value.shape() == param.shape() => {
					param.assign(value);
					seen += 1;
				},
				Some(value) => {
					error = Some(FsrcnnError::Shape(format!(
						"parameter {} has shape {:?}, network expects {:?}",
						name,
						value.shape(),
						param.shape()
					)))
				},
				None => error = Some(FsrcnnError::Shape(format!("parameter {} is missing", name))),
			}
		});
		if let Some(err) = error {
			return Err(err);
		}
		if seen != params.len() {
			return Err(FsrcnnError::Shape(format!(
				"parameter set has {} entries, network has {}",
				params.len(),
				seen
			)));
		}
		Ok(())
	}

	pub fn num_parameters(&self) -> usize {
		let mut count = 0;
		self.visit_parameters(&mut |_, param| count += param.len());
		count
	}
}

fn describe_block(f: &mut fmt::Formatter, name: &str, block: &ConvBlock) -> fmt::Result {
	match block.op() {
		ConvOp::Conv(conv) => write!(
			f,
			"  {}: Conv2d({} -> {}, kernel {})",
			name,
			conv.in_channels(),
			conv.out_channels(),
			conv.kernel()
		)?,
		ConvOp::Transposed(deconv) => write!(
			f,
			"  {}: ConvTranspose2d({} -> {}, kernel {})",
			name,
			deconv.in_channels(),
			deconv.out_channels(),
			deconv.kernel()
		)?,
	}
	if !block.norm().is_none() {
		write!(f, " + {:?}Norm", block.norm())?;
	}
	if !block.activation().is_identity() {
		write!(f, " + {:?}", ActivationName(block.activation()))?;
	}
	writeln!(f)
}

struct ActivationName<'a>(&'a Activation);

impl fmt::Debug for ActivationName<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let name = match self.0 {
			Activation::Identity => "Identity",
			Activation::Relu => "ReLU",
			Activation::PRelu { .. } => "PReLU",
			Activation::LeakyRelu { .. } => "LeakyReLU",
			Activation::Tanh => "Tanh",
			Activation::Sigmoid => "Sigmoid",
		};
		f.write_str(name)
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "FSRCNN (x{})", self.config.scale_factor)?;
		describe_block(f, "first_part", &self.first_part)?;
		for (i, layer) in self.mid_part.iter().enumerate() {
			match layer {
				Layer::Block(block) => describe_block(f, &format!("mid_part.{}", i), block)?,
				Layer::Activation(activation) => writeln!(f, "  mid_part.{}: {:?}", i, ActivationName(activation))?,
			}
		}
		describe_block(f, "last_part", &self.last_part)?;
		write!(f, "Total number of parameters: {}", self.num_parameters())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	fn small_config(scale_factor: usize) -> NetworkConfig {
		NetworkConfig::builder().scale_factor(scale_factor).d(8).s(4).m(2).build()
	}

	fn initialised(config: &NetworkConfig) -> Network {
		let mut network = Network::new(config).unwrap();
		network.weight_init(0.0, 0.02, &mut StdRng::seed_from_u64(7)).unwrap();
		network
	}

	#[test]
	fn test_output_is_input_times_scale() {
		for scale in 1..=4 {
			let network = initialised(&small_config(scale));
			let input = Array4::from_elem((2, 1, 9, 7), 0.5);
			let output = network.forward(&input).unwrap();
			assert_eq!(output.dim(), (2, 1, 9 * scale, 7 * scale));
			assert_eq!(network.output_size(9, 7).unwrap(), (9 * scale, 7 * scale));
		}
	}

	#[test]
	fn test_layer_layout() {
		let network = Network::new(&NetworkConfig::default()).unwrap();
		// shrink, m mapping convs, shared activation, expand
		assert_eq!(network.layers().len(), 4 + 3);
		let activations: Vec<bool> = network
			.layers()
			.iter()
			.map(|layer| match layer {
				Layer::Block(block) => !block.activation().is_identity(),
				Layer::Activation(_) => true,
			})
			.collect();
		assert_eq!(activations, vec![true, false, false, false, false, true, true]);
		assert!(matches!(network.layers()[5], Layer::Activation(Activation::PRelu { .. })));
	}

	#[test]
	fn test_weight_init_statistics() {
		let network = initialised(&NetworkConfig::default());
		let params = network.parameters();
		for (name, value) in &params {
			if name.ends_with("bias") {
				assert!(value.iter().all(|&v| v == 0.0), "{} not zeroed", name);
			} else if name.ends_with("act.weight") || name == "mid_part.5.weight" {
				assert_eq!(value.iter().cloned().collect::<Vec<_>>(), vec![0.25]);
			}
		}
		let deconv = &params["last_part.deconv.weight"];
		assert!(deconv.iter().all(|v| v.abs() < 0.001));
		let first = &params["first_part.conv.weight"];
		let std = (first.iter().map(|v| v * v).sum::<f32>() / first.len() as f32).sqrt();
		assert!(std > 0.01 && std < 0.03, "std {}", std);
	}

	#[test]
	fn test_parameter_round_trip_through_load() {
		let config = small_config(2);
		let source = initialised(&config);
		let mut target = Network::new(&config).unwrap();
		target.load_parameters(&source.parameters()).unwrap();
		assert_eq!(target.parameters(), source.parameters());
	}

	#[test]
	fn test_load_rejects_wrong_widths() {
		let params = initialised(&small_config(2)).parameters();
		let wider = NetworkConfig::builder().scale_factor(2).d(6).s(4).m(2).build();
		let mut other = Network::new(&wider).unwrap();
		assert!(other.load_parameters(&params).is_err());
		let deeper = NetworkConfig::builder().scale_factor(2).d(8).s(4).m(3).build();
		let mut other = Network::new(&deeper).unwrap();
		assert!(other.load_parameters(&params).is_err());
	}

	#[test]
	fn test_parameter_shapes_do_not_depend_on_scale() {
		let params = initialised(&small_config(2)).parameters();
		let mut other = Network::new(&small_config(3)).unwrap();
		other.load_parameters(&params).unwrap();
		assert_eq!(other.parameters(), params);
		assert_eq!(other.output_size(5, 7).unwrap(), (15, 21));
	}

	#[test]
	fn test_traced_forward_matches_plain_forward() {
		let network = initialised(&small_config(2));
		let input = Array4::from_shape_fn((1, 1, 6, 6), |(_, _, h, w)| (h * 6 + w) as f32 / 36.0);
		let plain = network.forward(&input).unwrap();
		let (traced, _) = network.forward_with_trace(&input).unwrap();
		assert_eq!(plain, traced);
	}

	#[test]
	fn test_backward_fills_every_gradient() {
		let mut config = small_config(2);
		config.m = 1;
		let network = initialised(&config);
		let input = Array4::from_shape_fn((1, 1, 5, 5), |(_, _, h, w)| ((h + 2 * w) % 5) as f32 / 5.0);
		let (output, trace) = network.forward_with_trace(&input).unwrap();
		let mut grads = Gradients::zeros_like(&network);
		let grad_input = network.backward(&trace, &Array4::ones(output.raw_dim()), &mut grads).unwrap();
		assert_eq!(grad_input.dim(), input.dim());
		let deconv_bias = grads.get("last_part.deconv.bias").unwrap();
		assert_eq!(deconv_bias.iter().cloned().collect::<Vec<_>>(), vec![100.0]);
		assert_eq!(grads.iter().count(), network.parameters().len());
	}

	#[test]
	fn test_network_rejects_wrong_channel_count() {
		let network = initialised(&small_config(2));
		assert!(network.forward(&Array4::zeros((1, 3, 8, 8))).is_err());
	}
}
