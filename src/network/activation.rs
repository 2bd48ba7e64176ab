use ndarray::{Array1, Array4, Zip};

use crate::constants::network;

/// Which nonlinearity a block applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
	None,
	Relu,
	PRelu,
	LeakyRelu,
	Tanh,
	Sigmoid,
}

impl ActivationKind {
	/// Resolve the tag into a concrete operation, allocating any learnable state.
	pub fn build(self) -> Activation {
		match self {
			ActivationKind::None => Activation::Identity,
			ActivationKind::Relu => Activation::Relu,
			ActivationKind::PRelu => Activation::prelu(),
			ActivationKind::LeakyRelu => Activation::LeakyRelu {
				slope: network::LEAKY_RELU_SLOPE,
			},
			ActivationKind::Tanh => Activation::Tanh,
			ActivationKind::Sigmoid => Activation::Sigmoid,
		}
	}
}

/// Elementwise nonlinearity. `PRelu` carries a single learnable slope shared by
/// every channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
	Identity,
	Relu,
	PRelu { weight: Array1<f32> },
	LeakyRelu { slope: f32 },
	Tanh,
	Sigmoid,
}

fn sigmoid(x: f32) -> f32 {
	1.0 / (1.0 + (-x).exp())
}

impl Activation {
	pub fn prelu() -> Self {
		Activation::PRelu {
			weight: Array1::from_elem(1, network::PRELU_INIT),
		}
	}

	pub fn is_identity(&self) -> bool {
		matches!(self, Activation::Identity)
	}

	pub fn weight(&self) -> Option<&Array1<f32>> {
		match self {
			Activation::PRelu { weight } => Some(weight),
			_ => None,
		}
	}

	pub fn weight_mut(&mut self) -> Option<&mut Array1<f32>> {
		match self {
			Activation::PRelu { weight } => Some(weight),
			_ => None,
		}
	}

	pub fn forward(&self, input: &Array4<f32>) -> Array4<f32> {
		match self {
			Activation::Identity => input.clone(),
			Activation::Relu => input.mapv(|x| x.max(0.0)),
			Activation::PRelu { weight } => {
				let a = weight[0];
				input.mapv(|x| if x > 0.0 { x } else { a * x })
			},
			Activation::LeakyRelu { slope } => {
				let a = *slope;
				input.mapv(|x| if x > 0.0 { x } else { a * x })
			},
			Activation::Tanh => input.mapv(f32::tanh),
			Activation::Sigmoid => input.mapv(sigmoid),
		}
	}

	/// Returns the input gradient and, for `PRelu`, the slope gradient.
	pub fn backward(&self, input: &Array4<f32>, grad_output: &Array4<f32>) -> (Array4<f32>, Option<Array1<f32>>) {
		match self {
			Activation::Identity => (grad_output.clone(), None),
			Activation::Relu => (
				Zip::from(input)
					.and(grad_output)
					.map_collect(|&x, &g| if x > 0.0 { g } else { 0.0 }),
				None,
			),
			Activation::PRelu { weight } => {
				let a = weight[0];
				let mut slope_grad = 0.0;
				Zip::from(input).and(grad_output).for_each(|&x, &g| {
					if x <= 0.0 {
						slope_grad += g * x;
					}
				});
				let grad_input = Zip::from(input)
					.and(grad_output)
					.map_collect(|&x, &g| if x > 0.0 { g } else { a * g });
				(grad_input, Some(Array1::from_elem(1, slope_grad)))
			},
			Activation::LeakyRelu { slope } => {
				let a = *slope;
				(
					Zip::from(input)
						.and(grad_output)
						.map_collect(|&x, &g| if x > 0.0 { g } else { a * g }),
					None,
				)
			},
			Activation::Tanh => (
				Zip::from(input).and(grad_output).map_collect(|&x, &g| {
					let t = x.tanh();
					g * (1.0 - t * t)
				}),
				None,
			),
			Activation::Sigmoid => (
				Zip::from(input).and(grad_output).map_collect(|&x, &g| {
					let s = sigmoid(x);
					g * s * (1.0 - s)
				}),
				None,
			),
		}
	}
}
