use ndarray::ArrayD;

use crate::error::{FsrcnnError, Result};
use crate::network::{Gradients, Network, ParameterSet};

/// Stochastic gradient descent with momentum.
///
/// Update rule, per parameter: `v ← μ·v + g`, `θ ← θ − lr·v`.
#[derive(Debug, Clone)]
pub struct Sgd {
	learning_rate: f32,
	momentum: f32,
	velocity: ParameterSet,
}

impl Sgd {
	pub fn new(learning_rate: f32, momentum: f32) -> Result<Self> {
		if !(learning_rate > 0.0) {
			return Err(FsrcnnError::InvalidParameter(format!(
				"Learning rate ({}) must be greater than 0",
				learning_rate
			)));
		}
		if !(0.0..1.0).contains(&momentum) {
			return Err(FsrcnnError::InvalidParameter(format!("Momentum ({}) must be in [0, 1)", momentum)));
		}
		Ok(Sgd {
			learning_rate,
			momentum,
			velocity: ParameterSet::new(),
		})
	}

	pub fn learning_rate(&self) -> f32 {
		self.learning_rate
	}

	pub fn momentum(&self) -> f32 {
		self.momentum
	}

	pub fn step(&mut self, network: &mut Network, grads: &Gradients) -> Result<()> {
		let learning_rate = self.learning_rate;
		let momentum = self.momentum;
		let velocity = &mut self.velocity;
		let mut error = None;
		network.visit_parameters_mut(&mut |name, mut param| {
			if error.is_some() {
				return;
			}
			let grad = match grads.get(&name) {
				Some(grad) if grad.shape() == param.shape() => grad,
				_ => {
					error = Some(FsrcnnError::Shape(format!("no matching gradient for {}", name)));
					return;
				},
			};
			let v = velocity
				.entry(name)
				.or_insert_with(|| ArrayD::zeros(grad.raw_dim()));
			v.zip_mut_with(grad, |v, &g| *v = momentum * *v + g);
			param.scaled_add(-learning_rate, &*v);
		});
		match error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
