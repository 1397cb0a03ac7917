use ndarray::{linalg, prelude::*};

use crate::error::{ConfigErr, Result};

/// A trainable tensor, stored flat, together with its accumulated gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub data: Vec<f32>,
    pub grad: Vec<f32>,
    pub requires_grad: bool,
}

impl Parameter {
    /// Creates a new trainable `Parameter` with a zeroed gradient.
    pub fn new(data: Vec<f32>) -> Self {
        let grad = vec![0.; data.len()];
        Self {
            data,
            grad,
            requires_grad: true,
        }
    }

    /// Creates a new `Parameter` that optimizers leave untouched.
    pub fn frozen(data: Vec<f32>) -> Self {
        Self {
            requires_grad: false,
            ..Self::new(data)
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }
}

/// Anything that owns parameters an optimizer can update.
///
/// Both methods must return the parameters in the same, stable order.
pub trait Module {
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;
}

/// A dense layer computing `y = x W + b` for a batch of rows `x`.
#[derive(Debug, Clone)]
pub struct Linear {
    dim: (usize, usize),
    pub weight: Parameter,
    pub bias: Parameter,
}

impl Linear {
    /// Creates a new `Linear` layer with every parameter set to `init`.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `init` - The initial value of the weights and biases.
    pub fn new(dim: (usize, usize), init: f32) -> Self {
        Self {
            dim,
            weight: Parameter::new(vec![init; dim.0 * dim.1]),
            bias: Parameter::new(vec![init; dim.1]),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = self.view_params()?;
        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;
        Ok(z)
    }

    /// Runs a forward and backward pass over a batch with a mean squared error loss.
    ///
    /// The gradients are overwritten, not accumulated.
    ///
    /// # Returns
    /// The loss of the batch before the update.
    pub fn backward_mse(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        let y_pred = self.forward(x)?;
        let diff = &y_pred - &y;
        let loss = diff.mapv(|d| d.powi(2)).mean().unwrap_or_default();
        let d = diff * (2.0 / y_pred.len() as f32);

        let (n, m) = self.dim;
        let got = self.weight.grad.len();
        let mut dw = ArrayViewMut2::from_shape((n, m), &mut self.weight.grad).map_err(|_| {
            ConfigErr::ParamSizeMismatch {
                slot: 0,
                got,
                expected: n * m,
            }
        })?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);

        if self.bias.grad.len() != m {
            return Err(ConfigErr::ParamSizeMismatch {
                slot: 1,
                got: self.bias.grad.len(),
                expected: m,
            });
        }
        for (g, col) in self.bias.grad.iter_mut().zip(d.columns()) {
            *g = col.sum();
        }

        Ok(loss)
    }

    fn view_params(&self) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
        let (n, m) = self.dim;
        let w = ArrayView2::from_shape((n, m), &self.weight.data).map_err(|_| {
            ConfigErr::ParamSizeMismatch {
                slot: 0,
                got: self.weight.len(),
                expected: n * m,
            }
        })?;
        let b = ArrayView1::from_shape(m, &self.bias.data).map_err(|_| {
            ConfigErr::ParamSizeMismatch {
                slot: 1,
                got: self.bias.len(),
                expected: m,
            }
        })?;
        Ok((w, b))
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_parameters_do_not_require_grad() {
        let p = Parameter::frozen(vec![1., 2.]);
        assert!(!p.requires_grad);
        assert_eq!(p.grad, vec![0., 0.]);
    }

    #[test]
    fn forward_adds_the_bias() {
        let mut layer = Linear::new((2, 1), 0.);
        layer.weight.data = vec![1., 2.];
        layer.bias.data = vec![0.5];

        let x = array![[1., 1.], [2., 0.]];
        let y = layer.forward(x.view()).unwrap();
        assert_eq!(y, array![[3.5f32], [2.5]]);
    }

    #[test]
    fn backward_computes_mse_gradients() {
        let mut layer = Linear::new((1, 1), 0.);
        let x = array![[1.], [2.]];
        let y = array![[1.], [3.]];

        let loss = layer.backward_mse(x.view(), y.view()).unwrap();

        // y_pred = 0, d = 2 * (0 - y) / 2 = -y
        assert_eq!(loss, 5.);
        assert_eq!(layer.weight.grad, vec![-7.]);
        assert_eq!(layer.bias.grad, vec![-4.]);
    }

    #[test]
    fn mismatched_parameters_are_reported() {
        let mut layer = Linear::new((2, 2), 0.);
        layer.weight.data.pop();
        let x = array![[1., 1.]];
        assert!(matches!(
            layer.forward(x.view()),
            Err(ConfigErr::ParamSizeMismatch { slot: 0, .. })
        ));
    }
}
