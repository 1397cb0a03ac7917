use super::{
    optimizer::{ensure, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Stochastic gradient descent with optional momentum and dampening.
#[derive(Debug)]
pub struct Sgd {
    group: ParamGroup,
    momentum: f32,
    dampening: f32,
    velocity: Option<Vec<Box<[f32]>>>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Momentum factor, zero disables momentum.
    /// * `dampening` - Dampening applied to the gradient when accumulating momentum.
    /// * `weight_decay` - The L2 penalty.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        momentum: f32,
        dampening: f32,
        weight_decay: f32,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure(
            momentum >= 0.,
            "momentum",
            &format!("invalid momentum value {momentum}"),
        )?;
        ensure_weight_decay(weight_decay)?;

        Ok(Self {
            group: ParamGroup::new(model, learning_rate, weight_decay),
            momentum,
            dampening,
            velocity: None,
        })
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let (lr, wd) = (self.group.lr, self.group.weight_decay);
        let mu = self.momentum;
        let dampening = self.dampening;

        if mu == 0. {
            return self.group.visit(model, |_, grad, params| {
                for (p, g) in params.iter_mut().zip(grad) {
                    *p -= lr * (g + wd * *p);
                }
            });
        }

        // the first successful step seeds the buffer with the raw gradient
        let first = self.velocity.is_none();
        let mut velocity = self
            .velocity
            .take()
            .unwrap_or_else(|| self.group.zeroed_state());

        let result = self.group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(velocity[i].iter_mut())
                .for_each(|((p, g), v)| {
                    let g = g + wd * *p;
                    *v = if first {
                        g
                    } else {
                        mu * *v + (1. - dampening) * g
                    };
                    *p -= lr * *v;
                });
        });

        if result.is_ok() || !first {
            self.velocity = Some(velocity);
        }
        result
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "sgd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Linear;

    #[test]
    fn plain_step_follows_the_gradient() {
        let mut model = Linear::new((2, 1), 1.);
        model.weight.grad = vec![1., -1.];
        model.bias.grad = vec![0.5];

        let mut optim = Sgd::new(&model, 0.1, 0., 0., 0.).unwrap();
        optim.step(&mut model).unwrap();

        assert!((model.weight.data[0] - 0.9).abs() < 1e-6);
        assert!((model.weight.data[1] - 1.1).abs() < 1e-6);
        assert!((model.bias.data[0] - 0.95).abs() < 1e-6);
    }

    #[test]
    fn weight_decay_is_added_to_the_gradient() {
        let mut model = Linear::new((1, 1), 2.);
        let mut optim = Sgd::new(&model, 0.5, 0., 0., 0.5).unwrap();
        optim.step(&mut model).unwrap();

        // g = 0 + 0.5 * 2
        assert_eq!(model.weight.data, vec![1.5]);
    }

    #[test]
    fn momentum_accumulates_with_dampening() {
        let mut model = Linear::new((1, 1), 0.);
        model.weight.grad = vec![1.];
        model.bias.grad = vec![0.];

        let mut optim = Sgd::new(&model, 1., 0.9, 0.5, 0.).unwrap();

        optim.step(&mut model).unwrap();
        // v = g on the first step
        assert!((model.weight.data[0] + 1.).abs() < 1e-6);

        optim.step(&mut model).unwrap();
        // v = 0.9 * 1 + 0.5 * 1
        assert!((model.weight.data[0] + 2.4).abs() < 1e-6);
    }

    #[test]
    fn failed_step_does_not_seed_the_momentum_buffer() {
        let mut model = Linear::new((1, 1), 0.);
        let mut optim = Sgd::new(&model, 1., 0.9, 0.5, 0.).unwrap();

        model.bias.requires_grad = false;
        assert!(optim.step(&mut model).is_err());

        model.bias.requires_grad = true;
        model.weight.grad = vec![1.];
        optim.step(&mut model).unwrap();

        // v = g on the first step that went through
        assert!((model.weight.data[0] + 1.).abs() < 1e-6);
    }

    #[test]
    fn negative_momentum_is_rejected() {
        let model = Linear::new((1, 1), 0.);
        assert!(Sgd::new(&model, 0.1, -0.1, 0., 0.).is_err());
    }
}
