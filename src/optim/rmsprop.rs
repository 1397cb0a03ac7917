use super::{
    optimizer::{ensure, ensure_eps, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// RMSprop, optionally centered and with momentum.
#[derive(Debug)]
pub struct RmsProp {
    group: ParamGroup,
    alpha: f32,
    epsilon: f32,
    momentum: f32,
    centered: bool,
    square_avg: Vec<Box<[f32]>>,
    grad_avg: Vec<Box<[f32]>>,
    momentum_buf: Vec<Box<[f32]>>,
}

impl RmsProp {
    /// Creates a new `RmsProp` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `alpha` - Smoothing constant of the squared gradient average.
    /// * `epsilon` - Term added to the denominator for numerical stability.
    /// * `weight_decay` - The L2 penalty.
    /// * `momentum` - Momentum factor, zero disables momentum.
    /// * `centered` - Whether to normalize by an estimate of the gradient's variance instead of its second moment.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        alpha: f32,
        epsilon: f32,
        weight_decay: f32,
        momentum: f32,
        centered: bool,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure_eps(epsilon)?;
        ensure(
            alpha >= 0.,
            "alpha",
            &format!("invalid alpha value {alpha}"),
        )?;
        ensure(
            momentum >= 0.,
            "momentum",
            &format!("invalid momentum value {momentum}"),
        )?;
        ensure_weight_decay(weight_decay)?;

        let group = ParamGroup::new(model, learning_rate, weight_decay);
        Ok(Self {
            square_avg: group.zeroed_state(),
            grad_avg: group.zeroed_state(),
            momentum_buf: group.zeroed_state(),
            group,
            alpha,
            epsilon,
            momentum,
            centered,
        })
    }
}

impl Optimizer for RmsProp {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let Self {
            group,
            alpha,
            epsilon,
            momentum,
            centered,
            square_avg,
            grad_avg,
            momentum_buf,
        } = self;
        let (alpha, eps, mu, centered) = (*alpha, *epsilon, *momentum, *centered);
        let (lr, wd) = (group.lr, group.weight_decay);

        group.visit(model, |i, grad, params| {
            let sq = &mut square_avg[i];
            let ga = &mut grad_avg[i];
            let buf = &mut momentum_buf[i];

            for (j, (p, g)) in params.iter_mut().zip(grad).enumerate() {
                let g = g + wd * *p;
                sq[j] = alpha * sq[j] + (1. - alpha) * g * g;

                let avg = if centered {
                    ga[j] = alpha * ga[j] + (1. - alpha) * g;
                    (sq[j] - ga[j] * ga[j]).sqrt() + eps
                } else {
                    sq[j].sqrt() + eps
                };

                if mu > 0. {
                    buf[j] = mu * buf[j] + g / avg;
                    *p -= lr * buf[j];
                } else {
                    *p -= lr * g / avg;
                }
            }
        })
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "rmsprop"
    }
}
