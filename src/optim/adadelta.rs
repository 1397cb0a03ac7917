use super::{
    optimizer::{ensure, ensure_eps, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Adadelta: scales each update by the ratio of the running RMS of past updates to the running RMS of gradients.
#[derive(Debug)]
pub struct Adadelta {
    group: ParamGroup,
    rho: f32,
    epsilon: f32,
    square_avg: Vec<Box<[f32]>>,
    acc_delta: Vec<Box<[f32]>>,
}

impl Adadelta {
    /// Creates a new `Adadelta` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - Coefficient that scales the delta before it is applied.
    /// * `rho` - Decay rate of the running averages.
    /// * `epsilon` - Term added inside the square roots for numerical stability.
    /// * `weight_decay` - The L2 penalty.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
        weight_decay: f32,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure(
            (0. ..=1.).contains(&rho),
            "rho",
            &format!("invalid rho value {rho}, expected [0, 1]"),
        )?;
        ensure_eps(epsilon)?;
        ensure_weight_decay(weight_decay)?;

        let group = ParamGroup::new(model, learning_rate, weight_decay);
        Ok(Self {
            square_avg: group.zeroed_state(),
            acc_delta: group.zeroed_state(),
            group,
            rho,
            epsilon,
        })
    }
}

impl Optimizer for Adadelta {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let Self {
            group,
            rho,
            epsilon,
            square_avg,
            acc_delta,
        } = self;
        let (rho, eps) = (*rho, *epsilon);
        let (lr, wd) = (group.lr, group.weight_decay);

        group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(square_avg[i].iter_mut())
                .zip(acc_delta[i].iter_mut())
                .for_each(|(((p, g), sq), acc)| {
                    let g = g + wd * *p;
                    *sq = rho * *sq + (1. - rho) * g * g;
                    let delta = (*acc + eps).sqrt() / (*sq + eps).sqrt() * g;
                    *acc = rho * *acc + (1. - rho) * delta * delta;
                    *p -= lr * delta;
                });
        })
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "adadelta"
    }
}
