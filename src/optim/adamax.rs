use super::{
    optimizer::{ensure_betas, ensure_eps, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Adamax: the infinity norm variant of Adam.
#[derive(Debug)]
pub struct Adamax {
    group: ParamGroup,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    epsilon: f32,
    exp_avg: Vec<Box<[f32]>>,
    exp_inf: Vec<Box<[f32]>>,
}

impl Adamax {
    /// Creates a new `Adamax` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `betas` - Decay rates of the first moment and of the exponentially weighted infinity norm.
    /// * `epsilon` - Term added to the infinity norm for numerical stability.
    /// * `weight_decay` - The L2 penalty.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        betas: (f32, f32),
        epsilon: f32,
        weight_decay: f32,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure_eps(epsilon)?;
        ensure_betas(betas)?;
        ensure_weight_decay(weight_decay)?;

        let group = ParamGroup::new(model, learning_rate, weight_decay);
        Ok(Self {
            exp_avg: group.zeroed_state(),
            exp_inf: group.zeroed_state(),
            group,
            beta1: betas.0,
            beta2: betas.1,
            beta1_t: 1.,
            epsilon,
        })
    }
}

impl Optimizer for Adamax {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let Self {
            group,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            exp_avg,
            exp_inf,
            ..
        } = self;
        let (b1, b2, eps) = (*b1, *b2, *eps);
        let wd = group.weight_decay;
        let clr = group.lr / (1. - self.beta1_t * b1);

        group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(exp_avg[i].iter_mut())
                .zip(exp_inf[i].iter_mut())
                .for_each(|(((p, g), m), u)| {
                    let g = g + wd * *p;
                    *m = b1 * *m + (1. - b1) * g;
                    *u = (b2 * *u).max(g.abs() + eps);
                    *p -= clr * *m / *u;
                });
        })?;

        self.beta1_t *= b1;
        Ok(())
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "adamax"
    }
}
