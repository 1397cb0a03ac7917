use super::{
    optimizer::{ensure_betas, ensure_eps, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Adam with L2 weight decay folded into the gradient.
#[derive(Debug)]
pub struct Adam {
    group: ParamGroup,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    epsilon: f32,
    v: Vec<Box<[f32]>>,
    s: Vec<Box<[f32]>>,
}

impl Adam {
    /// The epsilon used when it isn't configurable.
    pub const DEFAULT_EPS: f32 = 1e-8;

    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `betas` - Decay rates of the first and second moment estimates.
    /// * `epsilon` - Term added to the denominator for numerical stability.
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
            v: group.zeroed_state(),
            s: group.zeroed_state(),
            group,
            beta1: betas.0,
            beta2: betas.1,
            beta1_t: 1.,
            beta2_t: 1.,
            epsilon,
        })
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let Self {
            group,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            v,
            s,
            ..
        } = self;
        let (b1, b2, eps) = (*b1, *b2, *eps);
        let (lr, wd) = (group.lr, group.weight_decay);

        let bc1 = 1. - self.beta1_t * b1;
        let bc2 = 1. - self.beta2_t * b2;
        let step_size = lr / bc1;
        let bc2_sqrt = bc2.sqrt();

        group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(v[i].iter_mut())
                .zip(s[i].iter_mut())
                .for_each(|(((p, &g), v), s)| {
                    let g = g + wd * *p;
                    *v = b1 * *v + (1. - b1) * g;
                    *s = b2 * *s + (1. - b2) * g * g;
                    *p -= step_size * *v / (s.sqrt() / bc2_sqrt + eps);
                });
        })?;

        self.beta1_t *= b1;
        self.beta2_t *= b2;
        Ok(())
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "adam"
    }
}
