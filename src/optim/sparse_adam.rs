use super::{
    optimizer::{ensure_betas, ensure_eps, ensure_lr},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Lazy Adam for sparse gradients: only the coordinates with a non-zero gradient update their moments and
/// values.
#[derive(Debug)]
pub struct SparseAdam {
    group: ParamGroup,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    v: Vec<Box<[f32]>>,
    s: Vec<Box<[f32]>>,
    step_count: i32,
}

impl SparseAdam {
    /// Creates a new `SparseAdam` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `betas` - Decay rates of the first and second moment estimates.
    /// * `epsilon` - Term added to the denominator for numerical stability.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        betas: (f32, f32),
        epsilon: f32,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure_eps(epsilon)?;
        ensure_betas(betas)?;

        let group = ParamGroup::new(model, learning_rate, 0.);
        Ok(Self {
            v: group.zeroed_state(),
            s: group.zeroed_state(),
            group,
            beta1: betas.0,
            beta2: betas.1,
            epsilon,
            step_count: 0,
        })
    }
}

impl Optimizer for SparseAdam {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let Self {
            group,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            v,
            s,
            step_count,
        } = self;
        let (b1, b2, eps) = (*b1, *b2, *eps);
        let t = *step_count + 1;

        let bc1 = 1. - b1.powi(t);
        let bc2 = 1. - b2.powi(t);
        let step_size = group.lr * bc2.sqrt() / bc1;

        group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(v[i].iter_mut())
                .zip(s[i].iter_mut())
                .filter(|(((_, g), _), _)| **g != 0.)
                .for_each(|(((p, &g), v), s)| {
                    *v += (1. - b1) * (g - *v);
                    *s += (1. - b2) * (g * g - *s);
                    *p -= step_size * *v / (s.sqrt() + eps);
                });
        })?;

        *step_count = t;
        Ok(())
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "sparseadam"
    }
}
