use super::{
    optimizer::{ensure, ensure_lr, ensure_weight_decay},
    Optimizer, ParamGroup,
};
use crate::{error::Result, model::Module};

/// Adagrad: divides the learning rate by the root of the sum of all past squared gradients.
#[derive(Debug)]
pub struct Adagrad {
    group: ParamGroup,
    lr_decay: f32,
    epsilon: f32,
    sum: Vec<Box<[f32]>>,
    step_count: usize,
}

impl Adagrad {
    pub const DEFAULT_EPS: f32 = 1e-10;

    /// Creates a new `Adagrad` optimizer.
    ///
    /// # Arguments
    /// * `model` - The model whose trainable parameters this instance should update.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `lr_decay` - Decay of the learning rate with the amount of steps taken.
    /// * `weight_decay` - The L2 penalty.
    ///
    /// # Errors
    /// `InvalidOption` if a hyperparameter is out of range.
    pub fn new(
        model: &dyn Module,
        learning_rate: f32,
        lr_decay: f32,
        weight_decay: f32,
    ) -> Result<Self> {
        ensure_lr(learning_rate)?;
        ensure(
            lr_decay >= 0.,
            "lr_decay",
            &format!("invalid lr_decay value {lr_decay}"),
        )?;
        ensure_weight_decay(weight_decay)?;

        let group = ParamGroup::new(model, learning_rate, weight_decay);
        Ok(Self {
            sum: group.zeroed_state(),
            group,
            lr_decay,
            epsilon: Self::DEFAULT_EPS,
            step_count: 0,
        })
    }
}

impl Optimizer for Adagrad {
    fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        let (lr, wd) = (self.group.lr, self.group.weight_decay);
        let eps = self.epsilon;
        let clr = lr / (1. + self.step_count as f32 * self.lr_decay);
        let sum = &mut self.sum;

        self.group.visit(model, |i, grad, params| {
            params
                .iter_mut()
                .zip(grad)
                .zip(sum[i].iter_mut())
                .for_each(|((p, g), s)| {
                    let g = g + wd * *p;
                    *s += g * g;
                    *p -= clr * g / (s.sqrt() + eps);
                });
        })?;

        self.step_count += 1;
        Ok(())
    }

    fn param_groups(&self) -> &[ParamGroup] {
        std::slice::from_ref(&self.group)
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        std::slice::from_mut(&mut self.group)
    }

    fn name(&self) -> &'static str {
        "adagrad"
    }
}
