use crate::{
    error::{ConfigErr, Result},
    model::{Module, Parameter},
};

/// The trainable parameters of a model together with the hyperparameters shared by all of them.
///
/// Parameters that do not require a gradient when the group is created are not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    pub lr: f32,
    pub weight_decay: f32,
    slots: Vec<usize>,
    sizes: Vec<usize>,
}

impl ParamGroup {
    /// Creates a new `ParamGroup` over `model`'s trainable parameters.
    ///
    /// # Arguments
    /// * `model` - The model whose parameters are recorded.
    /// * `lr` - The learning rate.
    /// * `weight_decay` - The L2 penalty, zero disables it.
    pub fn new(model: &dyn Module, lr: f32, weight_decay: f32) -> Self {
        let (slots, sizes) = model
            .parameters()
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.requires_grad)
            .map(|(i, p)| (i, p.len()))
            .unzip();

        Self {
            lr,
            weight_decay,
            slots,
            sizes,
        }
    }

    /// The position of each trainable parameter in `Module::parameters`.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the total amount of scalars in the group.
    pub fn numel(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Allocates one zeroed buffer per parameter, used for per-parameter optimizer state.
    pub(crate) fn zeroed_state(&self) -> Vec<Box<[f32]>> {
        self.sizes
            .iter()
            .map(|&n| vec![0.; n].into_boxed_slice())
            .collect()
    }

    /// Calls `f` with each parameter's position in the group, its gradient and its values.
    ///
    /// The model's layout is validated against the group before any parameter is visited, so a mismatch leaves
    /// the model untouched.
    ///
    /// # Errors
    /// `ParamCountMismatch` if the amount of trainable parameters changed, `ParamSizeMismatch` if any of them
    /// changed size.
    pub(crate) fn visit<F>(&self, model: &mut dyn Module, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &[f32], &mut [f32]),
    {
        let mut params = self.trainable(model)?;

        for (i, p) in params.iter_mut().enumerate() {
            let Parameter { data, grad, .. } = &mut **p;
            f(i, grad, data);
        }

        Ok(())
    }

    fn trainable<'a>(&self, model: &'a mut dyn Module) -> Result<Vec<&'a mut Parameter>> {
        let params: Vec<_> = model
            .parameters_mut()
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.requires_grad)
            .collect();

        if params.len() != self.slots.len() {
            return Err(ConfigErr::ParamCountMismatch {
                got: params.len(),
                expected: self.slots.len(),
            });
        }

        for ((slot, p), &expected) in params.iter().zip(&self.sizes) {
            let got = if p.data.len() != expected {
                p.data.len()
            } else {
                p.grad.len()
            };

            if got != expected {
                return Err(ConfigErr::ParamSizeMismatch {
                    slot: *slot,
                    got,
                    expected,
                });
            }
        }

        Ok(params.into_iter().map(|(_, p)| p).collect())
    }
}

/// Defines the strategy for updating model parameters based on their accumulated gradients.
pub trait Optimizer {
    /// Updates every trainable parameter of `model` using its gradient.
    ///
    /// # Errors
    /// An error if the model's trainable parameters don't match the ones the optimizer was built with.
    fn step(&mut self, model: &mut dyn Module) -> Result<()>;

    fn param_groups(&self) -> &[ParamGroup];

    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    /// The name this optimizer is selected by on the command line.
    fn name(&self) -> &'static str;

    /// Returns the learning rate of the first parameter group.
    fn lr(&self) -> f32 {
        self.param_groups()
            .first()
            .map(|group| group.lr)
            .unwrap_or_default()
    }

    /// Sets the learning rate of every parameter group.
    fn set_lr(&mut self, lr: f32) {
        for group in self.param_groups_mut() {
            group.lr = lr;
        }
    }

    /// Zeroes the gradient of every trainable parameter of `model`.
    fn zero_grad(&self, model: &mut dyn Module) {
        for p in model.parameters_mut() {
            if p.requires_grad {
                p.zero_grad();
            }
        }
    }
}

/// Fails with `InvalidOption` when `ok` doesn't hold.
pub(crate) fn ensure(ok: bool, name: &str, reason: &str) -> Result<()> {
    if ok {
        return Ok(());
    }

    Err(ConfigErr::InvalidOption {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

pub(crate) fn ensure_lr(lr: f32) -> Result<()> {
    ensure(lr >= 0., "lr", &format!("invalid learning rate {lr}"))
}

pub(crate) fn ensure_eps(eps: f32) -> Result<()> {
    ensure(eps >= 0., "optim_eps", &format!("invalid epsilon {eps}"))
}

pub(crate) fn ensure_weight_decay(weight_decay: f32) -> Result<()> {
    ensure(
        weight_decay >= 0.,
        "weight_decay",
        &format!("invalid weight decay {weight_decay}"),
    )
}

pub(crate) fn ensure_betas((beta1, beta2): (f32, f32)) -> Result<()> {
    ensure(
        (0. ..1.).contains(&beta1),
        "beta1",
        &format!("invalid beta parameter {beta1}, expected [0, 1)"),
    )?;
    ensure(
        (0. ..1.).contains(&beta2),
        "beta2",
        &format!("invalid beta parameter {beta2}, expected [0, 1)"),
    )
}
