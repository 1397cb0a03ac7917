use crate::{
    error::Result,
    optim::{optimizer::ensure, Optimizer},
};

/// Multiplies the learning rate by `gamma` every `step_size` steps.
#[derive(Debug, Clone)]
pub struct StepLr {
    step_size: usize,
    gamma: f32,
    last_step: usize,
}

impl StepLr {
    /// Creates a new `StepLr`.
    ///
    /// # Errors
    /// `InvalidOption` if `step_size` is zero.
    pub fn new(step_size: usize, gamma: f32) -> Result<Self> {
        ensure(step_size > 0, "lr_step_size", "must be greater than 0")?;

        Ok(Self {
            step_size,
            gamma,
            last_step: 0,
        })
    }

    pub fn last_step(&self) -> usize {
        self.last_step
    }

    pub fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.last_step += 1;

        if self.last_step % self.step_size == 0 {
            for group in optimizer.param_groups_mut() {
                group.lr *= self.gamma;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Linear, optim::Sgd};

    #[test]
    fn decays_every_step_size_steps() {
        let mut optim = Sgd::new(&Linear::new((1, 1), 0.), 0.1, 0., 0., 0.).unwrap();
        let mut sched = StepLr::new(2, 0.1).unwrap();

        sched.step(&mut optim);
        assert!((optim.lr() - 0.1).abs() < 1e-7);

        sched.step(&mut optim);
        assert!((optim.lr() - 0.01).abs() < 1e-7);
        sched.step(&mut optim);
        assert!((optim.lr() - 0.01).abs() < 1e-7);

        sched.step(&mut optim);
        assert!((optim.lr() - 0.001).abs() < 1e-8);
        assert_eq!(sched.last_step(), 4);
    }

    #[test]
    fn zero_step_size_is_rejected() {
        assert!(StepLr::new(0, 0.5).is_err());
    }
}
