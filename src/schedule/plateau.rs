use crate::{
    error::Result,
    optim::{optimizer::ensure, Optimizer},
};

/// Reduces the learning rate once a minimized metric stops improving.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    factor: f32,
    patience: usize,
    cooldown: usize,
    min_lr: f32,
    threshold: f32,
    eps: f32,

    best: f32,
    num_bad_epochs: usize,
    cooldown_counter: usize,
}

impl ReduceLrOnPlateau {
    /// Relative improvement a metric needs over the best seen to count as better.
    pub const THRESHOLD: f32 = 1e-4;
    /// Reductions smaller than this are ignored.
    pub const EPS: f32 = 1e-8;

    /// Creates a new `ReduceLrOnPlateau`.
    ///
    /// # Arguments
    /// * `factor` - The multiplier applied to the learning rate on every reduction.
    /// * `patience` - The amount of steps without improvement tolerated before reducing.
    /// * `cooldown` - The amount of steps to wait after a reduction before counting bad steps again.
    /// * `min_lr` - The learning rate is never reduced below this value.
    ///
    /// # Errors
    /// `InvalidOption` if `factor` is not smaller than 1.
    pub fn new(factor: f32, patience: usize, cooldown: usize, min_lr: f32) -> Result<Self> {
        ensure(
            factor < 1.,
            "lr_ratio",
            &format!("factor should be < 1.0, got {factor}"),
        )?;
        ensure(
            min_lr >= 0.,
            "lr_min",
            &format!("invalid minimum learning rate {min_lr}"),
        )?;

        Ok(Self {
            factor,
            patience,
            cooldown,
            min_lr,
            threshold: Self::THRESHOLD,
            eps: Self::EPS,
            best: f32::INFINITY,
            num_bad_epochs: 0,
            cooldown_counter: 0,
        })
    }

    pub fn best(&self) -> f32 {
        self.best
    }

    pub fn num_bad_epochs(&self) -> usize {
        self.num_bad_epochs
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown_counter > 0
    }

    pub fn step(&mut self, optimizer: &mut dyn Optimizer, metric: f32) {
        if self.is_better(metric) {
            self.best = metric;
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
        }

        if self.in_cooldown() {
            self.cooldown_counter -= 1;
            self.num_bad_epochs = 0;
        }

        if self.num_bad_epochs > self.patience {
            self.reduce_lr(optimizer);
            self.cooldown_counter = self.cooldown;
            self.num_bad_epochs = 0;
        }
    }

    fn is_better(&self, metric: f32) -> bool {
        metric < self.best * (1. - self.threshold)
    }

    fn reduce_lr(&self, optimizer: &mut dyn Optimizer) {
        for group in optimizer.param_groups_mut() {
            let old_lr = group.lr;
            let new_lr = (old_lr * self.factor).max(self.min_lr);
            if old_lr - new_lr > self.eps {
                group.lr = new_lr;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Linear, optim::Sgd};

    fn sgd(lr: f32) -> Sgd {
        Sgd::new(&Linear::new((1, 1), 0.), lr, 0., 0., 0.).unwrap()
    }

    #[test]
    fn reduces_after_patience_is_exhausted() {
        let mut optim = sgd(1.);
        let mut sched = ReduceLrOnPlateau::new(0.5, 2, 0, 0.).unwrap();

        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 1.);

        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 0.5);
        assert_eq!(sched.num_bad_epochs(), 0);
    }

    #[test]
    fn improvements_reset_the_bad_epoch_count() {
        let mut optim = sgd(1.);
        let mut sched = ReduceLrOnPlateau::new(0.5, 1, 0, 0.).unwrap();

        for metric in [10., 10., 9., 9., 8.] {
            sched.step(&mut optim, metric);
        }
        assert_eq!(optim.lr(), 1.);
        assert_eq!(sched.best(), 8.);
    }

    #[test]
    fn tiny_improvements_do_not_count() {
        let mut optim = sgd(1.);
        let mut sched = ReduceLrOnPlateau::new(0.5, 0, 0, 0.).unwrap();

        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 0.99999);
        assert_eq!(optim.lr(), 0.5);
    }

    #[test]
    fn cooldown_delays_the_next_reduction() {
        let mut optim = sgd(1.);
        let mut sched = ReduceLrOnPlateau::new(0.5, 0, 2, 0.).unwrap();

        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 0.5);
        assert!(sched.in_cooldown());

        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 0.5);

        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 0.25);
    }

    #[test]
    fn never_goes_below_min_lr() {
        let mut optim = sgd(1e-3);
        let mut sched = ReduceLrOnPlateau::new(0.1, 0, 0, 5e-4).unwrap();

        sched.step(&mut optim, 1.);
        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 5e-4);

        sched.step(&mut optim, 1.);
        assert_eq!(optim.lr(), 5e-4);
    }

    #[test]
    fn factor_must_shrink() {
        assert!(ReduceLrOnPlateau::new(1., 0, 0, 0.).is_err());
    }
}
