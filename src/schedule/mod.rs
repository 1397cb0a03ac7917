//! Learning rate schedules and the driver that applies them to an optimizer.

mod plateau;
mod step;

pub use plateau::ReduceLrOnPlateau;
pub use step::StepLr;

use log::info;

use crate::{options::Subset, optim::Optimizer};

/// A learning rate policy.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Reduce the learning rate when the metric passed to `Scheduler::step` plateaus.
    Plateau(ReduceLrOnPlateau),
    /// Decay the learning rate on a fixed period, ignoring the metric.
    Step(StepLr),
    /// Keep the learning rate constant.
    None,
}

/// Applies a `Schedule` to an optimizer and reports learning rate changes.
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedule: Schedule,
    subset: Subset,
}

impl Scheduler {
    /// Creates a new `Scheduler`.
    ///
    /// # Arguments
    /// * `schedule` - The policy to apply.
    /// * `subset` - The subset whose name labels the log lines, if any.
    pub fn new(schedule: Schedule, subset: Subset) -> Self {
        Self { schedule, subset }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Runs one step of the schedule on `optimizer`.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer whose learning rate is adjusted.
    /// * `metric` - The value being minimized, only used by `Schedule::Plateau`.
    ///
    /// # Returns
    /// The learning rate of the first parameter group after the step.
    pub fn step(&mut self, optimizer: &mut dyn Optimizer, metric: f32) -> f32 {
        let current_lr = optimizer.lr();

        match &mut self.schedule {
            Schedule::Plateau(plateau) => plateau.step(optimizer, metric),
            Schedule::Step(step) => step.step(optimizer),
            Schedule::None => {}
        }

        let new_lr = optimizer.lr();
        if new_lr != current_lr {
            info!("{}", lr_changed_message(&self.subset, current_lr, new_lr));
        }

        new_lr
    }
}

/// `Learning rate (<subset>) changed from <old> to <new>`.
pub(crate) fn lr_changed_message(subset: &Subset, old_lr: f32, new_lr: f32) -> String {
    format!(
        "Learning rate{} changed from {} to {}",
        subset.log_suffix(),
        scientific(old_lr),
        scientific(new_lr)
    )
}

/// `Learning rate (<subset>) initialized to <lr>.`
pub(crate) fn lr_initialized_message(subset: &Subset, lr: f32) -> String {
    format!(
        "Learning rate{} initialized to {}.",
        subset.log_suffix(),
        scientific(lr)
    )
}

/// Formats `value` with two decimals and a signed exponent of at least two digits, e.g. `1.00e-03`.
fn scientific(value: f32) -> String {
    let formatted = format!("{value:.2e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return formatted;
    };

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Linear, optim::Sgd};

    #[test]
    fn none_keeps_the_learning_rate() {
        let mut optim = Sgd::new(&Linear::new((1, 1), 0.), 0.1, 0., 0., 0.).unwrap();
        let mut sched = Scheduler::new(Schedule::None, Subset::None);

        for metric in [3., 2., 5., 5., 5.] {
            assert_eq!(sched.step(&mut optim, metric), 0.1);
        }
    }

    #[test]
    fn step_schedule_ignores_the_metric() {
        let mut optim = Sgd::new(&Linear::new((1, 1), 0.), 1., 0., 0., 0.).unwrap();
        let mut sched = Scheduler::new(
            Schedule::Step(StepLr::new(1, 0.5).unwrap()),
            Subset::name("gen"),
        );

        assert_eq!(sched.step(&mut optim, f32::NAN), 0.5);
        assert_eq!(sched.step(&mut optim, 0.), 0.25);
    }

    #[test]
    fn plateau_schedule_uses_the_metric() {
        let mut optim = Sgd::new(&Linear::new((1, 1), 0.), 1., 0., 0., 0.).unwrap();
        let plateau = ReduceLrOnPlateau::new(0.1, 0, 0, 0.).unwrap();
        let mut sched = Scheduler::new(Schedule::Plateau(plateau), Subset::None);

        assert_eq!(sched.step(&mut optim, 3.), 1.);
        assert_eq!(sched.step(&mut optim, 2.), 1.);
        assert!((sched.step(&mut optim, 2.) - 0.1).abs() < 1e-7);
    }

    #[test]
    fn scientific_notation_pads_the_exponent() {
        assert_eq!(scientific(1e-3), "1.00e-03");
        assert_eq!(scientific(5e-4), "5.00e-04");
        assert_eq!(scientific(1234.), "1.23e+03");
        assert_eq!(scientific(0.), "0.00e+00");
        assert_eq!(scientific(1e-10), "1.00e-10");
        assert_eq!(scientific(f32::INFINITY), "inf");
    }

    #[test]
    fn change_message_is_labelled_with_the_subset() {
        assert_eq!(
            lr_changed_message(&Subset::name("gen"), 1e-3, 5e-4),
            "Learning rate (gen) changed from 1.00e-03 to 5.00e-04"
        );
        assert_eq!(
            lr_changed_message(&Subset::None, 1e-3, 5e-4),
            "Learning rate changed from 1.00e-03 to 5.00e-04"
        );
    }

    #[test]
    fn initialized_message_is_labelled_with_the_subset() {
        assert_eq!(
            lr_initialized_message(&Subset::name("disc"), 0.1),
            "Learning rate (disc) initialized to 1.00e-01."
        );
        assert_eq!(
            lr_initialized_message(&Subset::None, 1e-3),
            "Learning rate initialized to 1.00e-03."
        );
    }
}
