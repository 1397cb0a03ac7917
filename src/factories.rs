//! Builds the optimizer, scheduler and checkpointers of a training loop from the command line options.

use log::{debug, info};

use crate::{
    checkpoint::Checkpointer,
    error::{ConfigErr, Result},
    model::Module,
    optim::{Adadelta, Adagrad, Adam, Adamax, Optimizer, RmsProp, Sgd, SparseAdam},
    options::{Options, Subset, OPTIMIZERS},
    schedule::{lr_initialized_message, ReduceLrOnPlateau, Schedule, Scheduler, StepLr},
};

/// Returns the optimizer for `model`'s trainable parameters.
///
/// Relevant options: `--optimizer`, `--lr`, `--momentum`, `--dampening`, `--beta1`, `--beta2`, `--weight_decay`,
/// `--rho`, `--optim_eps`, `--lr_decay`, `--alpha` and `--centered`.
///
/// # Arguments
/// * `options` - The parsed command line options.
/// * `model` - The model the optimizer updates.
/// * `subset` - The subset of the optimizer options to read, if the category was split.
///
/// # Errors
/// `UnknownOptimizer` if `--optimizer` isn't one of `OPTIMIZERS`, `InvalidOption` if a hyperparameter is out of
/// range.
pub fn optimizer(
    options: &Options,
    model: &dyn Module,
    subset: &Subset,
) -> Result<Box<dyn Optimizer>> {
    let opts = options.optimizer(subset)?;

    if !OPTIMIZERS.contains(&opts.optimizer.as_str()) {
        return Err(ConfigErr::UnknownOptimizer(opts.optimizer));
    }

    let betas = (opts.beta1, opts.beta2);
    let optimizer: Box<dyn Optimizer> = match opts.optimizer.as_str() {
        "adam" => Box::new(Adam::new(
            model,
            opts.lr,
            betas,
            Adam::DEFAULT_EPS,
            opts.weight_decay,
        )?),
        "sgd" => Box::new(Sgd::new(
            model,
            opts.lr,
            opts.momentum,
            opts.dampening,
            opts.weight_decay,
        )?),
        "adadelta" => Box::new(Adadelta::new(
            model,
            opts.lr,
            opts.rho,
            opts.optim_eps,
            opts.weight_decay,
        )?),
        "adagrad" => Box::new(Adagrad::new(
            model,
            opts.lr,
            opts.lr_decay,
            opts.weight_decay,
        )?),
        "sparseadam" => Box::new(SparseAdam::new(model, opts.lr, betas, opts.optim_eps)?),
        "adamax" => Box::new(Adamax::new(
            model,
            opts.lr,
            betas,
            opts.optim_eps,
            opts.weight_decay,
        )?),
        "rmsprop" => Box::new(RmsProp::new(
            model,
            opts.lr,
            opts.alpha,
            opts.optim_eps,
            opts.weight_decay,
            opts.momentum,
            opts.centered,
        )?),
        other => return Err(ConfigErr::UnknownOptimizer(other.to_string())),
    };

    debug!(
        "built {} optimizer over {} trainable parameter(s)",
        optimizer.name(),
        optimizer
            .param_groups()
            .first()
            .map_or(0, |group| group.slots().len())
    );
    Ok(optimizer)
}

/// Returns the learning rate scheduler.
///
/// Relevant options: `--lr_schedule`, `--lr_step_size`, `--lr_patience`, `--lr_cooldown`, `--lr_ratio` and
/// `--lr_min`.
///
/// The returned `Scheduler` is stepped once per epoch with the metric being minimized. `plateau` reduces the
/// learning rate when that metric stops improving, `step` decays it every `--lr_step_size` steps regardless of the
/// metric and `none` never changes it.
///
/// # Errors
/// `UnknownSchedule` if `--lr_schedule` isn't one of `SCHEDULES`.
pub fn scheduler(options: &Options, subset: &Subset) -> Result<Scheduler> {
    let opts = options.scheduler(subset)?;

    let schedule = match opts.lr_schedule.as_str() {
        "plateau" => Schedule::Plateau(ReduceLrOnPlateau::new(
            opts.lr_ratio,
            opts.lr_patience,
            opts.lr_cooldown,
            opts.lr_min,
        )?),
        "step" => Schedule::Step(StepLr::new(opts.lr_step_size, opts.lr_ratio)?),
        "none" => Schedule::None,
        other => return Err(ConfigErr::UnknownSchedule(other.to_string())),
    };

    debug!("built {} learning rate schedule", opts.lr_schedule);
    Ok(Scheduler::new(schedule, subset.clone()))
}

/// Returns the epoch checkpointer and the epoch to start from.
///
/// Relevant options: `--experiment_name` and `--save_path`.
///
/// The checkpointer is named `epoch_<experiment_name>` and keeps a single file. The current epoch is the saved
/// one, or 1 if nothing (or 0) was saved.
pub fn epoch_checkpointer(options: &Options, subset: &Subset) -> Result<(Checkpointer<usize>, usize)> {
    let opts = options.general(subset)?;

    let mut chkp = Checkpointer::new(format!("epoch_{}", opts.experiment_name), opts.save_path)
        .overwrite(true)
        .timestamp(false)
        .add_count(false);

    let current_epoch = chkp.load()?.filter(|&epoch| epoch != 0).unwrap_or(1);
    debug!("resuming at epoch {current_epoch}");

    Ok((chkp, current_epoch))
}

/// Returns the learning rate checkpointer, setting `optimizer`'s learning rate to the restored one.
///
/// Relevant options: `--experiment_name`, `--save_path` and `--lr`.
///
/// The checkpointer is named `lr_<experiment_name>` and keeps a single file. If nothing (or 0) was saved, the
/// learning rate falls back to `--lr`.
pub fn lr_checkpointer(
    options: &Options,
    optimizer: &mut dyn Optimizer,
    subset: &Subset,
) -> Result<Checkpointer<f32>> {
    let general = options.general(subset)?;
    let optim = options.optimizer(subset)?;

    let mut chkp = Checkpointer::new(format!("lr_{}", general.experiment_name), general.save_path)
        .overwrite(true)
        .timestamp(false)
        .add_count(false);

    let lr = chkp.load()?.filter(|&lr| lr != 0.).unwrap_or(optim.lr);
    if let Some(group) = optimizer.param_groups_mut().first_mut() {
        group.lr = lr;
    }
    info!("{}", lr_initialized_message(subset, lr));

    Ok(chkp)
}
