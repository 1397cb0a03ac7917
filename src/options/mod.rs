//! Command line options for the optimizer, scheduler and checkpointers.
//!
//! Options are grouped in categories. A category may be split into named subsets, in which case every
//! flag of that category is registered once per subset with the subset name as a prefix, e.g.
//! `--generator_lr` and `--discriminator_lr`.

mod parser;
mod subset;

use std::{collections::HashMap, path::PathBuf};

use clap::ArgMatches;

pub use parser::OptionsParser;
pub use subset::Subset;

use crate::error::{ConfigErr, Result};

/// The optimizers that `factories::optimizer` knows how to build.
pub const OPTIMIZERS: [&str; 7] = [
    "adam",
    "sgd",
    "adadelta",
    "adagrad",
    "sparseadam",
    "adamax",
    "rmsprop",
];

/// The learning rate schedules that `factories::scheduler` knows how to build.
pub const SCHEDULES: [&str; 3] = ["plateau", "step", "none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    General,
    Optimizer,
    Scheduler,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::General, Category::Optimizer, Category::Scheduler];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Optimizer => "optimizer",
            Category::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum OptionKind {
    Text,
    Float,
    PositiveInt,
    Int,
    Flag,
}

/// A single registered flag.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OptionDef {
    pub name: &'static str,
    pub category: Category,
    pub kind: OptionKind,
    pub default: Option<&'static str>,
    pub help: &'static str,
}

const fn def(
    name: &'static str,
    category: Category,
    kind: OptionKind,
    default: Option<&'static str>,
    help: &'static str,
) -> OptionDef {
    OptionDef {
        name,
        category,
        kind,
        default,
        help,
    }
}

pub(crate) const OPTION_DEFS: &[OptionDef] = {
    use Category::*;
    use OptionKind::*;

    &[
        // general
        def("experiment_name", General, Text, Some("experiment"), "Name used to label checkpoints"),
        def("save_path", General, Text, Some("."), "Directory where checkpoints are stored"),
        // optimizer
        def("optimizer", Optimizer, Text, Some("adam"), "Optimizer to use"),
        def("lr", Optimizer, Float, Some("1e-3"), "Learning rate"),
        def("momentum", Optimizer, Float, Some("0.9"), "Momentum (sgd, rmsprop)"),
        def("dampening", Optimizer, Float, Some("0"), "Dampening for momentum (sgd)"),
        def("beta1", Optimizer, Float, Some("0.9"), "First moment decay (adam, adamax, sparseadam)"),
        def("beta2", Optimizer, Float, Some("0.999"), "Second moment decay (adam, adamax, sparseadam)"),
        def("weight_decay", Optimizer, Float, Some("0"), "L2 penalty"),
        def("rho", Optimizer, Float, Some("0.9"), "Running average coefficient (adadelta)"),
        def("optim_eps", Optimizer, Float, Some("1e-8"), "Term added to denominators for stability"),
        def("lr_decay", Optimizer, Float, Some("0"), "Learning rate decay (adagrad)"),
        def("alpha", Optimizer, Float, Some("0.99"), "Smoothing constant (rmsprop)"),
        def("centered", Optimizer, Flag, None, "Normalize by the gradient variance (rmsprop)"),
        // scheduler
        def("lr_schedule", Scheduler, Text, Some("step"), "Learning rate schedule"),
        def("lr_step_size", Scheduler, PositiveInt, Some("100"), "Steps between decays (step)"),
        def("lr_patience", Scheduler, Int, Some("10"), "Bad steps tolerated before decaying (plateau)"),
        def("lr_cooldown", Scheduler, Int, Some("0"), "Steps to wait after a decay (plateau)"),
        def("lr_ratio", Scheduler, Float, Some("0.5"), "Multiplicative decay factor"),
        def("lr_min", Scheduler, Float, Some("1e-7"), "Lower bound for the learning rate (plateau)"),
    ]
};

/// Options of the `general` category.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralOpts {
    pub experiment_name: String,
    pub save_path: PathBuf,
}

/// Options of the `optimizer` category.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerOpts {
    pub optimizer: String,
    pub lr: f32,
    pub momentum: f32,
    pub dampening: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub weight_decay: f32,
    pub rho: f32,
    pub optim_eps: f32,
    pub lr_decay: f32,
    pub alpha: f32,
    pub centered: bool,
}

/// Options of the `scheduler` category.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOpts {
    pub lr_schedule: String,
    pub lr_step_size: usize,
    pub lr_patience: usize,
    pub lr_cooldown: usize,
    pub lr_ratio: f32,
    pub lr_min: f32,
}

/// Parsed command line options.
#[derive(Debug, Clone)]
pub struct Options {
    matches: ArgMatches,
    splits: HashMap<Category, Vec<String>>,
}

impl Options {
    pub(crate) fn new(matches: ArgMatches, splits: HashMap<Category, Vec<String>>) -> Self {
        Self { matches, splits }
    }

    /// Parses the process arguments with the built-in options only.
    ///
    /// # Errors
    /// Returns a `ConfigErr::Cli` if the arguments are invalid.
    pub fn from_env() -> Result<Self> {
        OptionsParser::new().try_parse_from(std::env::args_os())
    }

    /// The raw matches, for reading options added with `OptionsParser::arg`.
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    pub fn general(&self, subset: &Subset) -> Result<GeneralOpts> {
        let prefix = self.prefix(Category::General, subset)?;
        Ok(GeneralOpts {
            experiment_name: self.text(prefix, "experiment_name")?,
            save_path: PathBuf::from(self.text(prefix, "save_path")?),
        })
    }

    pub fn optimizer(&self, subset: &Subset) -> Result<OptimizerOpts> {
        let prefix = self.prefix(Category::Optimizer, subset)?;
        Ok(OptimizerOpts {
            optimizer: self.text(prefix, "optimizer")?,
            lr: self.float(prefix, "lr")?,
            momentum: self.float(prefix, "momentum")?,
            dampening: self.float(prefix, "dampening")?,
            beta1: self.float(prefix, "beta1")?,
            beta2: self.float(prefix, "beta2")?,
            weight_decay: self.float(prefix, "weight_decay")?,
            rho: self.float(prefix, "rho")?,
            optim_eps: self.float(prefix, "optim_eps")?,
            lr_decay: self.float(prefix, "lr_decay")?,
            alpha: self.float(prefix, "alpha")?,
            centered: self.flag(prefix, "centered")?,
        })
    }

    pub fn scheduler(&self, subset: &Subset) -> Result<SchedulerOpts> {
        let prefix = self.prefix(Category::Scheduler, subset)?;
        Ok(SchedulerOpts {
            lr_schedule: self.text(prefix, "lr_schedule")?,
            lr_step_size: self.int(prefix, "lr_step_size")?,
            lr_patience: self.int(prefix, "lr_patience")?,
            lr_cooldown: self.int(prefix, "lr_cooldown")?,
            lr_ratio: self.float(prefix, "lr_ratio")?,
            lr_min: self.float(prefix, "lr_min")?,
        })
    }

    /// Resolves which copy of a category's flags `subset` refers to.
    fn prefix<'a>(&'a self, category: Category, subset: &'a Subset) -> Result<Option<&'a str>> {
        let requested = subset.for_category(category);

        let Some(names) = self.splits.get(&category) else {
            if let Some(name) = requested {
                log::debug!(
                    "ignoring subset {name}, the {} category is not split",
                    category.as_str()
                );
            }
            return Ok(None);
        };

        match requested {
            Some(name) if names.iter().any(|n| n == name) => Ok(Some(name)),
            Some(name) => Err(ConfigErr::UnknownSubset {
                category: category.as_str(),
                name: name.to_string(),
            }),
            None => Err(ConfigErr::SubsetRequired(category.as_str())),
        }
    }

    fn text(&self, prefix: Option<&str>, name: &str) -> Result<String> {
        self.get::<String>(prefix, name)
    }

    fn float(&self, prefix: Option<&str>, name: &str) -> Result<f32> {
        self.get::<f32>(prefix, name)
    }

    fn int(&self, prefix: Option<&str>, name: &str) -> Result<usize> {
        self.get::<usize>(prefix, name)
    }

    fn flag(&self, prefix: Option<&str>, name: &str) -> Result<bool> {
        self.get::<bool>(prefix, name)
    }

    fn get<T>(&self, prefix: Option<&str>, name: &str) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = option_key(prefix, name);
        match self.matches.try_get_one::<T>(&key) {
            Ok(Some(value)) => Ok(value.clone()),
            _ => Err(ConfigErr::MissingOption(key)),
        }
    }
}

/// The argument id and long flag of `name` for the given subset prefix.
pub(crate) fn option_key(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{name}"),
        None => name.to_string(),
    }
}
