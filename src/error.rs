use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, ConfigErr>;

/// All errors that can occur while assembling the optimization side of a training loop.
#[derive(Debug)]
pub enum ConfigErr {
    /// The requested optimizer is not one of `OPTIMIZERS`.
    UnknownOptimizer(String),
    /// The requested learning rate schedule is not one of `SCHEDULES`.
    UnknownSchedule(String),
    /// A hyperparameter is outside of its valid range.
    InvalidOption { name: String, reason: String },
    /// An option that should always be registered was not found.
    MissingOption(String),
    /// A subset name that was never registered for a split category.
    UnknownSubset { category: &'static str, name: String },
    /// The category is split, so a subset name must be given to read it.
    SubsetRequired(&'static str),
    ParamCountMismatch {
        got: usize,
        expected: usize,
    },
    ParamSizeMismatch {
        slot: usize,
        got: usize,
        expected: usize,
    },
    /// A checkpoint exists but could not be decoded.
    Checkpoint {
        name: String,
        source: serde_json::Error,
    },
    Io(io::Error),
    Cli(clap::Error),
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOptimizer(name) => write!(f, "Optimizer {name} not available."),
            Self::UnknownSchedule(name) => write!(f, "Learning rate schedule {name} not available."),
            Self::InvalidOption { name, reason } => write!(f, "invalid option {name}: {reason}"),
            Self::MissingOption(name) => write!(f, "option {name} was never registered"),
            Self::UnknownSubset { category, name } => {
                write!(f, "subset {name} is not registered for the {category} category")
            }
            Self::SubsetRequired(category) => {
                write!(f, "the {category} category is split, a subset must be given")
            }
            Self::ParamCountMismatch { got, expected } => write!(
                f,
                "the model has {got} trainable parameters, the optimizer expected {expected}"
            ),
            Self::ParamSizeMismatch {
                slot,
                got,
                expected,
            } => write!(
                f,
                "parameter {slot} has size {got}, the optimizer expected {expected}"
            ),
            Self::Checkpoint { name, source } => write!(f, "corrupt checkpoint {name}: {source}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Cli(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ConfigErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Checkpoint { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Cli(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<clap::Error> for ConfigErr {
    fn from(value: clap::Error) -> Self {
        Self::Cli(value)
    }
}
