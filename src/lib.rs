//! Command line configurable factories for the optimization side of a training loop: the optimizer, its
//! learning rate schedule and the checkpointers that let training resume where it stopped.

pub mod checkpoint;
pub mod error;
pub mod factories;
pub mod model;
pub mod optim;
pub mod options;
pub mod schedule;

pub use checkpoint::Checkpointer;
pub use error::{ConfigErr, Result};
pub use factories::{epoch_checkpointer, lr_checkpointer, optimizer, scheduler};
pub use options::{Options, OptionsParser, Subset};
