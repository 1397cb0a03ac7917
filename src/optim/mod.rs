//! Gradient descent optimizers over a model's trainable parameters.

mod adadelta;
mod adagrad;
mod adam;
mod adamax;
pub(crate) mod optimizer;
mod rmsprop;
mod sgd;
mod sparse_adam;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use adamax::Adamax;
pub use optimizer::{Optimizer, ParamGroup};
pub use rmsprop::RmsProp;
pub use sgd::Sgd;
pub use sparse_adam::SparseAdam;
