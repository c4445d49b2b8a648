//! Diagnostics for the autodiff tape and learned parameters.

pub mod gradient_check;
pub mod numerical_check;

pub use gradient_check::{gradient_check, gradient_norms};
pub use numerical_check::{check_gradients, check_weights, NumericalIssue};
