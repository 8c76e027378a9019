//! Depth gradients for gradient-domain hole filling.
//!
//! - [`convention`]: the forward-difference layout both the estimator and
//!   the Poisson reconstruction read and write.
//! - [`grad`]: masked gradient estimation that never differences across a
//!   hole boundary.

pub mod convention;
pub mod grad;

pub use convention::{edge_target, Axis, GRADIENT_CHANNELS};
pub use grad::masked_gradient;
