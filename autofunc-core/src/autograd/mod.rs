//! Graph recording and reverse-mode differentiation.
//!
//! - [`function`]: the [`Function`] trait through which every differentiable operation,
//!   built-in or user-defined, is applied.
//! - [`graph`]: the executor behind [`Tensor::backward`](crate::Tensor::backward) and
//!   [`grad`].
//! - [`grad_check`]: finite-difference verification of a backward implementation.
//! - [`grad_mode`]: the thread-local switch that turns recording off.

pub mod backward_op;
pub mod function;
pub mod grad_check;
pub mod grad_mode;
pub mod graph;
mod saved;

pub use backward_op::{BackwardOp, Node};
pub use function::{
    optional_tensor_arg, scalar_arg, shape_arg, tensor_arg, BackwardContext, Context, Function,
    Input,
};
pub use grad_check::{gradcheck, gradgradcheck, GradCheckError, GradCheckOptions};
pub use grad_mode::{is_grad_enabled, no_grad, set_grad_enabled, GradModeGuard};
pub use graph::{grad, BackwardOptions, GradOptions};
