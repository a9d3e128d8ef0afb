//! Custom operations written against the [`Function`](crate::autograd::Function)
//! extension point, one per feature of the contract:
//!
//! - [`LinearFunction`]: saving inputs and skipping unneeded gradients.
//! - [`MulConstant`]: a non-tensor argument kept in typed state, and disabled gradient
//!   materialization.
//! - [`Exp`]: saving an output.
//! - [`Sort`]: a non-differentiable output and a once-differentiable backward.
//! - [`ScaleInPlace`]: an input mutated in place and marked dirty.

pub mod exp;
pub mod linear;
pub mod mul_constant;
pub mod scale_in_place;
pub mod sort;

pub use exp::{exp, Exp};
pub use linear::{linear, LinearFunction};
pub use mul_constant::{mul_constant, MulConstant, MulConstantState};
pub use scale_in_place::{scale_in_place, ScaleInPlace};
pub use sort::{sort, Sort};
