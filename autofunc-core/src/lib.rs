//! Custom differentiable functions on a small reverse-mode autodiff engine.
//!
//! New operations implement [`Function`]; [`gradcheck`](autograd::gradcheck) verifies
//! their backward against finite differences. The tensor type and the built-in
//! primitives in [`ops`] exist to host that extension point.

pub mod autograd;
pub mod error;
pub mod functions;
pub mod nn;
pub mod ops;
pub(crate) mod storage;
pub mod tensor;
pub mod tensor_data;
pub mod types;
pub mod utils;

pub use autograd::{BackwardContext, Context, Function, Input};
pub use error::AutofuncError;
pub use tensor::Tensor;
pub use types::DType;
