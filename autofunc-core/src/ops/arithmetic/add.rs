// autofunc-core/src/ops/arithmetic/add.rs

use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, broadcast_binary, materialized_grad};
use crate::tensor::Tensor;

/// Input shapes, needed to reduce the broadcast gradient.
#[derive(Debug, Default)]
pub struct AddState {
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

/// Element-wise `a + b` with broadcasting.
#[derive(Debug)]
pub struct AddFunction;

impl Function for AddFunction {
    type State = AddState;
    const NAME: &'static str = "AddBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let a = tensor_arg(inputs, 0, Self::NAME)?;
        let b = tensor_arg(inputs, 1, Self::NAME)?;
        let output = broadcast_binary(a, b, "add", |x, y| x + y)?;
        *ctx.state_mut() = AddState {
            a_shape: a.shape(),
            b_shape: b.shape(),
        };
        Ok(vec![output])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        let state = ctx.state();
        let grad_a = if ctx.needs_input_grad(0) {
            Some(grad.sum_to(&state.a_shape)?)
        } else {
            None
        };
        let grad_b = if ctx.needs_input_grad(1) {
            Some(grad.sum_to(&state.b_shape)?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b])
    }
}

/// Performs element-wise addition for two tensors with broadcasting.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<AddFunction>(&[a.into(), b.into()])
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
