use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, broadcast_binary, materialized_grad};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct SubState {
    a_shape: Vec<usize>,
    b_shape: Vec<usize>,
}

/// Element-wise `a - b` with broadcasting.
#[derive(Debug)]
pub struct SubFunction;

impl Function for SubFunction {
    type State = SubState;
    const NAME: &'static str = "SubBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let a = tensor_arg(inputs, 0, Self::NAME)?;
        let b = tensor_arg(inputs, 1, Self::NAME)?;
        let output = broadcast_binary(a, b, "sub", |x, y| x - y)?;
        *ctx.state_mut() = SubState {
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
            Some(grad.neg()?.sum_to(&state.b_shape)?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b])
    }
}

/// Performs element-wise subtraction `a - b` with broadcasting.
pub fn sub_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<SubFunction>(&[a.into(), b.into()])
}

#[cfg(test)]
#[path = "sub_test.rs"]
mod tests;
