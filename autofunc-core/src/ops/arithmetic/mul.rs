// autofunc-core/src/ops/arithmetic/mul.rs

use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, broadcast_binary, materialized_grad};
use crate::tensor::Tensor;

/// Element-wise `a * b` with broadcasting.
///
/// Both operands are saved: `d(a*b)/da = b` and `d(a*b)/db = a`, each reduced back to
/// the operand's shape.
#[derive(Debug)]
pub struct MulFunction;

impl Function for MulFunction {
    type State = ();
    const NAME: &'static str = "MulBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let a = tensor_arg(inputs, 0, Self::NAME)?;
        let b = tensor_arg(inputs, 1, Self::NAME)?;
        let output = broadcast_binary(a, b, "mul", |x, y| x * y)?;
        ctx.save_for_backward([Some(a.clone()), Some(b.clone())]);
        Ok(vec![output])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        let saved = ctx.saved_tensors()?;
        let (Some(a), Some(b)) = (&saved[0], &saved[1]) else {
            return Err(AutofuncError::InternalError(
                "MulBackward lost its saved operands".to_string(),
            ));
        };
        let grad_a = if ctx.needs_input_grad(0) {
            Some(grad.mul(b)?.sum_to(&a.shape())?)
        } else {
            None
        };
        let grad_b = if ctx.needs_input_grad(1) {
            Some(grad.mul(a)?.sum_to(&b.shape())?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b])
    }
}

/// Performs element-wise multiplication for two tensors with broadcasting.
pub fn mul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<MulFunction>(&[a.into(), b.into()])
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
