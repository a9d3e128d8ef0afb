use crate::autograd::{scalar_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, check_float, map_unary, materialized_grad};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct MulScalarState {
    scalar: f64,
}

/// `tensor * scalar` for a plain number. The scalar is not a tensor and gets no gradient.
#[derive(Debug)]
pub struct MulScalarFunction;

impl Function for MulScalarFunction {
    type State = MulScalarState;
    const NAME: &'static str = "MulScalarBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let scalar = scalar_arg(inputs, 1, Self::NAME)?;
        check_float(tensor, "mul_scalar")?;
        ctx.state_mut().scalar = scalar;
        Ok(vec![map_unary(tensor, |x| x * scalar)?])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        Ok(vec![Some(grad.mul_scalar(ctx.state().scalar)?), None])
    }
}

pub fn mul_scalar_op(tensor: &Tensor, scalar: f64) -> Result<Tensor, AutofuncError> {
    apply_single::<MulScalarFunction>(&[tensor.into(), scalar.into()])
}

#[cfg(test)]
#[path = "mul_scalar_test.rs"]
mod tests;
