use crate::autograd::{scalar_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::single_output;
use crate::tensor::Tensor;

/// The constant, kept for backward. It is not a tensor, so it is stored in the state
/// rather than saved.
#[derive(Debug, Default)]
pub struct MulConstantState {
    pub constant: f64,
}

/// `tensor * constant` for a plain number.
///
/// Gradient materialization is disabled: when the output receives no gradient,
/// backward sees `None` and returns `[None, None]` without doing any arithmetic.
#[derive(Debug)]
pub struct MulConstant;

impl Function for MulConstant {
    type State = MulConstantState;
    const NAME: &'static str = "MulConstantBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let constant = scalar_arg(inputs, 1, Self::NAME)?;
        ctx.set_materialize_grads(false);
        ctx.state_mut().constant = constant;
        Ok(vec![tensor.mul_scalar(constant)?])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        match grad_outputs.first().and_then(Option::as_ref) {
            // The constant is not a tensor: its gradient is always `None`.
            Some(grad) => Ok(vec![Some(grad.mul_scalar(ctx.state().constant)?), None]),
            None => Ok(vec![None, None]),
        }
    }
}

/// Applies [`MulConstant`].
pub fn mul_constant(tensor: &Tensor, constant: f64) -> Result<Tensor, AutofuncError> {
    let outputs = MulConstant::apply(&[tensor.into(), constant.into()])?;
    single_output(outputs, MulConstant::NAME)
}

#[cfg(test)]
#[path = "mul_constant_test.rs"]
mod tests;
