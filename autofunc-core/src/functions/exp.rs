use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{check_float, map_unary, single_output};
use crate::tensor::Tensor;

/// Element-wise `e^x`. The output is its own derivative, so the output is what gets
/// saved; backward restores it with its history.
#[derive(Debug)]
pub struct Exp;

impl Function for Exp {
    type State = ();
    const NAME: &'static str = "ExpBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        check_float(tensor, "exp")?;
        let result = map_unary(tensor, f64::exp)?;
        ctx.save_for_backward([Some(result.clone())]);
        Ok(vec![result])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let saved = ctx.saved_tensors()?;
        let (Some(result), Some(grad)) = (&saved[0], &grad_outputs[0]) else {
            return Err(AutofuncError::InternalError(
                "exp backward is missing its saved output".to_string(),
            ));
        };
        Ok(vec![Some(grad.mul(result)?)])
    }
}

/// Applies [`Exp`].
pub fn exp(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    single_output(Exp::apply(&[tensor.into()])?, Exp::NAME)
}

#[cfg(test)]
#[path = "exp_test.rs"]
mod tests;
