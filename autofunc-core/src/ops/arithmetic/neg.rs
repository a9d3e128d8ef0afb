use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, check_float, map_unary, materialized_grad};
use crate::tensor::Tensor;

/// Element-wise negation.
#[derive(Debug)]
pub struct NegFunction;

impl Function for NegFunction {
    type State = ();
    const NAME: &'static str = "NegBackward";

    fn forward(
        _ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        check_float(tensor, "neg")?;
        Ok(vec![map_unary(tensor, |x| -x)?])
    }

    fn backward(
        _ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        Ok(vec![Some(grad.neg()?)])
    }
}

pub fn neg_op(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<NegFunction>(&[tensor.into()])
}

#[cfg(test)]
#[path = "neg_test.rs"]
mod tests;
