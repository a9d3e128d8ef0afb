use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, check_float, materialized_grad};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct SumState {
    input_shape: Vec<usize>,
}

/// Sum of all elements, producing a zero-dimensional tensor.
#[derive(Debug)]
pub struct SumFunction;

impl Function for SumFunction {
    type State = SumState;
    const NAME: &'static str = "SumBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let dtype = check_float(tensor, "sum")?;
        let total: f64 = tensor.to_vec_f64().iter().sum();
        ctx.state_mut().input_shape = tensor.shape();
        Ok(vec![Tensor::from_values(vec![total], vec![], dtype)?])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        Ok(vec![Some(grad.expand(&ctx.state().input_shape)?)])
    }
}

pub fn sum_op(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<SumFunction>(&[tensor.into()])
}

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
