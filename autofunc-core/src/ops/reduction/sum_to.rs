use crate::autograd::{shape_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, materialized_grad};
use crate::tensor::utils::{
    broadcast_shapes, broadcast_source_index, calculate_strides, index_to_coord,
};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct SumToState {
    input_shape: Vec<usize>,
}

/// Sums a tensor down to a shape that broadcasts to it.
///
/// This is the adjoint of broadcasting: the gradient of a broadcast operand is the
/// output gradient summed to the operand's shape.
#[derive(Debug)]
pub struct SumToFunction;

impl Function for SumToFunction {
    type State = SumToState;
    const NAME: &'static str = "SumToBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let target = shape_arg(inputs, 1, Self::NAME)?;
        let input_shape = tensor.shape();
        if broadcast_shapes(target, &input_shape)? != input_shape {
            return Err(AutofuncError::BroadcastError {
                shape1: target.to_vec(),
                shape2: input_shape,
            });
        }

        let input_strides = calculate_strides(&input_shape);
        let target_strides = calculate_strides(target);
        let mut values = vec![0.0; target.iter().product()];
        for (i, value) in tensor.to_vec_f64().into_iter().enumerate() {
            let coord = index_to_coord(i, &input_strides, &input_shape);
            values[broadcast_source_index(&coord, target, &target_strides)] += value;
        }

        ctx.state_mut().input_shape = input_shape;
        Ok(vec![Tensor::from_values(
            values,
            target.to_vec(),
            tensor.dtype(),
        )?])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        Ok(vec![Some(grad.expand(&ctx.state().input_shape)?), None])
    }
}

pub fn sum_to_op(tensor: &Tensor, shape: &[usize]) -> Result<Tensor, AutofuncError> {
    apply_single::<SumToFunction>(&[tensor.into(), shape.into()])
}

#[cfg(test)]
#[path = "sum_to_test.rs"]
mod tests;
