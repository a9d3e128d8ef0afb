use crate::autograd::{shape_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, materialized_grad};
use crate::tensor::utils::{
    broadcast_shapes, broadcast_source_index, calculate_strides, index_to_coord,
};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct ExpandState {
    input_shape: Vec<usize>,
}

/// Broadcasts a tensor to a larger shape, materializing the repeated elements.
#[derive(Debug)]
pub struct ExpandFunction;

impl Function for ExpandFunction {
    type State = ExpandState;
    const NAME: &'static str = "ExpandBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let target = shape_arg(inputs, 1, Self::NAME)?;
        let input_shape = tensor.shape();
        if broadcast_shapes(&input_shape, target)? != target {
            return Err(AutofuncError::BroadcastError {
                shape1: input_shape,
                shape2: target.to_vec(),
            });
        }

        let input_strides = calculate_strides(&input_shape);
        let target_strides = calculate_strides(target);
        let source = tensor.to_vec_f64();
        let values = (0..target.iter().product::<usize>())
            .map(|i| {
                let coord = index_to_coord(i, &target_strides, target);
                source[broadcast_source_index(&coord, &input_shape, &input_strides)]
            })
            .collect();

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
        Ok(vec![Some(grad.sum_to(&ctx.state().input_shape)?), None])
    }
}

pub fn expand_op(tensor: &Tensor, shape: &[usize]) -> Result<Tensor, AutofuncError> {
    apply_single::<ExpandFunction>(&[tensor.into(), shape.into()])
}

#[cfg(test)]
#[path = "expand_test.rs"]
mod tests;
