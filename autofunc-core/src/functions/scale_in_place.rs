use crate::autograd::{scalar_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::single_output;
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct ScaleInPlaceState {
    factor: f64,
}

/// Multiplies its input by a constant in place and returns it.
///
/// The input is marked dirty, so the caller's tensor is rebased onto this node and
/// later gradients flow through the scaling. Applying it to a leaf that requires grad
/// fails with `InplaceOnLeaf`.
#[derive(Debug)]
pub struct ScaleInPlace;

impl Function for ScaleInPlace {
    type State = ScaleInPlaceState;
    const NAME: &'static str = "ScaleInPlaceBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let factor = scalar_arg(inputs, 1, Self::NAME)?;
        tensor.mul_scalar_(factor)?;
        ctx.mark_dirty(tensor);
        ctx.state_mut().factor = factor;
        Ok(vec![tensor.clone()])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = grad_outputs[0].as_ref().ok_or_else(|| {
            AutofuncError::InternalError("scale_in_place received no gradient".to_string())
        })?;
        Ok(vec![Some(grad.mul_scalar(ctx.state().factor)?), None])
    }
}

/// Applies [`ScaleInPlace`]. The returned handle is `tensor` itself.
pub fn scale_in_place(tensor: &Tensor, factor: f64) -> Result<Tensor, AutofuncError> {
    single_output(
        ScaleInPlace::apply(&[tensor.into(), factor.into()])?,
        ScaleInPlace::NAME,
    )
}

#[cfg(test)]
#[path = "scale_in_place_test.rs"]
mod tests;
