use crate::autograd::{optional_tensor_arg, tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::single_output;
use crate::tensor::Tensor;

/// `output = input · weightᵀ + bias`, with `input: [batch, in]`, `weight: [out, in]` and
/// an optional `bias: [out]` broadcast over the rows.
///
/// Forward runs untracked, so the tracked ops used inside it record nothing. Backward
/// only computes the gradients that `needs_input_grad` asks for and returns `None` for
/// the rest, including an absent bias.
#[derive(Debug)]
pub struct LinearFunction;

impl Function for LinearFunction {
    type State = ();
    const NAME: &'static str = "LinearFunctionBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let input = tensor_arg(inputs, 0, Self::NAME)?;
        let weight = tensor_arg(inputs, 1, Self::NAME)?;
        let bias = optional_tensor_arg(inputs, 2, Self::NAME)?;

        let mut output = input.matmul(&weight.t()?)?;
        if let Some(bias) = bias {
            output = output.add(&bias.expand(&output.shape())?)?;
        }

        ctx.save_for_backward([Some(input.clone()), Some(weight.clone()), bias.cloned()]);
        Ok(vec![output])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let saved = ctx.saved_tensors()?;
        let (Some(input), Some(weight)) = (&saved[0], &saved[1]) else {
            return Err(AutofuncError::InternalError(
                "linear backward is missing its saved input or weight".to_string(),
            ));
        };
        let bias = saved.get(2).and_then(Option::as_ref);
        let grad_output = grad_outputs[0].as_ref().ok_or_else(|| {
            AutofuncError::InternalError("linear backward received no gradient".to_string())
        })?;

        let mut grad_input = None;
        let mut grad_weight = None;
        let mut grad_bias = None;

        if ctx.needs_input_grad(0) {
            grad_input = Some(grad_output.matmul(weight)?);
        }
        if ctx.needs_input_grad(1) {
            grad_weight = Some(grad_output.t()?.matmul(input)?);
        }
        if let Some(bias) = bias {
            if ctx.needs_input_grad(2) {
                grad_bias = Some(grad_output.sum_to(&bias.shape())?);
            }
        }

        Ok(vec![grad_input, grad_weight, grad_bias])
    }
}

/// Applies [`LinearFunction`].
pub fn linear(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
) -> Result<Tensor, AutofuncError> {
    let outputs = LinearFunction::apply(&[input.into(), weight.into(), bias.into()])?;
    single_output(outputs, LinearFunction::NAME)
}

#[cfg(test)]
#[path = "linear_test.rs"]
mod tests;
