use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::check_float;
use crate::tensor::Tensor;
use crate::types::DType;

/// The permutation applied by forward: `values[i] = input[permutation[i]]`.
#[derive(Debug, Default)]
pub struct SortState {
    permutation: Vec<usize>,
}

/// Ascending sort of a 1-D tensor, returning `(values, indices)`.
///
/// The indices are an `I64` tensor marked non-differentiable. Backward scatters the
/// gradient of the values back through the permutation with a raw kernel rather than
/// tracked ops, so it is declared once-differentiable.
#[derive(Debug)]
pub struct Sort;

impl Function for Sort {
    type State = SortState;
    const NAME: &'static str = "SortBackward";
    const ONCE_DIFFERENTIABLE: bool = true;

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        check_float(tensor, "sort")?;
        if tensor.rank() != 1 {
            return Err(AutofuncError::RankMismatch {
                expected: 1,
                actual: tensor.rank(),
                operation: "sort".to_string(),
            });
        }
        let source = tensor.to_vec_f64();
        let mut permutation: Vec<usize> = (0..source.len()).collect();
        permutation.sort_by(|&a, &b| source[a].total_cmp(&source[b]));

        let n = source.len();
        let values = Tensor::from_values(
            permutation.iter().map(|&i| source[i]).collect(),
            vec![n],
            tensor.dtype(),
        )?;
        let indices = Tensor::from_values(
            permutation.iter().map(|&i| i as f64).collect(),
            vec![n],
            DType::I64,
        )?;

        ctx.mark_non_differentiable(&indices);
        ctx.state_mut().permutation = permutation;
        Ok(vec![values, indices])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let Some(grad) = grad_outputs.first().and_then(Option::as_ref) else {
            return Ok(vec![None]);
        };
        let permutation = &ctx.state().permutation;
        let grad_values = grad.to_vec_f64();
        let mut scattered = vec![0.0; permutation.len()];
        for (&source, &g) in permutation.iter().zip(&grad_values) {
            scattered[source] = g;
        }
        Ok(vec![Some(Tensor::from_values(
            scattered,
            vec![permutation.len()],
            grad.dtype(),
        )?)])
    }
}

/// Applies [`Sort`], returning `(values, indices)`.
pub fn sort(tensor: &Tensor) -> Result<(Tensor, Tensor), AutofuncError> {
    let mut outputs = Sort::apply(&[tensor.into()])?.into_iter();
    match (outputs.next(), outputs.next()) {
        (Some(values), Some(indices)) => Ok((values, indices)),
        _ => Err(AutofuncError::InternalError(
            "sort must produce values and indices".to_string(),
        )),
    }
}

#[cfg(test)]
#[path = "sort_test.rs"]
mod tests;
