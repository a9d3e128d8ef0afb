use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, materialized_grad};
use crate::tensor::Tensor;

/// Transpose of a 2-D tensor. Tensors are always contiguous, so this copies.
#[derive(Debug)]
pub struct TransposeFunction;

impl Function for TransposeFunction {
    type State = ();
    const NAME: &'static str = "TransposeBackward";

    fn forward(
        _ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let tensor = tensor_arg(inputs, 0, Self::NAME)?;
        let shape = tensor.shape();
        if shape.len() != 2 {
            return Err(AutofuncError::RankMismatch {
                expected: 2,
                actual: shape.len(),
                operation: "t".to_string(),
            });
        }
        let (rows, cols) = (shape[0], shape[1]);
        let values = tensor.to_vec_f64();
        let transposed = (0..rows * cols)
            .map(|i| {
                let (c, r) = (i / rows, i % rows);
                values[r * cols + c]
            })
            .collect();
        Ok(vec![Tensor::from_values(
            transposed,
            vec![cols, rows],
            tensor.dtype(),
        )?])
    }

    fn backward(
        _ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        Ok(vec![Some(grad.t()?)])
    }
}

pub fn transpose_op(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<TransposeFunction>(&[tensor.into()])
}
