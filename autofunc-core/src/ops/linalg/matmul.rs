// autofunc-core/src/ops/linalg/matmul.rs

use crate::autograd::{tensor_arg, BackwardContext, Context, Function, Input};
use crate::error::AutofuncError;
use crate::ops::{apply_single, check_float, materialized_grad};
use crate::tensor::Tensor;

/// Checks that both operands are matrices with matching inner dimensions and
/// returns `(m, k, n)`.
fn matmul_dims(a: &Tensor, b: &Tensor) -> Result<(usize, usize, usize), AutofuncError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    for shape in [&a_shape, &b_shape] {
        if shape.len() != 2 {
            return Err(AutofuncError::RankMismatch {
                expected: 2,
                actual: shape.len(),
                operation: "matmul".to_string(),
            });
        }
    }
    if a_shape[1] != b_shape[0] {
        return Err(AutofuncError::ShapeMismatch {
            expected: vec![a_shape[1], b_shape[1]],
            actual: b_shape.clone(),
            operation: "matmul (inner dim)".to_string(),
        });
    }
    Ok((a_shape[0], a_shape[1], b_shape[1]))
}

/// 2-D matrix product `a · b`, `[m, k] x [k, n] -> [m, n]`.
#[derive(Debug)]
pub struct MatmulFunction;

impl Function for MatmulFunction {
    type State = ();
    const NAME: &'static str = "MatmulBackward";

    fn forward(
        ctx: &mut Context<Self::State>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let a = tensor_arg(inputs, 0, Self::NAME)?;
        let b = tensor_arg(inputs, 1, Self::NAME)?;
        let dtype = check_float(a, "matmul")?.promote(check_float(b, "matmul")?);
        let (m, k, n) = matmul_dims(a, b)?;

        let a_values = a.to_vec_f64();
        let b_values = b.to_vec_f64();
        let mut values = vec![0.0; m * n];
        for i in 0..m {
            for p in 0..k {
                let a_ip = a_values[i * k + p];
                let b_row = &b_values[p * n..(p + 1) * n];
                for (out, &b_pj) in values[i * n..(i + 1) * n].iter_mut().zip(b_row) {
                    *out += a_ip * b_pj;
                }
            }
        }

        ctx.save_for_backward([Some(a.clone()), Some(b.clone())]);
        Ok(vec![Tensor::from_values(values, vec![m, n], dtype)?])
    }

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad = materialized_grad(grad_outputs, 0, Self::NAME)?;
        let saved = ctx.saved_tensors()?;
        let (Some(a), Some(b)) = (&saved[0], &saved[1]) else {
            return Err(AutofuncError::InternalError(
                "MatmulBackward lost its saved operands".to_string(),
            ));
        };
        // dA = G · Bᵀ, dB = Aᵀ · G
        let grad_a = if ctx.needs_input_grad(0) {
            Some(grad.matmul(&b.t()?)?)
        } else {
            None
        };
        let grad_b = if ctx.needs_input_grad(1) {
            Some(a.t()?.matmul(grad)?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b])
    }
}

/// Matrix multiplication of two 2-D tensors.
///
/// # Errors
/// `RankMismatch` if either operand is not 2-D, `ShapeMismatch` if the inner
/// dimensions differ, `DataTypeMismatch` for non-float operands.
pub fn matmul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, AutofuncError> {
    apply_single::<MatmulFunction>(&[a.into(), b.into()])
}

#[cfg(test)]
#[path = "matmul_test.rs"]
mod tests;
