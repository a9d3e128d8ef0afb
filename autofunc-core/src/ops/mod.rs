//! # Built-in differentiable primitives
//!
//! Every primitive here is a [`Function`](crate::autograd::Function) with a fixed forward
//! and backward, applied through the same `apply` as user-defined functions. Each has a
//! `xxx_op` entry point, called by the corresponding `Tensor` method.
//!
//! Backward formulas are written with these same tracked primitives, so gradients can be
//! differentiated again when the backward pass runs with `create_graph`.
//!
//! - [`arithmetic`]: element-wise add, sub, mul (with broadcasting), neg, scalar multiply.
//! - [`linalg`]: 2-D matmul and transpose.
//! - [`reduction`]: full sum, `sum_to` and its adjoint `expand`.

pub mod arithmetic;
pub mod linalg;
pub mod reduction;

use crate::autograd::Input;
use crate::error::AutofuncError;
use crate::tensor::utils::{
    broadcast_shapes, broadcast_source_index, calculate_strides, index_to_coord,
};
use crate::tensor::Tensor;
use crate::types::DType;

/// Fails unless `tensor` holds floating point values.
pub(crate) fn check_float(tensor: &Tensor, operation: &str) -> Result<DType, AutofuncError> {
    let dtype = tensor.dtype();
    if dtype.is_floating_point() {
        Ok(dtype)
    } else {
        Err(AutofuncError::DataTypeMismatch {
            expected: DType::F64,
            actual: dtype,
            operation: operation.to_string(),
        })
    }
}

/// Unwraps the single result of a one-output function.
pub(crate) fn single_output(
    outputs: Vec<Tensor>,
    op: &'static str,
) -> Result<Tensor, AutofuncError> {
    let count = outputs.len();
    let mut outputs = outputs.into_iter();
    match (outputs.next(), outputs.next()) {
        (Some(output), None) => Ok(output),
        _ => Err(AutofuncError::InternalError(format!(
            "{} produced {} outputs, expected 1",
            op, count
        ))),
    }
}

/// Applies a one-output function to tensor arguments.
pub(crate) fn apply_single<F: crate::autograd::Function>(
    inputs: &[Input],
) -> Result<Tensor, AutofuncError> {
    single_output(F::apply(inputs)?, F::NAME)
}

/// Element-wise unary kernel. The result has the same shape and dtype.
pub(crate) fn map_unary<F>(tensor: &Tensor, f: F) -> Result<Tensor, AutofuncError>
where
    F: Fn(f64) -> f64,
{
    let values = tensor.to_vec_f64().into_iter().map(f).collect();
    Tensor::from_values(values, tensor.shape(), tensor.dtype())
}

/// Element-wise binary kernel with numpy-style broadcasting.
pub(crate) fn broadcast_binary<F>(
    a: &Tensor,
    b: &Tensor,
    operation: &str,
    f: F,
) -> Result<Tensor, AutofuncError>
where
    F: Fn(f64, f64) -> f64,
{
    let dtype = check_float(a, operation)?.promote(check_float(b, operation)?);
    let a_shape = a.shape();
    let b_shape = b.shape();
    let out_shape = broadcast_shapes(&a_shape, &b_shape)?;
    let a_values = a.to_vec_f64();
    let b_values = b.to_vec_f64();

    let values = if a_shape == b_shape {
        a_values.iter().zip(&b_values).map(|(&x, &y)| f(x, y)).collect()
    } else {
        let out_strides = calculate_strides(&out_shape);
        let a_strides = calculate_strides(&a_shape);
        let b_strides = calculate_strides(&b_shape);
        let numel: usize = out_shape.iter().product();
        (0..numel)
            .map(|i| {
                let coord = index_to_coord(i, &out_strides, &out_shape);
                let x = a_values[broadcast_source_index(&coord, &a_shape, &a_strides)];
                let y = b_values[broadcast_source_index(&coord, &b_shape, &b_strides)];
                f(x, y)
            })
            .collect()
    };
    Tensor::from_values(values, out_shape, dtype)
}

/// The gradient of output `index`, which materialization guarantees is present.
pub(crate) fn materialized_grad<'a>(
    grad_outputs: &'a [Option<Tensor>],
    index: usize,
    op: &'static str,
) -> Result<&'a Tensor, AutofuncError> {
    grad_outputs
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| {
            AutofuncError::InternalError(format!(
                "{} received no gradient for output {}",
                op, index
            ))
        })
}
