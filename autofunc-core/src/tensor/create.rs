// src/tensor/create.rs

use crate::error::AutofuncError;
use crate::tensor::Tensor;
use crate::types::DType;
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Creates a new tensor filled with zeros with the specified shape.
/// Creates an f32 tensor.
pub fn zeros(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    full(shape, 0.0)
}

/// Creates a new F64 tensor filled with zeros with the specified shape.
pub fn zeros_f64(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    full_f64(shape, 0.0)
}

/// Creates a new tensor filled with ones with the specified shape.
/// Creates an f32 tensor.
pub fn ones(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    full(shape, 1.0)
}

/// Creates a new F64 tensor filled with ones with the specified shape.
pub fn ones_f64(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    full_f64(shape, 1.0)
}

/// Creates a new f32 tensor filled with a specific value.
pub fn full(shape: &[usize], value: f32) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    Tensor::new(vec![value; numel], shape.to_vec())
}

/// Creates a new F64 tensor filled with a specific value.
pub fn full_f64(shape: &[usize], value: f64) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    Tensor::new_f64(vec![value; numel], shape.to_vec())
}

/// Creates a zero-dimensional F64 tensor holding `value`.
pub fn scalar_f64(value: f64) -> Result<Tensor, AutofuncError> {
    Tensor::new_f64(vec![value], vec![])
}

pub(crate) fn full_like_dtype(
    shape: &[usize],
    dtype: DType,
    value: f64,
) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    Tensor::from_values(vec![value; numel], shape.to_vec(), dtype)
}

/// Creates a tensor of zeros with the same shape and DType as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    full_like_dtype(&tensor.shape(), tensor.dtype(), 0.0)
}

/// Creates a tensor of ones with the same shape and DType as `tensor`.
pub fn ones_like(tensor: &Tensor) -> Result<Tensor, AutofuncError> {
    full_like_dtype(&tensor.shape(), tensor.dtype(), 1.0)
}

/// Uniform samples in `[0, 1)`, f32.
pub fn rand(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    let mut rng = rand::thread_rng();
    let data_vec: Vec<f32> = (0..numel).map(|_| rng.gen::<f32>()).collect();
    Tensor::new(data_vec, shape.to_vec())
}

/// Uniform samples in `[0, 1)`, f64.
pub fn rand_f64(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    uniform_f64_with_rng(shape, 0.0, 1.0, &mut rand::thread_rng())
}

/// Standard normal samples, f32.
pub fn randn(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    let mut rng = rand::thread_rng();
    let data_vec: Vec<f32> = (0..numel)
        .map(|_| StandardNormal.sample(&mut rng))
        .collect();
    Tensor::new(data_vec, shape.to_vec())
}

/// Standard normal samples, f64. Gradient checks need this precision.
pub fn randn_f64(shape: &[usize]) -> Result<Tensor, AutofuncError> {
    randn_f64_with_rng(shape, &mut rand::thread_rng())
}

/// Standard normal samples drawn from a caller-supplied generator.
pub fn randn_f64_with_rng<R: Rng + ?Sized>(
    shape: &[usize],
    rng: &mut R,
) -> Result<Tensor, AutofuncError> {
    let numel = shape.iter().product();
    let data_vec: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(&mut *rng)).collect();
    Tensor::new_f64(data_vec, shape.to_vec())
}

/// Samples uniformly in `[low, high)` from a caller-supplied generator.
pub fn uniform_f64_with_rng<R: Rng + ?Sized>(
    shape: &[usize],
    low: f64,
    high: f64,
    rng: &mut R,
) -> Result<Tensor, AutofuncError> {
    if low >= high || !low.is_finite() || !high.is_finite() {
        return Err(AutofuncError::UnsupportedOperation(format!(
            "Invalid uniform range [{}, {})",
            low, high
        )));
    }
    let numel = shape.iter().product();
    let dist = Uniform::new(low, high);
    let data_vec: Vec<f64> = (0..numel).map(|_| dist.sample(&mut *rng)).collect();
    Tensor::new_f64(data_vec, shape.to_vec())
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
