use crate::error::AutofuncError;
use crate::ops::arithmetic::{add_op, mul_op, mul_scalar_op, neg_op, sub_op};
use crate::ops::linalg::{matmul_op, transpose_op};
use crate::ops::reduction::{expand_op, sum_op, sum_to_op};
use crate::tensor::Tensor;

impl Tensor {
    /// Element-wise `self + other` with broadcasting.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, AutofuncError> {
        add_op(self, other)
    }

    /// Element-wise `self - other` with broadcasting.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, AutofuncError> {
        sub_op(self, other)
    }

    /// Element-wise `self * other` with broadcasting.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, AutofuncError> {
        mul_op(self, other)
    }

    pub fn neg(&self) -> Result<Tensor, AutofuncError> {
        neg_op(self)
    }

    pub fn mul_scalar(&self, scalar: f64) -> Result<Tensor, AutofuncError> {
        mul_scalar_op(self, scalar)
    }

    /// Matrix product of two 2-D tensors.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, AutofuncError> {
        matmul_op(self, other)
    }

    /// Transpose of a 2-D tensor.
    pub fn t(&self) -> Result<Tensor, AutofuncError> {
        transpose_op(self)
    }

    /// Sum of all elements as a zero-dimensional tensor.
    pub fn sum(&self) -> Result<Tensor, AutofuncError> {
        sum_op(self)
    }

    /// Sums down to `shape`, which must broadcast to this tensor's shape. Returns the
    /// tensor itself when the shapes already match.
    pub fn sum_to(&self, shape: &[usize]) -> Result<Tensor, AutofuncError> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        sum_to_op(self, shape)
    }

    /// Broadcasts to `shape`. Returns the tensor itself when the shapes already match.
    pub fn expand(&self, shape: &[usize]) -> Result<Tensor, AutofuncError> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        expand_op(self, shape)
    }

    /// Element-wise exponential, through [`Exp`](crate::functions::Exp).
    pub fn exp(&self) -> Result<Tensor, AutofuncError> {
        crate::functions::exp(self)
    }
}
