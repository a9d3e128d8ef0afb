// src/tensor/mod.rs

use crate::error::AutofuncError;
use crate::storage::SharedStorage;
use crate::tensor_data::TensorData;
use crate::types::DType;
use std::sync::{Arc, RwLock};

mod autograd_methods;
mod debug;
mod inplace_methods;
mod op_methods;

pub mod create;
pub mod utils;

pub use create::{
    full, full_f64, ones, ones_f64, ones_like, rand, rand_f64, randn, randn_f64,
    randn_f64_with_rng, scalar_f64, uniform_f64_with_rng, zeros, zeros_f64, zeros_like,
};

/// Represents a multi-dimensional array (tensor).
///
/// `Tensor` uses `Arc<RwLock<TensorData>>` internally to allow for:
/// 1.  **Shared Ownership:** cloning a `Tensor` is cheap and yields a handle to the
///     same node in the computation graph.
/// 2.  **Interior Mutability:** autograd metadata (`requires_grad`, `grad`, `grad_fn`)
///     can be modified through a shared reference.
///
/// Elements are stored contiguously in row-major order as `f64`; the `DType` decides
/// the precision they are rounded to.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Arc<RwLock<TensorData>>,
}

impl Tensor {
    /// Creates a new F32 Tensor with the given data and shape on the CPU.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, AutofuncError> {
        let values = data_vec.into_iter().map(f64::from).collect();
        Self::from_values(values, shape, DType::F32)
    }

    /// Creates a new F64 Tensor with the given data and shape.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, AutofuncError> {
        Self::from_values(data_vec, shape, DType::F64)
    }

    /// Creates a new I64 Tensor with the given data and shape.
    pub fn new_i64(data_vec: Vec<i64>, shape: Vec<usize>) -> Result<Self, AutofuncError> {
        let values = data_vec.into_iter().map(|v| v as f64).collect();
        Self::from_values(values, shape, DType::I64)
    }

    pub(crate) fn from_values(
        values: Vec<f64>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Self, AutofuncError> {
        Ok(Self::from_data(TensorData::new(values, shape, dtype)?))
    }

    pub(crate) fn from_data(tensor_data: TensorData) -> Self {
        Tensor {
            data: Arc::new(RwLock::new(tensor_data)),
        }
    }

    /// Returns the data type (`DType`) of the tensor elements.
    pub fn dtype(&self) -> DType {
        self.read_data().dtype
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.read_data().shape.clone()
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.read_data().shape.len()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.read_data().numel()
    }

    /// Acquires a read lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn read_data(&self) -> std::sync::RwLockReadGuard<'_, TensorData> {
        self.data.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, TensorData> {
        self.data.write().expect("RwLock poisoned")
    }

    pub(crate) fn storage(&self) -> SharedStorage {
        Arc::clone(&self.read_data().storage)
    }

    /// Copies the elements out as `f64`.
    pub fn to_vec_f64(&self) -> Vec<f64> {
        let storage = self.storage();
        let guard = storage.read().expect("RwLock poisoned");
        guard.values.clone()
    }

    /// Copies the elements out as `f32`.
    pub fn to_vec_f32(&self) -> Vec<f32> {
        self.to_vec_f64().into_iter().map(|v| v as f32).collect()
    }

    /// Returns the single element of a one-element tensor.
    pub fn item(&self) -> Result<f64, AutofuncError> {
        let values = self.to_vec_f64();
        match values.as_slice() {
            [value] => Ok(*value),
            _ => Err(AutofuncError::ShapeMismatch {
                expected: vec![],
                actual: self.shape(),
                operation: "item".to_string(),
            }),
        }
    }

    /// Number of in-place writes made to the underlying storage.
    pub fn version(&self) -> u64 {
        self.read_data().version()
    }

    /// Whether both handles refer to the same tensor (not merely equal data).
    pub fn is_same(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Whether both tensors read and write the same buffer.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.read_data().storage, &other.read_data().storage)
    }

    /// A new leaf with the same elements in its own storage.
    pub(crate) fn deep_copy(&self) -> Result<Tensor, AutofuncError> {
        Tensor::from_values(self.to_vec_f64(), self.shape(), self.dtype())
    }

    /// A new tensor handle over the same storage, with no autograd history.
    pub(crate) fn alias(&self) -> Tensor {
        Tensor::from_data(self.read_data().alias())
    }
}

#[cfg(test)]
#[path = "tensor_test.rs"]
mod tests;
