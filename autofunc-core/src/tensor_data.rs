use std::sync::Arc;

use crate::autograd::backward_op::Node;
use crate::error::AutofuncError;
use crate::storage::{SharedStorage, Storage};
use crate::tensor::Tensor;
use crate::types::DType;

/// Internal storage and metadata for a Tensor.
///
/// This struct holds the shared element buffer, shape, data type and the
/// autograd-related information. It is wrapped in `Arc<RwLock<TensorData>>` by the
/// `Tensor` struct to allow shared ownership and interior mutability.
#[derive(Debug)]
pub struct TensorData {
    /// Row-major elements, shared with every alias of this tensor.
    pub(crate) storage: SharedStorage,
    /// The data type of the elements.
    pub(crate) dtype: DType,
    /// The shape (dimensions) of the tensor. Always contiguous.
    pub(crate) shape: Vec<usize>,

    /// Flag indicating if the tensor requires gradient computation.
    pub(crate) requires_grad: bool,
    /// Gradient accumulated by `backward()`. Only populated on leaves.
    pub(crate) grad: Option<Tensor>,
    /// The graph node that produced this tensor. Leaf tensors have `grad_fn = None`.
    pub(crate) grad_fn: Option<Arc<Node>>,
    /// Which output of `grad_fn` this tensor is.
    pub(crate) output_nr: usize,
    /// Set on outputs a function declared with `mark_non_differentiable`.
    pub(crate) non_differentiable: bool,
}

impl TensorData {
    /// Creates a new leaf `TensorData`, rounding every value to `dtype`.
    ///
    /// # Errors
    /// Returns `AutofuncError::TensorCreationError` if the length of `values` does not match
    /// the number of elements specified by `shape`.
    pub fn new(values: Vec<f64>, shape: Vec<usize>, dtype: DType) -> Result<Self, AutofuncError> {
        let numel: usize = shape.iter().product();
        if values.len() != numel {
            return Err(AutofuncError::TensorCreationError {
                data_len: values.len(),
                shape,
            });
        }
        let values = if dtype == DType::F64 {
            values
        } else {
            values.into_iter().map(|v| dtype.round(v)).collect()
        };
        Ok(TensorData {
            storage: Storage::shared(values),
            dtype,
            shape,
            requires_grad: false,
            grad: None,
            grad_fn: None,
            output_nr: 0,
            non_differentiable: false,
        })
    }

    /// A history-free alias sharing the same storage and version counter.
    pub(crate) fn alias(&self) -> Self {
        TensorData {
            storage: Arc::clone(&self.storage),
            dtype: self.dtype,
            shape: self.shape.clone(),
            requires_grad: false,
            grad: None,
            grad_fn: None,
            output_nr: 0,
            non_differentiable: false,
        }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn version(&self) -> u64 {
        self.storage.read().expect("RwLock poisoned").version
    }
}
