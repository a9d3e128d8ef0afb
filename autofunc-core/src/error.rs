use crate::types::DType;
use thiserror::Error;

/// Error type for tensor operations and the autograd engine.
///
/// The contract violations a custom [`Function`](crate::autograd::Function) can commit
/// that the engine is able to notice are reported here. Forgetting to save a tensor or to
/// mark an in-place mutation is not one of them: those produce wrong gradients silently and
/// are caught by [`gradcheck`](crate::autograd::grad_check::gradcheck).
#[derive(Error, Debug, PartialEq, Clone)]
pub enum AutofuncError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Rank mismatch for operation {operation}: expected rank {expected}, got {actual}")]
    RankMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Cannot broadcast shapes: {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Data type mismatch for operation {operation}: expected {expected:?}, got {actual:?}")]
    DataTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Only floating point tensors can require gradients, got {0:?}")]
    NonFloatRequiresGrad(DType),

    #[error("Cannot change requires_grad of a non-leaf tensor; use detach() instead")]
    RequiresGradOnNonLeaf,

    #[error("Tensor does not require grad and has no grad_fn")]
    RequiresGradNotMet,

    #[error("Backward called on non-scalar tensor without explicit gradient.")]
    BackwardNonScalar,

    #[error("Function {op} returned {actual} gradients, but expected {expected}")]
    GradientCountMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Function {op} returned a gradient of shape {actual:?} for input {input_index}, expected {expected:?}")]
    GradientShapeMismatch {
        op: &'static str,
        input_index: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Function {op} returned a gradient for input {input_index}, which is not a tensor")]
    NonTensorGradient { op: &'static str, input_index: usize },

    #[error("Function {op} modified the gradient of output {output_index} in place")]
    GradientModifiedInPlace { op: &'static str, output_index: usize },

    #[error("Saved tensor {index} of {op} was modified by an in-place operation: saved at version {saved_version}, now at version {current_version}")]
    SavedTensorModified {
        op: &'static str,
        index: usize,
        saved_version: u64,
        current_version: u64,
    },

    #[error("Trying to backward through {op} a second time after its saved tensors were freed; retain the graph on the first backward")]
    SavedTensorsFreed { op: &'static str },

    #[error("Function {op} is marked once-differentiable; it cannot be differentiated twice")]
    DoubleBackwardUnsupported { op: &'static str },

    #[error("Function {op} marked input {input_index} dirty, but it is a leaf that requires grad")]
    InplaceOnLeaf { op: &'static str, input_index: usize },

    #[error("Function {op} marked a tensor dirty but did not return it as an output")]
    DirtyTensorNotReturned { op: &'static str },

    #[error("In-place operation {operation} on a tensor that requires grad while grad mode is enabled")]
    InplaceOnTrackedTensor { operation: String },

    #[error("Input {input_index} passed to grad() was not used to compute the outputs")]
    UnusedInput { input_index: usize },

    #[error("Invalid input for {op}: {message}")]
    InvalidInput { op: &'static str, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
