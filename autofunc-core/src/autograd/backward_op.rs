use crate::error::AutofuncError;
use crate::tensor::Tensor;
use crate::types::DType;
use log::trace;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Defines the interface for the backward pass of a graph node.
///
/// Every [`Function`](super::Function) applied with at least one input requiring grad is
/// recorded as a [`Node`] owning a type-erased `BackwardOp`, which holds the function's
/// context (saved tensors, typed state, flags). User code implements `Function`, not
/// this trait.
pub trait BackwardOp: Debug + Send + Sync {
    /// Type tag of the node, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Computes one gradient per forward input from one gradient per forward output.
    ///
    /// `node` is the graph node owning this op, needed to restore saved outputs with
    /// their history.
    fn backward(
        &self,
        node: &Arc<Node>,
        grad_outputs: Vec<Option<Tensor>>,
    ) -> Result<Vec<Option<Tensor>>, AutofuncError>;

    /// Drops saved tensors once the graph is not retained.
    fn release_saved_tensors(&self);
}

/// Shape and dtype of a tensor flowing in or out of a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TensorMeta {
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DType,
}

impl TensorMeta {
    pub(crate) fn of(tensor: &Tensor) -> Self {
        let guard = tensor.read_data();
        TensorMeta {
            shape: guard.shape.clone(),
            dtype: guard.dtype,
        }
    }
}

/// Where the gradient of one forward input goes.
#[derive(Debug, Clone)]
pub(crate) enum Edge {
    /// Into output slot `output_nr` of the node that produced the input.
    Node { node: Arc<Node>, output_nr: usize },
    /// Into the `.grad` of a leaf tensor.
    Leaf(Tensor),
}

impl Edge {
    /// The edge for a tensor requiring grad: its producer, or itself if it is a leaf.
    pub(crate) fn for_tensor(tensor: &Tensor) -> Self {
        let guard = tensor.read_data();
        match guard.grad_fn.as_ref() {
            Some(node) => Edge::Node {
                node: Arc::clone(node),
                output_nr: guard.output_nr,
            },
            None => {
                drop(guard);
                Edge::Leaf(tensor.clone())
            }
        }
    }
}

/// One operation record in the computation graph.
pub struct Node {
    pub(crate) op: Box<dyn BackwardOp>,
    /// One entry per forward input; `None` where no gradient is needed.
    pub(crate) next_edges: Vec<Option<Edge>>,
    /// One entry per forward input; `None` for non-tensor inputs.
    pub(crate) input_meta: Vec<Option<TensorMeta>>,
    pub(crate) output_meta: Vec<TensorMeta>,
}

impl Node {
    pub fn name(&self) -> &'static str {
        self.op.name()
    }

    pub fn num_inputs(&self) -> usize {
        self.next_edges.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.output_meta.len()
    }

    /// Type tags of the nodes this one sends gradients to (`None` for leaves and
    /// inputs that need no gradient).
    pub fn next_functions(&self) -> Vec<Option<&'static str>> {
        self.next_edges
            .iter()
            .map(|edge| match edge {
                Some(Edge::Node { node, .. }) => Some(node.name()),
                Some(Edge::Leaf(_)) => Some("AccumulateGrad"),
                None => None,
            })
            .collect()
    }

    /// Runs the op's backward and enforces the gradient-tuple contract.
    pub(crate) fn apply(
        self: &Arc<Self>,
        grad_outputs: Vec<Option<Tensor>>,
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let op_name = self.name();
        trace!("Running backward of {}", op_name);

        let watched: Vec<Option<(Tensor, u64)>> = grad_outputs
            .iter()
            .map(|g| g.as_ref().map(|t| (t.clone(), t.version())))
            .collect();

        let mut grads = self.op.backward(self, grad_outputs)?;

        for (output_index, entry) in watched.iter().enumerate() {
            if let Some((grad, version)) = entry {
                if grad.version() != *version {
                    return Err(AutofuncError::GradientModifiedInPlace {
                        op: op_name,
                        output_index,
                    });
                }
            }
        }

        let expected = self.num_inputs();
        if grads.len() > expected && grads[expected..].iter().all(Option::is_none) {
            grads.truncate(expected);
        }
        if grads.len() != expected {
            return Err(AutofuncError::GradientCountMismatch {
                op: op_name,
                expected,
                actual: grads.len(),
            });
        }

        for (input_index, (grad, meta)) in grads.iter().zip(&self.input_meta).enumerate() {
            match (grad, meta) {
                (Some(_), None) => {
                    return Err(AutofuncError::NonTensorGradient {
                        op: op_name,
                        input_index,
                    })
                }
                (Some(grad), Some(meta)) => {
                    let actual = grad.shape();
                    if actual != meta.shape {
                        return Err(AutofuncError::GradientShapeMismatch {
                            op: op_name,
                            input_index,
                            expected: meta.shape.clone(),
                            actual,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(grads)
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("next_functions", &self.next_functions())
            .finish()
    }
}
