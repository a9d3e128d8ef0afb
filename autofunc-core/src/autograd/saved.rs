use crate::autograd::backward_op::Node;
use crate::error::AutofuncError;
use crate::tensor::Tensor;
use std::sync::Arc;

/// A tensor retained across the forward/backward boundary by `save_for_backward`.
///
/// Every variant remembers the storage version at save time; unpacking after an
/// in-place write fails instead of handing backward stale data.
#[derive(Debug, Clone)]
pub(crate) enum SavedTensor {
    /// A forward input, restored as the caller's tensor with its history.
    Input { tensor: Tensor, version: u64 },
    /// One of the node's own outputs. Holding the output itself would form a cycle
    /// through its `grad_fn`, so only a history-free alias is kept and the history is
    /// reattached on unpack.
    Output {
        data: Tensor,
        output_nr: usize,
        differentiable: bool,
        version: u64,
    },
    /// A tensor created inside forward.
    Intermediate { tensor: Tensor, version: u64 },
}

impl SavedTensor {
    fn version(&self) -> u64 {
        match self {
            SavedTensor::Input { version, .. }
            | SavedTensor::Output { version, .. }
            | SavedTensor::Intermediate { version, .. } => *version,
        }
    }

    fn current_version(&self) -> u64 {
        match self {
            SavedTensor::Input { tensor, .. } | SavedTensor::Intermediate { tensor, .. } => {
                tensor.version()
            }
            SavedTensor::Output { data, .. } => data.version(),
        }
    }

    pub(crate) fn unpack(
        &self,
        node: &Arc<Node>,
        index: usize,
    ) -> Result<Tensor, AutofuncError> {
        let current_version = self.current_version();
        if current_version != self.version() {
            return Err(AutofuncError::SavedTensorModified {
                op: node.name(),
                index,
                saved_version: self.version(),
                current_version,
            });
        }
        Ok(match self {
            SavedTensor::Input { tensor, .. } | SavedTensor::Intermediate { tensor, .. } => {
                tensor.clone()
            }
            SavedTensor::Output {
                data,
                output_nr,
                differentiable,
                ..
            } => {
                let restored = data.alias();
                if *differentiable {
                    let mut guard = restored.write_data();
                    guard.grad_fn = Some(Arc::clone(node));
                    guard.output_nr = *output_nr;
                    guard.requires_grad = true;
                }
                restored
            }
        })
    }
}

/// Saved tensors of one node, until the graph is freed.
#[derive(Debug)]
pub(crate) enum SavedState {
    Live(Vec<Option<SavedTensor>>),
    Freed,
}
