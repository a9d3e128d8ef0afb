use crate::autograd::graph::{run_backward, BackwardOptions};
use crate::autograd::Node;
use crate::error::AutofuncError;
use crate::tensor::Tensor;
use std::sync::Arc;

impl Tensor {
    /// Checks if this tensor requires gradient computation.
    pub fn requires_grad(&self) -> bool {
        self.read_data().requires_grad
    }

    /// Sets the `requires_grad` flag of a leaf tensor.
    ///
    /// # Errors
    /// `RequiresGradOnNonLeaf` on a tensor produced by a recorded function, and
    /// `NonFloatRequiresGrad` when enabling it on an integral or boolean tensor.
    pub fn requires_grad_(&self, requires_grad: bool) -> Result<(), AutofuncError> {
        let mut guard = self.write_data();
        if guard.grad_fn.is_some() {
            return Err(AutofuncError::RequiresGradOnNonLeaf);
        }
        if requires_grad && !guard.dtype.is_floating_point() {
            return Err(AutofuncError::NonFloatRequiresGrad(guard.dtype));
        }
        guard.requires_grad = requires_grad;
        Ok(())
    }

    /// Builder form of [`requires_grad_`](Self::requires_grad_).
    pub fn with_requires_grad(self, requires_grad: bool) -> Result<Self, AutofuncError> {
        self.requires_grad_(requires_grad)?;
        Ok(self)
    }

    /// A tensor is a leaf if it was not produced by a recorded function.
    pub fn is_leaf(&self) -> bool {
        self.read_data().grad_fn.is_none()
    }

    /// Whether a function declared this tensor non-differentiable when returning it.
    pub fn is_marked_non_differentiable(&self) -> bool {
        self.read_data().non_differentiable
    }

    /// Returns a clone of the gradient tensor, if it exists.
    pub fn grad(&self) -> Option<Tensor> {
        self.read_data().grad.clone()
    }

    /// Clears the accumulated gradient.
    pub fn zero_grad(&self) {
        self.write_data().grad = None;
    }

    /// Type tag of the node that produced this tensor.
    pub fn grad_fn_name(&self) -> Option<&'static str> {
        self.read_data().grad_fn.as_ref().map(|node| node.name())
    }

    /// The node that produced this tensor, if any.
    pub fn grad_fn(&self) -> Option<Arc<Node>> {
        self.read_data().grad_fn.clone()
    }

    /// A new leaf sharing this tensor's storage, with no history.
    ///
    /// In-place writes through either handle are visible to both and bump the shared
    /// version counter.
    pub fn detach(&self) -> Tensor {
        self.alias()
    }

    /// Performs the backward pass starting from this one-element tensor, seeding it
    /// with 1 and freeing the graph afterwards.
    ///
    /// # Errors
    /// `BackwardNonScalar` if the tensor has more than one element,
    /// `RequiresGradNotMet` if it does not require grad, and any error raised while
    /// running a node's backward.
    pub fn backward(&self) -> Result<(), AutofuncError> {
        run_backward(std::slice::from_ref(self), None, BackwardOptions::default())
    }

    /// Performs the backward pass with an explicit initial gradient (required for
    /// tensors with more than one element) and graph options.
    pub fn backward_with(
        &self,
        gradient: Option<Tensor>,
        options: BackwardOptions,
    ) -> Result<(), AutofuncError> {
        run_backward(
            std::slice::from_ref(self),
            gradient.map(|g| vec![g]),
            options,
        )
    }

    /// Accumulates `incoming` into `.grad`, out of place. Without `create_graph` the
    /// stored gradient is a history-free copy owning its own storage.
    pub(crate) fn accumulate_grad(
        &self,
        incoming: Tensor,
        create_graph: bool,
    ) -> Result<(), AutofuncError> {
        let incoming = if create_graph {
            incoming
        } else {
            incoming.deep_copy()?
        };
        let existing = self.write_data().grad.take();
        let accumulated = match existing {
            Some(existing) => existing.add(&incoming)?,
            None => incoming,
        };
        self.write_data().grad = Some(accumulated);
        Ok(())
    }
}

#[cfg(test)]
#[path = "autograd_methods_test.rs"]
mod tests;
