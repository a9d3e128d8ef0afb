use crate::error::AutofuncError;
use crate::tensor::Tensor;
use std::fmt;
use std::ops::Deref;

/// A wrapper around a Tensor indicating it is a learnable parameter of a Module.
/// Parameters always have `requires_grad` set to `true`.
#[derive(Clone)]
pub struct Parameter {
    tensor: Tensor,
    name: Option<String>,
}

impl Parameter {
    /// Wraps a leaf tensor, enabling gradient tracking on it.
    ///
    /// # Errors
    /// `RequiresGradOnNonLeaf` if the tensor has history, `NonFloatRequiresGrad` if it is
    /// not floating point.
    pub fn new(tensor: Tensor, name: Option<String>) -> Result<Self, AutofuncError> {
        tensor.requires_grad_(true)?;
        Ok(Parameter { tensor, name })
    }

    pub fn new_unnamed(tensor: Tensor) -> Result<Self, AutofuncError> {
        Self::new(tensor, None)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Consumes the Parameter and returns the underlying Tensor.
    pub fn into_inner(self) -> Tensor {
        self.tensor
    }
}

impl Deref for Parameter {
    type Target = Tensor;

    fn deref(&self) -> &Self::Target {
        &self.tensor
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Parameter({}: {:?})", name, self.tensor),
            None => write!(f, "Parameter({:?})", self.tensor),
        }
    }
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
