use crate::error::AutofuncError;
use crate::nn::Parameter;
use crate::tensor::Tensor;

/// The base trait for neural network modules.
pub trait Module: std::fmt::Debug {
    /// Performs a forward pass of the module.
    fn forward(&self, input: &Tensor) -> Result<Tensor, AutofuncError>;

    /// All learnable parameters of the module, including those of sub-modules.
    fn parameters(&self) -> Vec<&Parameter>;

    /// Parameters with unique, hierarchical names (e.g. `"fc1.weight"`).
    fn named_parameters(&self) -> Vec<(String, &Parameter)>;

    /// Direct child modules. Leaf modules have none.
    fn children(&self) -> Vec<&dyn Module> {
        Vec::new()
    }

    /// Clears the gradient of every parameter.
    fn zero_grad(&self) {
        for param in self.parameters() {
            param.zero_grad();
        }
    }
}
