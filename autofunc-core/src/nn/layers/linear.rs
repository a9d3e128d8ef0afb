use crate::error::AutofuncError;
use crate::functions::linear;
use crate::nn::module::Module;
use crate::nn::parameter::Parameter;
use crate::tensor::{uniform_f64_with_rng, Tensor};
use log::debug;
use rand::Rng;

/// Half-width of the uniform range the weights and bias are drawn from.
const INIT_BOUND: f64 = 0.1;

/// Applies a linear transformation to the incoming data: `y = x·Wᵀ + b`, through
/// [`LinearFunction`](crate::functions::LinearFunction).
///
/// Parameters are `F64` and initialised uniformly in `[-0.1, 0.1)`.
#[derive(Debug)]
pub struct Linear {
    weight: Parameter,
    bias: Option<Parameter>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Creates a new Linear layer with parameters drawn from the thread-local generator.
    ///
    /// * `in_features` - Size of each input sample.
    /// * `out_features` - Size of each output sample.
    /// * `has_bias` - If `true`, the layer will learn an additive bias.
    pub fn new(
        in_features: usize,
        out_features: usize,
        has_bias: bool,
    ) -> Result<Self, AutofuncError> {
        Self::new_with_rng(in_features, out_features, has_bias, &mut rand::thread_rng())
    }

    /// Same as [`new`](Self::new), drawing parameters from `rng`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        has_bias: bool,
        rng: &mut R,
    ) -> Result<Self, AutofuncError> {
        let weight =
            uniform_f64_with_rng(&[out_features, in_features], -INIT_BOUND, INIT_BOUND, rng)?;
        let weight = Parameter::new(weight, Some("weight".to_string()))?;
        let bias = if has_bias {
            let bias = uniform_f64_with_rng(&[out_features], -INIT_BOUND, INIT_BOUND, rng)?;
            Some(Parameter::new(bias, Some("bias".to_string()))?)
        } else {
            None
        };
        debug!(
            "Linear layer created: in_features={}, out_features={}, bias={}",
            in_features, out_features, has_bias
        );
        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Module for Linear {
    /// `input` has shape `[batch, in_features]`; the result `[batch, out_features]`.
    fn forward(&self, input: &Tensor) -> Result<Tensor, AutofuncError> {
        let features = input.shape().last().copied().unwrap_or(0);
        if input.rank() != 2 || features != self.in_features {
            return Err(AutofuncError::ShapeMismatch {
                expected: vec![input.shape().first().copied().unwrap_or(0), self.in_features],
                actual: input.shape(),
                operation: "Linear::forward".to_string(),
            });
        }
        linear(input, &self.weight, self.bias.as_deref())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = vec![&self.weight];
        if let Some(bias) = &self.bias {
            params.push(bias);
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Parameter)> {
        let mut params = vec![("weight".to_string(), &self.weight)];
        if let Some(bias) = &self.bias {
            params.push(("bias".to_string(), bias));
        }
        params
    }
}

#[cfg(test)]
#[path = "linear_test.rs"]
mod tests;
