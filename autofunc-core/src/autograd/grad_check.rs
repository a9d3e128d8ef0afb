//! Numerical verification of analytical gradients.
//!
//! A backward written by hand is only as good as its agreement with the function it
//! differentiates. [`gradcheck`] compares the Jacobian assembled from backward passes
//! with one estimated by central differences, element by element:
//!
//! `|analytical - numerical| <= atol + rtol * |numerical|`
//!
//! A floating point output that carries no graph has an analytical Jacobian of zero, so
//! its numerical Jacobian must be within `atol` of zero. This catches a backward built
//! from raw values, whose results cannot be differentiated again, as well as outputs
//! detached by mistake.
//!
//! Finite differences in single precision are dominated by rounding error, so every
//! input that requires grad must be `F64`.

use crate::autograd::function::Input;
use crate::autograd::graph::{grad, GradOptions};
use crate::error::AutofuncError;
use crate::tensor::create::{randn_f64, zeros_like};
use crate::tensor::Tensor;
use crate::types::DType;
use log::{debug, warn};
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Jacobian mismatch for output {output_index} with respect to input {input_index}: d out[{output_element}] / d in[{input_element}] is {analytical:e} analytically but {numerical:e} numerically (difference {difference:e})")]
    JacobianMismatch {
        input_index: usize,
        output_index: usize,
        input_element: usize,
        output_element: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },

    #[error("Input {input_index} requires grad but is {dtype:?}; gradient checks need F64 inputs")]
    LowPrecisionInput { input_index: usize, dtype: DType },

    #[error("Gradient check needs at least one tensor input that requires grad")]
    NoDifferentiableInput,

    #[error("Gradient check compared no Jacobian entries: no non-empty floating point output to check")]
    NothingToCompare,

    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(AutofuncError),

    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(AutofuncError),

    #[error("Non-finite {kind} gradient for input {input_index}, element {input_element}, output {output_index}, element {output_element}: {value}")]
    NonFiniteGradient {
        kind: &'static str,
        input_index: usize,
        output_index: usize,
        input_element: usize,
        output_element: usize,
        value: f64,
    },

    #[error("Tensor error during intermediate calculation: {0}")]
    TensorError(AutofuncError),
}

impl From<AutofuncError> for GradCheckError {
    fn from(err: AutofuncError) -> Self {
        GradCheckError::TensorError(err)
    }
}

/// Tolerances and failure policy for [`gradcheck`] and [`gradgradcheck`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckOptions {
    /// Perturbation for the central differences.
    pub eps: f64,
    pub atol: f64,
    pub rtol: f64,
    /// Return the first mismatch as an error; otherwise log it and return `Ok(false)`.
    pub raise_exception: bool,
}

impl Default for GradCheckOptions {
    fn default() -> Self {
        GradCheckOptions {
            eps: 1e-6,
            atol: 1e-5,
            rtol: 1e-3,
            raise_exception: true,
        }
    }
}

/// Jacobian of one output with respect to one input, row-major
/// `[output_element][input_element]`.
struct Jacobian {
    input_numel: usize,
    values: Vec<f64>,
}

impl Jacobian {
    fn zeros(output_numel: usize, input_numel: usize) -> Self {
        Jacobian {
            input_numel,
            values: vec![0.0; output_numel * input_numel],
        }
    }

    fn set(&mut self, output_element: usize, input_element: usize, value: f64) {
        self.values[output_element * self.input_numel + input_element] = value;
    }

    fn get(&self, output_element: usize, input_element: usize) -> f64 {
        self.values[output_element * self.input_numel + input_element]
    }
}

/// Tensor inputs that require grad, with their positions.
fn differentiable_inputs(inputs: &[Input]) -> Result<Vec<(usize, Tensor)>, GradCheckError> {
    let mut found = Vec::new();
    for (input_index, input) in inputs.iter().enumerate() {
        let Some(tensor) = input.as_tensor().filter(|t| t.requires_grad()) else {
            continue;
        };
        let dtype = tensor.dtype();
        if dtype != DType::F64 {
            return Err(GradCheckError::LowPrecisionInput { input_index, dtype });
        }
        found.push((input_index, tensor.clone()));
    }
    if found.is_empty() {
        return Err(GradCheckError::NoDifferentiableInput);
    }
    Ok(found)
}

/// Outputs taking part in the comparison. Integral outputs and outputs marked
/// non-differentiable are skipped; every other output is checked, with or without a graph.
fn checked_outputs(outputs: &[Tensor]) -> Vec<usize> {
    outputs
        .iter()
        .enumerate()
        .filter(|(_, out)| {
            out.dtype().is_floating_point() && !out.is_marked_non_differentiable()
        })
        .map(|(index, _)| index)
        .collect()
}

/// One backward pass per output element, each seeded with a one-hot gradient.
/// Outputs without a graph keep an all-zero Jacobian.
///
/// Returns `jacobians[input][checked output]`.
fn analytical_jacobians(
    outputs: &[Tensor],
    checked: &[usize],
    differentiable: &[(usize, Tensor)],
) -> Result<Vec<Vec<Jacobian>>, GradCheckError> {
    let wrt: Vec<Tensor> = differentiable.iter().map(|(_, t)| t.clone()).collect();
    let mut jacobians: Vec<Vec<Jacobian>> = wrt
        .iter()
        .map(|input| {
            checked
                .iter()
                .map(|&o| Jacobian::zeros(outputs[o].numel(), input.numel()))
                .collect()
        })
        .collect();

    let options = GradOptions {
        retain_graph: Some(true),
        create_graph: false,
        allow_unused: true,
    };
    for (position, &output_index) in checked.iter().enumerate() {
        let output = &outputs[output_index];
        if !output.requires_grad() {
            continue;
        }
        let numel = output.numel();
        for output_element in 0..numel {
            let mut one_hot = vec![0.0; numel];
            one_hot[output_element] = 1.0;
            let seed = Tensor::from_values(one_hot, output.shape(), output.dtype())?;
            let grads = grad(
                std::slice::from_ref(output),
                &wrt,
                Some(std::slice::from_ref(&seed)),
                options,
            )
            .map_err(GradCheckError::BackwardPassError)?;

            for (k, grad) in grads.into_iter().enumerate() {
                let Some(grad) = grad else { continue };
                for (input_element, value) in grad.to_vec_f64().into_iter().enumerate() {
                    jacobians[k][position].set(output_element, input_element, value);
                }
            }
        }
    }
    Ok(jacobians)
}

/// Evaluates `func` with input `input_index` replaced by a fresh F64 tensor holding
/// `values`. The copy keeps the original's `requires_grad`, so functions that
/// differentiate internally still see a tracked input.
fn evaluate_with<F>(
    func: &F,
    inputs: &[Input],
    input_index: usize,
    original: &Tensor,
    values: Vec<f64>,
) -> Result<Vec<Tensor>, GradCheckError>
where
    F: Fn(&[Input]) -> Result<Vec<Tensor>, AutofuncError>,
{
    let replacement = Tensor::from_values(values, original.shape(), DType::F64)?
        .with_requires_grad(original.requires_grad())?;
    let mut args = inputs.to_vec();
    args[input_index] = Input::Tensor(replacement);
    func(&args).map_err(GradCheckError::ForwardPassError)
}

/// Central-difference Jacobians of every checked output with respect to one input.
fn numerical_jacobians<F>(
    func: &F,
    inputs: &[Input],
    input_index: usize,
    input: &Tensor,
    reference: &[Tensor],
    checked: &[usize],
    eps: f64,
) -> Result<Vec<Jacobian>, GradCheckError>
where
    F: Fn(&[Input]) -> Result<Vec<Tensor>, AutofuncError>,
{
    let base = input.to_vec_f64();
    let mut jacobians: Vec<Jacobian> = checked
        .iter()
        .map(|&o| Jacobian::zeros(reference[o].numel(), base.len()))
        .collect();

    for input_element in 0..base.len() {
        let mut plus = base.clone();
        plus[input_element] += eps;
        let mut minus = base.clone();
        minus[input_element] -= eps;
        let outputs_plus = evaluate_with(func, inputs, input_index, input, plus)?;
        let outputs_minus = evaluate_with(func, inputs, input_index, input, minus)?;

        for (position, &output_index) in checked.iter().enumerate() {
            let (Some(out_plus), Some(out_minus)) =
                (outputs_plus.get(output_index), outputs_minus.get(output_index))
            else {
                return Err(GradCheckError::ForwardPassError(AutofuncError::InvalidInput {
                    op: "gradcheck",
                    message: format!("output {} disappeared after perturbation", output_index),
                }));
            };
            let expected_shape = reference[output_index].shape();
            for out in [out_plus, out_minus] {
                if out.shape() != expected_shape {
                    return Err(GradCheckError::ForwardPassError(AutofuncError::ShapeMismatch {
                        expected: expected_shape,
                        actual: out.shape(),
                        operation: "gradcheck (perturbed output)".to_string(),
                    }));
                }
            }
            let values_plus = out_plus.to_vec_f64();
            let values_minus = out_minus.to_vec_f64();
            for (output_element, (p, m)) in values_plus.iter().zip(&values_minus).enumerate() {
                jacobians[position].set(output_element, input_element, (p - m) / (2.0 * eps));
            }
        }
    }
    Ok(jacobians)
}

/// Checks the gradients computed by the backward passes of `func` against finite
/// differences with respect to every tensor input that requires grad.
///
/// Non-tensor inputs and tensors not requiring grad are passed through unchanged.
/// `func` is called once with the inputs as given, then twice per input element with
/// that element shifted by `±eps`.
///
/// # Returns
/// `Ok(true)` if every Jacobian entry is within tolerance. On the first mismatch,
/// `Err(JacobianMismatch)` if `options.raise_exception`, otherwise `Ok(false)` after
/// logging the mismatch.
///
/// # Errors
/// Besides mismatches: `LowPrecisionInput` for a differentiable input that is not F64,
/// `NothingToCompare` when no output element is left to check,
/// `ForwardPassError` / `BackwardPassError` wrapping failures of `func` or of its
/// backward, and `NonFiniteGradient` when either Jacobian contains NaN or infinity.
pub fn gradcheck<F>(
    func: F,
    inputs: &[Input],
    options: &GradCheckOptions,
) -> Result<bool, GradCheckError>
where
    F: Fn(&[Input]) -> Result<Vec<Tensor>, AutofuncError>,
{
    let differentiable = differentiable_inputs(inputs)?;
    let outputs = func(inputs).map_err(GradCheckError::ForwardPassError)?;
    let checked = checked_outputs(&outputs);
    debug!(
        "gradcheck: {} differentiable inputs, {} of {} outputs checked (eps={}, atol={}, rtol={})",
        differentiable.len(),
        checked.len(),
        outputs.len(),
        options.eps,
        options.atol,
        options.rtol
    );

    let compared: usize = checked.iter().map(|&o| outputs[o].numel()).sum::<usize>()
        * differentiable.iter().map(|(_, t)| t.numel()).sum::<usize>();
    if compared == 0 {
        return Err(GradCheckError::NothingToCompare);
    }

    let analytical = analytical_jacobians(&outputs, &checked, &differentiable)?;

    for (k, (input_index, input)) in differentiable.iter().enumerate() {
        let numerical = numerical_jacobians(
            &func,
            inputs,
            *input_index,
            input,
            &outputs,
            &checked,
            options.eps,
        )?;

        for (position, &output_index) in checked.iter().enumerate() {
            let analytic = &analytical[k][position];
            let numeric = &numerical[position];
            // Without a graph the expected derivative is exactly zero.
            let tracked = outputs[output_index].requires_grad();
            for output_element in 0..outputs[output_index].numel() {
                for input_element in 0..input.numel() {
                    let a = analytic.get(output_element, input_element);
                    let n = numeric.get(output_element, input_element);
                    for (kind, value) in [("analytical", a), ("numerical", n)] {
                        if !value.is_finite() {
                            return Err(GradCheckError::NonFiniteGradient {
                                kind,
                                input_index: *input_index,
                                output_index,
                                input_element,
                                output_element,
                                value,
                            });
                        }
                    }

                    let difference = (a - n).abs();
                    let tolerance = if tracked {
                        options.atol + options.rtol * n.abs()
                    } else {
                        options.atol
                    };
                    if difference <= tolerance {
                        continue;
                    }
                    let mismatch = GradCheckError::JacobianMismatch {
                        input_index: *input_index,
                        output_index,
                        input_element,
                        output_element,
                        analytical: a,
                        numerical: n,
                        difference,
                    };
                    if options.raise_exception {
                        return Err(mismatch);
                    }
                    warn!("gradcheck failed: {}", mismatch);
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

/// Checks second-order gradients: runs [`gradcheck`] on the map
/// `(inputs, grad_outputs) -> grad(func(inputs), inputs, grad_outputs, create_graph)`.
///
/// `grad_outputs` holds one tensor per checked output of `func` (every floating point
/// output not marked non-differentiable); random F64 tensors are drawn when it is
/// `None`. The gradients are perturbed too, so the check covers the backward's
/// dependence on both. A backward that computes its results from raw values, leaving
/// them without a graph, fails with a Jacobian mismatch.
///
/// A function declared once-differentiable fails with
/// `BackwardPassError(DoubleBackwardUnsupported)`.
pub fn gradgradcheck<F>(
    func: F,
    inputs: &[Input],
    grad_outputs: Option<&[Tensor]>,
    options: &GradCheckOptions,
) -> Result<bool, GradCheckError>
where
    F: Fn(&[Input]) -> Result<Vec<Tensor>, AutofuncError>,
{
    let outputs = func(inputs).map_err(GradCheckError::ForwardPassError)?;
    let checked = checked_outputs(&outputs);

    let cotangents: Vec<Tensor> = match grad_outputs {
        Some(given) => {
            if given.len() != checked.len() {
                return Err(GradCheckError::TensorError(AutofuncError::InvalidInput {
                    op: "gradgradcheck",
                    message: format!(
                        "{} grad_outputs for {} differentiable outputs",
                        given.len(),
                        checked.len()
                    ),
                }));
            }
            given
                .iter()
                .map(|g| g.deep_copy()?.with_requires_grad(true))
                .collect::<Result<_, _>>()?
        }
        None => checked
            .iter()
            .map(|&o| randn_f64(&outputs[o].shape())?.with_requires_grad(true))
            .collect::<Result<_, _>>()?,
    };
    drop(outputs);

    let primal_count = inputs.len();
    let mut all_inputs = inputs.to_vec();
    all_inputs.extend(cotangents.into_iter().map(Input::Tensor));

    let first_order = |args: &[Input]| -> Result<Vec<Tensor>, AutofuncError> {
        let (primal, cotangents) = args.split_at(primal_count);
        let outputs = func(primal)?;
        // Outputs without a graph contribute nothing to the vector-Jacobian product.
        let (roots, cotangents): (Vec<Tensor>, Vec<Tensor>) = checked_outputs(&outputs)
            .into_iter()
            .zip(cotangents.iter().filter_map(Input::as_tensor))
            .filter(|(o, _)| outputs[*o].requires_grad())
            .map(|(o, cotangent)| (outputs[o].clone(), cotangent.clone()))
            .unzip();
        let wrt: Vec<Tensor> = primal
            .iter()
            .filter_map(Input::as_tensor)
            .filter(|t| t.requires_grad())
            .cloned()
            .collect();
        let grads = grad(
            &roots,
            &wrt,
            Some(cotangents.as_slice()),
            GradOptions {
                retain_graph: Some(true),
                create_graph: true,
                allow_unused: true,
            },
        )?;
        grads
            .into_iter()
            .zip(&wrt)
            .map(|(g, input)| match g {
                Some(g) => Ok(g),
                None => zeros_like(input),
            })
            .collect()
    };

    gradcheck(first_order, &all_inputs, options)
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
