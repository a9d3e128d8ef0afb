//! # Custom differentiable functions
//!
//! This module is the extension point of the engine. A new operation is added by
//! implementing [`Function`]: a `forward` computing outputs from inputs, and a `backward`
//! computing one gradient per input from one gradient per output. [`Function::apply`]
//! does the bookkeeping that connects the two through the graph.
//!
//! ## The contract
//!
//! - `forward` receives its tensor inputs detached from history and runs with grad mode
//!   disabled, so whatever it computes is not tracked. It records what backward will need
//!   explicitly: tensors through [`Context::save_for_backward`], anything else in the
//!   statically typed [`Function::State`] via [`Context::state_mut`].
//! - `backward` receives one gradient per forward output and returns one gradient per
//!   forward input, in order, `None` wherever an input needs none (including every
//!   non-tensor input). It must not modify the received gradients in place.
//! - In-place mutation of an input must be declared with [`Context::mark_dirty`], and
//!   outputs that cannot be differentiated (indices, masks) with
//!   [`Context::mark_non_differentiable`].
//!
//! Forgetting a `save_for_backward` or a `mark_dirty` is not detected here: it yields wrong
//! gradients. Verify every new function with
//! [`gradcheck`](crate::autograd::grad_check::gradcheck).

use crate::autograd::backward_op::{BackwardOp, Edge, Node, TensorMeta};
use crate::autograd::grad_mode::{is_grad_enabled, no_grad};
use crate::autograd::saved::{SavedState, SavedTensor};
use crate::error::AutofuncError;
use crate::tensor::create::full_like_dtype;
use crate::tensor::Tensor;
use log::{debug, warn};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// One argument of a function application.
#[derive(Debug, Clone)]
pub enum Input {
    Tensor(Tensor),
    Scalar(f64),
    Int(i64),
    Bool(bool),
    Shape(Vec<usize>),
    /// An optional argument that was not supplied.
    None,
}

impl Input {
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Input::Tensor(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Tensor> for Input {
    fn from(tensor: Tensor) -> Self {
        Input::Tensor(tensor)
    }
}

impl From<&Tensor> for Input {
    fn from(tensor: &Tensor) -> Self {
        Input::Tensor(tensor.clone())
    }
}

impl From<Option<&Tensor>> for Input {
    fn from(tensor: Option<&Tensor>) -> Self {
        tensor.map_or(Input::None, |t| Input::Tensor(t.clone()))
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Input::Scalar(value)
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Int(value)
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Bool(value)
    }
}

impl From<&[usize]> for Input {
    fn from(shape: &[usize]) -> Self {
        Input::Shape(shape.to_vec())
    }
}

fn missing_or_wrong(
    op: &'static str,
    index: usize,
    expected: &str,
    got: Option<&Input>,
) -> AutofuncError {
    AutofuncError::InvalidInput {
        op,
        message: match got {
            Some(input) => format!("argument {} must be {}, got {:?}", index, expected, input),
            None => format!("missing argument {} ({})", index, expected),
        },
    }
}

/// Fetches a required tensor argument.
pub fn tensor_arg<'a>(
    inputs: &'a [Input],
    index: usize,
    op: &'static str,
) -> Result<&'a Tensor, AutofuncError> {
    match inputs.get(index) {
        Some(Input::Tensor(t)) => Ok(t),
        other => Err(missing_or_wrong(op, index, "a tensor", other)),
    }
}

/// Fetches an optional tensor argument; a missing trailing argument counts as `None`.
pub fn optional_tensor_arg<'a>(
    inputs: &'a [Input],
    index: usize,
    op: &'static str,
) -> Result<Option<&'a Tensor>, AutofuncError> {
    match inputs.get(index) {
        Some(Input::Tensor(t)) => Ok(Some(t)),
        Some(Input::None) | None => Ok(None),
        other => Err(missing_or_wrong(op, index, "a tensor or None", other)),
    }
}

/// Fetches a numeric argument (`Scalar` or `Int`).
pub fn scalar_arg(inputs: &[Input], index: usize, op: &'static str) -> Result<f64, AutofuncError> {
    match inputs.get(index) {
        Some(Input::Scalar(v)) => Ok(*v),
        Some(Input::Int(v)) => Ok(*v as f64),
        other => Err(missing_or_wrong(op, index, "a number", other)),
    }
}

/// Fetches a shape argument.
pub fn shape_arg<'a>(
    inputs: &'a [Input],
    index: usize,
    op: &'static str,
) -> Result<&'a [usize], AutofuncError> {
    match inputs.get(index) {
        Some(Input::Shape(shape)) => Ok(shape),
        other => Err(missing_or_wrong(op, index, "a shape", other)),
    }
}

/// Per-invocation scratch space handed to [`Function::forward`].
pub struct Context<S> {
    state: S,
    needs_input_grad: Vec<bool>,
    /// The detached tensors forward actually sees, by input position.
    forward_inputs: Vec<Option<Tensor>>,
    to_save: Option<Vec<Option<Tensor>>>,
    dirty: Vec<Tensor>,
    non_differentiable: Vec<Tensor>,
    materialize_grads: bool,
}

impl<S: Default> Context<S> {
    fn new(needs_input_grad: Vec<bool>, forward_inputs: Vec<Option<Tensor>>) -> Self {
        Context {
            state: S::default(),
            needs_input_grad,
            forward_inputs,
            to_save: None,
            dirty: Vec::new(),
            non_differentiable: Vec::new(),
            materialize_grads: true,
        }
    }
}

impl<S> Context<S> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Whether input `index` will receive a gradient.
    pub fn needs_input_grad(&self, index: usize) -> bool {
        self.needs_input_grad.get(index).copied().unwrap_or(false)
    }

    /// Retains tensors for backward. Accepts inputs, outputs or tensors created in
    /// forward; `None` entries keep positions stable for optional inputs. A second call
    /// replaces the first.
    pub fn save_for_backward<I>(&mut self, tensors: I)
    where
        I: IntoIterator<Item = Option<Tensor>>,
    {
        self.to_save = Some(tensors.into_iter().collect());
    }

    /// Declares that forward modified `tensor`, one of its inputs, in place. The tensor
    /// must also be returned as an output.
    pub fn mark_dirty(&mut self, tensor: &Tensor) {
        self.dirty.push(tensor.clone());
    }

    /// Excludes an output from gradient tracking.
    pub fn mark_non_differentiable(&mut self, tensor: &Tensor) {
        self.non_differentiable.push(tensor.clone());
    }

    /// With `false`, backward receives `None` for outputs that got no gradient instead of
    /// a zero-filled tensor, and must handle that case itself.
    pub fn set_materialize_grads(&mut self, value: bool) {
        self.materialize_grads = value;
    }

    fn input_position(&self, tensor: &Tensor) -> Option<usize> {
        self.forward_inputs
            .iter()
            .position(|input| input.as_ref().is_some_and(|t| t.is_same(tensor)))
    }
}

/// What [`Function::backward`] sees of the context.
pub struct BackwardContext<'a, S> {
    state: &'a S,
    needs_input_grad: &'a [bool],
    saved: Option<Vec<Option<SavedTensor>>>,
    node: &'a Arc<Node>,
}

impl<'a, S> BackwardContext<'a, S> {
    pub fn state(&self) -> &S {
        self.state
    }

    pub fn needs_input_grad(&self, index: usize) -> bool {
        self.needs_input_grad.get(index).copied().unwrap_or(false)
    }

    /// The tensors passed to `save_for_backward`, in the same order.
    ///
    /// # Errors
    /// `SavedTensorsFreed` when the graph was already backpropagated without being
    /// retained, `SavedTensorModified` when a saved tensor was written in place since.
    pub fn saved_tensors(&self) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let saved = self.saved.as_ref().ok_or(AutofuncError::SavedTensorsFreed {
            op: self.node.name(),
        })?;
        saved
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .as_ref()
                    .map(|s| s.unpack(self.node, index))
                    .transpose()
            })
            .collect()
    }
}

/// A differentiable operation.
///
/// ```ignore
/// #[derive(Default)]
/// struct MulConstantState { constant: f64 }
///
/// struct MulConstant;
///
/// impl Function for MulConstant {
///     type State = MulConstantState;
///     const NAME: &'static str = "MulConstant";
///
///     fn forward(ctx: &mut Context<Self::State>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
///         let tensor = tensor_arg(inputs, 0, Self::NAME)?;
///         let constant = scalar_arg(inputs, 1, Self::NAME)?;
///         ctx.state_mut().constant = constant;
///         Ok(vec![tensor.mul_scalar(constant)?])
///     }
///
///     fn backward(ctx: &BackwardContext<'_, Self::State>, grad_outputs: &[Option<Tensor>])
///         -> Result<Vec<Option<Tensor>>, AutofuncError> {
///         let grad = grad_outputs[0].as_ref().map(|g| g.mul_scalar(ctx.state().constant)).transpose()?;
///         Ok(vec![grad, None])
///     }
/// }
/// ```
pub trait Function: 'static {
    /// Auxiliary, non-tensor state carried from forward to backward.
    type State: Default + Send + Sync + 'static;

    /// Type tag recorded on graph nodes.
    const NAME: &'static str;

    /// Declares that backward is not itself differentiable. Backward then runs without
    /// recording, and differentiating its results again fails with
    /// `DoubleBackwardUnsupported` instead of silently returning wrong values.
    const ONCE_DIFFERENTIABLE: bool = false;

    fn forward(ctx: &mut Context<Self::State>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError>;

    fn backward(
        ctx: &BackwardContext<'_, Self::State>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError>;

    /// Runs forward and, if any tensor input requires grad, records the node.
    fn apply(inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError>
    where
        Self: Sized,
    {
        apply_function::<Self>(inputs)
    }
}

/// Type-erased node behaviour for a `Function`.
struct FunctionBackward<F: Function> {
    state: F::State,
    needs_input_grad: Vec<bool>,
    saved: Mutex<SavedState>,
    materialize_grads: bool,
    _function: PhantomData<fn() -> F>,
}

impl<F: Function> Debug for FunctionBackward<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionBackward")
            .field("name", &F::NAME)
            .field("needs_input_grad", &self.needs_input_grad)
            .field("materialize_grads", &self.materialize_grads)
            .finish()
    }
}

impl<F: Function> BackwardOp for FunctionBackward<F> {
    fn name(&self) -> &'static str {
        F::NAME
    }

    fn backward(
        &self,
        node: &Arc<Node>,
        grad_outputs: Vec<Option<Tensor>>,
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let grad_outputs = if self.materialize_grads {
            grad_outputs
                .into_iter()
                .zip(&node.output_meta)
                .map(|(grad, meta)| match grad {
                    Some(g) => Ok(Some(g)),
                    None => full_like_dtype(&meta.shape, meta.dtype, 0.0).map(Some),
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            grad_outputs
        };

        let saved = match &*self.saved.lock().expect("Mutex poisoned") {
            SavedState::Live(saved) => Some(saved.clone()),
            SavedState::Freed => None,
        };
        let ctx = BackwardContext {
            state: &self.state,
            needs_input_grad: &self.needs_input_grad,
            saved,
            node,
        };

        if !F::ONCE_DIFFERENTIABLE {
            return F::backward(&ctx, &grad_outputs);
        }

        let higher_order = is_grad_enabled();
        let grads = {
            let _guard = no_grad();
            F::backward(&ctx, &grad_outputs)?
        };
        if higher_order && grad_outputs.iter().flatten().any(Tensor::requires_grad) {
            Ok(delay_error(F::NAME, grads, &grad_outputs))
        } else {
            Ok(grads)
        }
    }

    fn release_saved_tensors(&self) {
        let mut saved = self.saved.lock().expect("Mutex poisoned");
        if matches!(&*saved, SavedState::Live(list) if !list.is_empty()) {
            *saved = SavedState::Freed;
        }
    }
}

/// Backward of the node standing in for a once-differentiable function's backward.
#[derive(Debug)]
struct DelayedErrorBackward {
    op: &'static str,
}

impl BackwardOp for DelayedErrorBackward {
    fn name(&self) -> &'static str {
        "DelayedError"
    }

    fn backward(
        &self,
        _node: &Arc<Node>,
        _grad_outputs: Vec<Option<Tensor>>,
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        Err(AutofuncError::DoubleBackwardUnsupported { op: self.op })
    }

    fn release_saved_tensors(&self) {}
}

/// Connects the results of an untracked backward to the gradients it consumed through a
/// node that fails if anything differentiates through it.
fn delay_error(
    op: &'static str,
    grads: Vec<Option<Tensor>>,
    grad_outputs: &[Option<Tensor>],
) -> Vec<Option<Tensor>> {
    let next_edges = grad_outputs
        .iter()
        .map(|g| g.as_ref().filter(|t| t.requires_grad()).map(Edge::for_tensor))
        .collect();
    let input_meta = grad_outputs
        .iter()
        .map(|g| g.as_ref().map(TensorMeta::of))
        .collect();
    let output_meta = grads
        .iter()
        .map(|g| {
            g.as_ref().map(TensorMeta::of).unwrap_or(TensorMeta {
                shape: vec![],
                dtype: crate::types::DType::F64,
            })
        })
        .collect();
    let node = Arc::new(Node {
        op: Box::new(DelayedErrorBackward { op }),
        next_edges,
        input_meta,
        output_meta,
    });
    grads
        .into_iter()
        .enumerate()
        .map(|(output_nr, grad)| {
            grad.map(|g| {
                let wrapped = g.alias();
                {
                    let mut guard = wrapped.write_data();
                    guard.grad_fn = Some(Arc::clone(&node));
                    guard.output_nr = output_nr;
                    guard.requires_grad = true;
                }
                wrapped
            })
        })
        .collect()
}

fn apply_function<F: Function>(inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
    let grad_enabled = is_grad_enabled();
    let needs_input_grad: Vec<bool> = inputs
        .iter()
        .map(|input| grad_enabled && input.as_tensor().is_some_and(Tensor::requires_grad))
        .collect();
    let any_requires_grad = needs_input_grad.iter().any(|&n| n);

    let detached: Vec<Input> = inputs
        .iter()
        .map(|input| match input {
            Input::Tensor(t) => Input::Tensor(t.detach()),
            other => other.clone(),
        })
        .collect();
    let versions_before: Vec<Option<u64>> = inputs
        .iter()
        .map(|input| input.as_tensor().map(Tensor::version))
        .collect();

    let mut ctx = Context::<F::State>::new(
        needs_input_grad.clone(),
        detached.iter().map(|input| input.as_tensor().cloned()).collect(),
    );
    let outputs = {
        let _guard = no_grad();
        F::forward(&mut ctx, &detached)?
    };
    if outputs.is_empty() {
        return Err(AutofuncError::InvalidInput {
            op: F::NAME,
            message: "forward returned no outputs".to_string(),
        });
    }

    // Dirty tensors: which input each one is, and that it came back as an output.
    let mut dirty_inputs = Vec::with_capacity(ctx.dirty.len());
    for tensor in &ctx.dirty {
        let index = ctx.input_position(tensor).ok_or_else(|| AutofuncError::InvalidInput {
            op: F::NAME,
            message: "only inputs can be marked dirty".to_string(),
        })?;
        if !outputs.iter().any(|out| out.is_same(tensor)) {
            return Err(AutofuncError::DirtyTensorNotReturned { op: F::NAME });
        }
        dirty_inputs.push(index);
    }
    for (index, before) in versions_before.iter().enumerate() {
        let Some(before) = before else { continue };
        let Some(tensor) = inputs[index].as_tensor() else { continue };
        if tensor.version() != *before && !dirty_inputs.contains(&index) {
            warn!(
                "{} modified input {} in place without marking it dirty; its gradients may be wrong",
                F::NAME,
                index
            );
        }
    }

    // The caller keeps its own handle for a dirty input.
    let dirty_originals: Vec<Option<Tensor>> = outputs
        .iter()
        .map(|out| {
            let index = ctx.input_position(out).filter(|i| dirty_inputs.contains(i))?;
            inputs[index].as_tensor().cloned()
        })
        .collect();

    if !any_requires_grad {
        return Ok(outputs
            .iter()
            .zip(dirty_originals)
            .map(|(out, original)| original.unwrap_or_else(|| out.clone()))
            .collect());
    }

    for &index in &dirty_inputs {
        if let Some(original) = inputs[index].as_tensor() {
            if original.requires_grad() && original.is_leaf() {
                return Err(AutofuncError::InplaceOnLeaf {
                    op: F::NAME,
                    input_index: index,
                });
            }
        }
    }

    let next_edges: Vec<Option<Edge>> = inputs
        .iter()
        .zip(&needs_input_grad)
        .map(|(input, &needed)| input.as_tensor().filter(|_| needed).map(Edge::for_tensor))
        .collect();
    let input_meta = inputs
        .iter()
        .map(|input| input.as_tensor().map(TensorMeta::of))
        .collect();
    let output_meta = outputs.iter().map(TensorMeta::of).collect();

    let marked: Vec<bool> = outputs
        .iter()
        .map(|out| ctx.non_differentiable.iter().any(|nd| nd.is_same(out)))
        .collect();
    let differentiable: Vec<bool> = outputs
        .iter()
        .zip(&marked)
        .map(|(out, &marked)| out.dtype().is_floating_point() && !marked)
        .collect();

    let saved = ctx
        .to_save
        .take()
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            entry.map(|tensor| {
                let version = tensor.version();
                if let Some(output_nr) = outputs.iter().position(|out| out.is_same(&tensor)) {
                    SavedTensor::Output {
                        data: tensor.alias(),
                        output_nr,
                        differentiable: differentiable[output_nr],
                        version,
                    }
                } else if let Some(index) = ctx.input_position(&tensor) {
                    match inputs[index].as_tensor() {
                        Some(original) => SavedTensor::Input {
                            tensor: original.clone(),
                            version,
                        },
                        None => SavedTensor::Intermediate { tensor, version },
                    }
                } else {
                    SavedTensor::Intermediate { tensor, version }
                }
            })
        })
        .collect();

    let node = Arc::new(Node {
        op: Box::new(FunctionBackward::<F> {
            state: std::mem::take(&mut ctx.state),
            needs_input_grad,
            saved: Mutex::new(SavedState::Live(saved)),
            materialize_grads: ctx.materialize_grads,
            _function: PhantomData,
        }),
        next_edges,
        input_meta,
        output_meta,
    });
    debug!(
        "Recorded {} node: {} inputs, {} outputs",
        F::NAME,
        node.num_inputs(),
        node.num_outputs()
    );

    let mut results: Vec<Tensor> = Vec::with_capacity(outputs.len());
    for (output_nr, (out, original)) in outputs.iter().zip(dirty_originals).enumerate() {
        let result = match original {
            Some(original) => original,
            // The same tensor returned twice still needs one handle per output slot.
            None if outputs[..output_nr].iter().any(|o| o.is_same(out)) => out.alias(),
            None => out.clone(),
        };
        let mut guard = result.write_data();
        if differentiable[output_nr] {
            guard.grad_fn = Some(Arc::clone(&node));
            guard.output_nr = output_nr;
            guard.requires_grad = true;
        } else {
            guard.grad_fn = None;
            guard.requires_grad = false;
            guard.non_differentiable = marked[output_nr];
        }
        drop(guard);
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
#[path = "function_test.rs"]
mod tests;
