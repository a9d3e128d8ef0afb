//! # What a function can declare about itself
//!
//! 1.  `set_materialize_grads(false)`: backward sees `None` for outputs without a
//!     gradient instead of zero-filled tensors.
//! 2.  `mark_dirty`: an input modified in place is rebased onto the function's node.
//! 3.  `mark_non_differentiable`: outputs such as sort indices stay out of the graph.
//! 4.  `ONCE_DIFFERENTIABLE`: differentiating the backward again is an error, not a
//!     silently wrong result.
//!
//! Run with `cargo run --example function_flags`; `RUST_LOG=warn` (or lower) also shows
//! the warning logged for a function that writes to its input without declaring it.

use autofunc_core::autograd::{grad, tensor_arg, GradOptions};
use autofunc_core::functions::{scale_in_place, sort};
use autofunc_core::{AutofuncError, BackwardContext, Context, Function, Input, Tensor};
use std::error::Error;

/// Returns `(x + 1, x - 1)`; optionally keeps absent gradients as `None`.
struct ShiftBoth;

impl Function for ShiftBoth {
    type State = ();
    const NAME: &'static str = "ShiftBothBackward";

    fn forward(ctx: &mut Context<()>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
        let x = tensor_arg(inputs, 0, Self::NAME)?;
        if let Some(Input::Bool(materialize)) = inputs.get(1) {
            ctx.set_materialize_grads(*materialize);
        }
        let ones = Tensor::new_f64(vec![1.0; x.numel()], x.shape())?;
        Ok(vec![x.add(&ones)?, x.sub(&ones)?])
    }

    fn backward(
        _ctx: &BackwardContext<'_, ()>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        println!(
            "  ShiftBoth backward received: {:?}",
            grad_outputs
                .iter()
                .map(|g| g.as_ref().map(Tensor::to_vec_f64))
                .collect::<Vec<_>>()
        );
        let grad = match (&grad_outputs[0], &grad_outputs[1]) {
            (Some(a), Some(b)) => Some(a.add(b)?),
            (Some(g), None) | (None, Some(g)) => Some(g.clone()),
            (None, None) => None,
        };
        Ok(vec![grad, None])
    }
}

/// Scales its input in place without calling `mark_dirty`.
struct ForgetfulScale;

impl Function for ForgetfulScale {
    type State = ();
    const NAME: &'static str = "ForgetfulScaleBackward";

    fn forward(_ctx: &mut Context<()>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
        let x = tensor_arg(inputs, 0, Self::NAME)?;
        x.mul_scalar_(10.0)?;
        Ok(vec![x.mul_scalar(1.0)?])
    }

    fn backward(
        _ctx: &BackwardContext<'_, ()>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        Ok(vec![grad_outputs[0].clone()])
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("--- Materialization ---");
    for materialize in [true, false] {
        let x = Tensor::new_f64(vec![1.0, 2.0], vec![2])?.with_requires_grad(true)?;
        let outputs = ShiftBoth::apply(&[(&x).into(), materialize.into()])?;
        println!("materialize_grads = {}; only the first output is used", materialize);
        outputs[0].sum()?.backward()?;
        println!("  x.grad = {:?}", x.grad().map(|g| g.to_vec_f64()));
    }

    println!("\n--- mark_dirty ---");
    let x = Tensor::new_f64(vec![1.0, 2.0], vec![2])?.with_requires_grad(true)?;
    let y = x.mul_scalar(1.0)?;
    println!("before: y.grad_fn = {:?}", y.grad_fn_name());
    scale_in_place(&y, 3.0)?;
    println!("after:  y.grad_fn = {:?}, y = {:?}", y.grad_fn_name(), y.to_vec_f64());
    y.sum()?.backward()?;
    println!("x.grad = {:?}", x.grad().map(|g| g.to_vec_f64()));
    match scale_in_place(&x, 3.0) {
        Err(err) => println!("on a leaf requiring grad: {}", err),
        Ok(_) => println!("unexpected success on a leaf"),
    }

    println!("\n--- Undeclared in-place write ---");
    let z = y.mul_scalar(1.0)?;
    ForgetfulScale::apply(&[(&z).into()])?;
    println!("z was changed behind the graph's back: {:?}", z.to_vec_f64());

    println!("\n--- mark_non_differentiable ---");
    let x = Tensor::new_f64(vec![3.0, -1.0, 2.0], vec![3])?.with_requires_grad(true)?;
    let (values, indices) = sort(&x)?;
    println!("values  requires_grad = {}", values.requires_grad());
    println!("indices requires_grad = {}, dtype = {:?}", indices.requires_grad(), indices.dtype());

    println!("\n--- once_differentiable ---");
    let cotangent = Tensor::new_f64(vec![1.0, 2.0, 3.0], vec![3])?.with_requires_grad(true)?;
    let options = GradOptions {
        create_graph: true,
        ..Default::default()
    };
    let first = grad(&[values], &[x], Some(&[cotangent.clone()][..]), options)?;
    if let Some(dx) = first.into_iter().next().flatten() {
        println!("first order: {:?} (grad_fn {:?})", dx.to_vec_f64(), dx.grad_fn_name());
        match grad(&[dx.sum()?], &[cotangent], None, GradOptions::default()) {
            Err(err) => println!("second order: {}", err),
            Ok(_) => println!("second order unexpectedly succeeded"),
        }
    }
    Ok(())
}
