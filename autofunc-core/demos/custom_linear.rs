//! # A linear layer as a custom function
//!
//! Walks through `LinearFunction`, the `Function` implementation behind `nn::Linear`:
//!
//! 1.  Applying the function records a single `LinearFunctionBackward` node, whatever
//!     tracked ops forward uses internally.
//! 2.  Backward only computes the gradients `needs_input_grad` asks for.
//! 3.  `gradcheck` confirms the hand-written backward against finite differences.
//! 4.  The same function drives the `Linear` module.
//!
//! Run with `cargo run --example custom_linear`, and `RUST_LOG=debug` to see the graph
//! being recorded and executed.

use autofunc_core::autograd::{gradcheck, GradCheckOptions};
use autofunc_core::functions::{linear, LinearFunction};
use autofunc_core::nn::{Linear, Module};
use autofunc_core::tensor::randn_f64_with_rng;
use autofunc_core::{Function, Input, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(0);

    println!("--- Forward ---");
    let input = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2])?.with_requires_grad(true)?;
    let weight = Tensor::new_f64(vec![0.5, -1.0, 1.5, 2.0, 0.0, 1.0], vec![3, 2])?
        .with_requires_grad(true)?;
    let bias = Tensor::new_f64(vec![0.1, 0.2, 0.3], vec![3])?;
    let output = linear(&input, &weight, Some(&bias))?;
    println!("output = {:?}", output);
    if let Some(node) = output.grad_fn() {
        println!("grad_fn = {:?}", node);
    }

    println!("\n--- Backward ---");
    output.sum()?.backward()?;
    println!("input.grad  = {:?}", input.grad());
    println!("weight.grad = {:?}", weight.grad());
    println!("bias.grad   = {:?} (bias does not require grad)", bias.grad());

    println!("\n--- Gradient check ---");
    let input = randn_f64_with_rng(&[20, 20], &mut rng)?.with_requires_grad(true)?;
    let weight = randn_f64_with_rng(&[30, 20], &mut rng)?.with_requires_grad(true)?;
    let options = GradCheckOptions {
        eps: 1e-6,
        atol: 1e-4,
        ..Default::default()
    };
    let passed = gradcheck(
        |args: &[Input]| LinearFunction::apply(args),
        &[input.into(), weight.into()],
        &options,
    )?;
    println!("gradcheck(linear, 20x20 input, 30x20 weight) = {}", passed);

    println!("\n--- Linear module ---");
    let layer = Linear::new_with_rng(4, 2, true, &mut rng)?;
    let batch = randn_f64_with_rng(&[3, 4], &mut rng)?;
    let prediction = layer.forward(&batch)?;
    prediction.sum()?.backward()?;
    for (name, param) in layer.named_parameters() {
        println!("{}: shape {:?}, grad {:?}", name, param.shape(), param.grad().map(|g| g.to_vec_f64()));
    }
    Ok(())
}
