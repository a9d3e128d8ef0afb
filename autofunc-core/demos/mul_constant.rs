//! # Non-tensor arguments and gradient materialization
//!
//! `MulConstant` multiplies a tensor by a plain number. The number travels to backward
//! in the function's `State`, not through `save_for_backward`, and its gradient is
//! always `None`.
//!
//! The function also disables gradient materialization: its backward is prepared to
//! receive `None` for an output that got no gradient and then returns `[None, None]`
//! without doing any arithmetic.
//!
//! Run with `cargo run --example mul_constant`.

use autofunc_core::autograd::{gradcheck, gradgradcheck, GradCheckOptions};
use autofunc_core::functions::{mul_constant, MulConstant};
use autofunc_core::tensor::randn_f64_with_rng;
use autofunc_core::{Function, Input, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let x = Tensor::new_f64(vec![1.0, 2.0, 3.0], vec![3])?.with_requires_grad(true)?;
    let y = mul_constant(&x, 5.0)?;
    println!("y = {:?}", y);
    if let Some(node) = y.grad_fn() {
        // The constant is not a tensor, so it has no edge in the graph.
        println!("next_functions = {:?}", node.next_functions());
    }

    y.sum()?.backward()?;
    println!("x.grad = {:?}", x.grad().map(|g| g.to_vec_f64()));

    let mut rng = StdRng::seed_from_u64(1);
    let options = GradCheckOptions {
        atol: 1e-4,
        ..Default::default()
    };
    for trial in 0..3 {
        let sample = randn_f64_with_rng(&[4, 4], &mut rng)?.with_requires_grad(true)?;
        let constant = (trial as f64) * 2.5 - 1.0;
        let inputs = [Input::from(&sample), Input::Scalar(constant)];
        let first = gradcheck(|args: &[Input]| MulConstant::apply(args), &inputs, &options)?;
        let second =
            gradgradcheck(|args: &[Input]| MulConstant::apply(args), &inputs, None, &options)?;
        println!(
            "constant {:>5}: gradcheck = {}, gradgradcheck = {}",
            constant, first, second
        );
    }
    Ok(())
}
