use autofunc_core::autograd::{
    grad, no_grad, scalar_arg, tensor_arg, BackwardOptions, GradOptions,
};
use autofunc_core::functions::{linear, mul_constant, scale_in_place, sort};
use autofunc_core::nn::{Linear, Module};
use autofunc_core::{AutofuncError, BackwardContext, Context, Function, Input, Tensor};

mod common;
use common::{assert_values_near, constant, leaf};

/// `x^3`, with a backward written in tracked ops so it can be differentiated again.
struct Cube;

impl Function for Cube {
    type State = ();
    const NAME: &'static str = "CubeBackward";

    fn forward(ctx: &mut Context<()>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
        let x = tensor_arg(inputs, 0, Self::NAME)?;
        ctx.save_for_backward([Some(x.clone())]);
        Ok(vec![x.mul(x)?.mul(x)?])
    }

    fn backward(
        ctx: &BackwardContext<'_, ()>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let saved = ctx.saved_tensors()?;
        let (Some(x), Some(g)) = (&saved[0], &grad_outputs[0]) else {
            return Ok(vec![None]);
        };
        Ok(vec![Some(g.mul(&x.mul(x)?.mul_scalar(3.0)?)?)])
    }
}

/// Clamps from below at `min`; the gradient passes only where the input was kept.
#[derive(Default)]
struct ClampState {
    min: f64,
}

struct ClampMin;

impl Function for ClampMin {
    type State = ClampState;
    const NAME: &'static str = "ClampMinBackward";

    fn forward(
        ctx: &mut Context<ClampState>,
        inputs: &[Input],
    ) -> Result<Vec<Tensor>, AutofuncError> {
        let x = tensor_arg(inputs, 0, Self::NAME)?;
        let min = scalar_arg(inputs, 1, Self::NAME)?;
        let values: Vec<f64> = x.to_vec_f64().into_iter().map(|v| v.max(min)).collect();
        ctx.state_mut().min = min;
        ctx.save_for_backward([Some(x.clone())]);
        Ok(vec![Tensor::new_f64(values, x.shape())?])
    }

    fn backward(
        ctx: &BackwardContext<'_, ClampState>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        let saved = ctx.saved_tensors()?;
        let (Some(x), Some(g)) = (&saved[0], &grad_outputs[0]) else {
            return Ok(vec![None, None]);
        };
        let min = ctx.state().min;
        let mask: Vec<f64> = x
            .to_vec_f64()
            .into_iter()
            .map(|v| if v >= min { 1.0 } else { 0.0 })
            .collect();
        let mask = Tensor::new_f64(mask, x.shape())?;
        Ok(vec![Some(g.mul(&mask)?), None])
    }
}

fn cube(x: &Tensor) -> Tensor {
    Cube::apply(&[x.into()]).unwrap().remove(0)
}

#[test]
fn user_function_backward() {
    let x = leaf(vec![1.0, -2.0, 0.5], vec![3]);
    let y = cube(&x);
    assert_eq!(y.grad_fn_name(), Some("CubeBackward"));
    assert_values_near(&y, &[1.0, -8.0, 0.125], 1e-12);

    y.sum().unwrap().backward().unwrap();
    assert_values_near(&x.grad().unwrap(), &[3.0, 12.0, 0.75], 1e-12);
}

#[test]
fn user_function_twice_differentiable() {
    let x = leaf(vec![2.0], vec![1]);
    let y = cube(&x).sum().unwrap();
    let options = GradOptions {
        create_graph: true,
        ..Default::default()
    };
    let dx = grad(&[y], &[x.clone()], None, options).unwrap().remove(0).unwrap();
    assert_values_near(&dx, &[12.0], 1e-12);
    let d2x = grad(&[dx.sum().unwrap()], &[x], None, GradOptions::default())
        .unwrap()
        .remove(0)
        .unwrap();
    assert_values_near(&d2x, &[12.0], 1e-12);
}

#[test]
fn user_function_with_scalar_state() {
    let x = leaf(vec![-1.0, 0.5, 2.0], vec![3]);
    let y = ClampMin::apply(&[(&x).into(), Input::Scalar(0.0)])
        .unwrap()
        .remove(0);
    assert_values_near(&y, &[0.0, 0.5, 2.0], 1e-12);
    y.sum().unwrap().backward().unwrap();
    assert_values_near(&x.grad().unwrap(), &[0.0, 1.0, 1.0], 1e-12);
}

#[test]
fn gradients_accumulate_across_backward_calls() {
    let x = leaf(vec![1.0, 2.0], vec![2]);
    cube(&x).sum().unwrap().backward().unwrap();
    cube(&x).sum().unwrap().backward().unwrap();
    assert_values_near(&x.grad().unwrap(), &[6.0, 24.0], 1e-12);

    x.zero_grad();
    assert!(x.grad().is_none());
}

#[test]
fn retained_graph_can_be_replayed() {
    let x = leaf(vec![3.0], vec![1]);
    let y = cube(&x).sum().unwrap();
    let retain = BackwardOptions {
        retain_graph: Some(true),
        ..Default::default()
    };
    y.backward_with(None, retain).unwrap();
    y.backward().unwrap();
    assert_values_near(&x.grad().unwrap(), &[54.0], 1e-12);
    assert_eq!(
        y.backward(),
        Err(AutofuncError::SavedTensorsFreed { op: "CubeBackward" })
    );
}

#[test]
fn no_grad_records_nothing() {
    let x = leaf(vec![1.0], vec![1]);
    let y = {
        let _guard = no_grad();
        cube(&x)
    };
    assert!(!y.requires_grad());
    assert!(y.is_leaf());
}

#[test]
fn builtin_functions_compose() {
    let input = constant(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let weight = leaf(vec![0.5, -1.0, 1.5, 2.0], vec![2, 2]);
    let bias = leaf(vec![0.1, 0.2], vec![2]);

    let hidden = linear(&input, &weight, Some(&bias)).unwrap();
    let scaled = mul_constant(&hidden, 2.0).unwrap();
    let (sorted, _) = sort(&scaled.sum_to(&[2]).unwrap()).unwrap();
    let loss = sorted.mul(&constant(vec![1.0, 10.0], vec![2])).unwrap().sum().unwrap();
    loss.backward().unwrap();

    // scaled.sum_to([2]) = 2 * (column sums of input·Wᵀ + 2 * bias) = [-7.6, 36.8],
    // already ascending, so output column j gets weight [1, 10][j].
    assert_values_near(&sorted, &[-7.6, 36.8], 1e-12);
    assert_values_near(&bias.grad().unwrap(), &[4.0, 40.0], 1e-12);
    assert_values_near(&weight.grad().unwrap(), &[8.0, 12.0, 80.0, 120.0], 1e-12);
}

#[test]
fn in_place_function_inside_a_graph() {
    let x = leaf(vec![1.0, -1.0], vec![2]);
    let y = cube(&x);
    let z = scale_in_place(&y, 0.5).unwrap();
    assert!(z.is_same(&y));
    z.sum().unwrap().backward().unwrap();
    assert_values_near(&x.grad().unwrap(), &[1.5, 1.5], 1e-12);
}

#[test]
fn linear_module_trains_one_step() {
    let layer = Linear::new(3, 1, true).unwrap();
    let input = constant(vec![1.0, 0.0, -1.0, 2.0, 1.0, 0.0], vec![2, 3]);
    let target = constant(vec![1.0, -1.0], vec![2, 1]);

    let loss_of = |layer: &Linear| -> Tensor {
        let diff = layer.forward(&input).unwrap().sub(&target).unwrap();
        diff.mul(&diff).unwrap().sum().unwrap()
    };

    let before = loss_of(&layer);
    before.backward().unwrap();
    {
        let _guard = no_grad();
        for param in layer.parameters() {
            let step = param.grad().unwrap().mul_scalar(-0.05).unwrap();
            param.add_(&step).unwrap();
        }
    }
    layer.zero_grad();
    let after = loss_of(&layer);
    assert!(after.item().unwrap() < before.item().unwrap());
}
