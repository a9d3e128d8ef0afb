use autofunc_core::autograd::{
    gradcheck, gradgradcheck, tensor_arg, GradCheckError, GradCheckOptions,
};
use autofunc_core::functions::{Exp, LinearFunction, MulConstant, Sort};
use autofunc_core::tensor::randn_f64_with_rng;
use autofunc_core::{AutofuncError, BackwardContext, Context, Function, Input, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod common;
use common::leaf;

fn random_leaf(rng: &mut StdRng, shape: &[usize]) -> Tensor {
    randn_f64_with_rng(shape, rng)
        .and_then(|t| t.with_requires_grad(true))
        .expect("random tensor")
}

fn loose() -> GradCheckOptions {
    GradCheckOptions {
        eps: 1e-6,
        atol: 1e-4,
        ..Default::default()
    }
}

/// Doubles its input; backward forgets the factor two.
struct DoubleWithWrongBackward;

impl Function for DoubleWithWrongBackward {
    type State = ();
    const NAME: &'static str = "DoubleWithWrongBackward";

    fn forward(_ctx: &mut Context<()>, inputs: &[Input]) -> Result<Vec<Tensor>, AutofuncError> {
        Ok(vec![tensor_arg(inputs, 0, Self::NAME)?.mul_scalar(2.0)?])
    }

    fn backward(
        _ctx: &BackwardContext<'_, ()>,
        grad_outputs: &[Option<Tensor>],
    ) -> Result<Vec<Option<Tensor>>, AutofuncError> {
        Ok(vec![grad_outputs[0].clone()])
    }
}

#[test]
fn linear_20x20_by_30x20() {
    let mut rng = StdRng::seed_from_u64(2024);
    let input = random_leaf(&mut rng, &[20, 20]);
    let weight = random_leaf(&mut rng, &[30, 20]);
    let result = gradcheck(
        |args: &[Input]| LinearFunction::apply(args),
        &[input.into(), weight.into()],
        &loose(),
    );
    assert_eq!(result, Ok(true));
}

#[test]
fn linear_over_several_samples() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5 {
        let inputs = [
            Input::from(random_leaf(&mut rng, &[3, 4])),
            Input::from(random_leaf(&mut rng, &[2, 4])),
            Input::from(random_leaf(&mut rng, &[2])),
        ];
        assert_eq!(
            gradcheck(|args: &[Input]| LinearFunction::apply(args), &inputs, &loose()),
            Ok(true)
        );
    }
}

#[test]
fn mul_constant_over_several_samples() {
    let mut rng = StdRng::seed_from_u64(12);
    for constant in [-2.0, 0.0, 0.5, 7.25] {
        let x = random_leaf(&mut rng, &[3, 3]);
        assert_eq!(
            gradcheck(
                |args: &[Input]| MulConstant::apply(args),
                &[x.into(), Input::Scalar(constant)],
                &loose()
            ),
            Ok(true)
        );
    }
}

#[test]
fn second_order_checks() {
    let mut rng = StdRng::seed_from_u64(13);
    let options = loose();

    let linear_inputs = [
        Input::from(random_leaf(&mut rng, &[2, 3])),
        Input::from(random_leaf(&mut rng, &[4, 3])),
        Input::from(random_leaf(&mut rng, &[4])),
    ];
    assert_eq!(
        gradgradcheck(
            |args: &[Input]| LinearFunction::apply(args),
            &linear_inputs,
            None,
            &options
        ),
        Ok(true)
    );

    let x = random_leaf(&mut rng, &[4]);
    assert_eq!(
        gradgradcheck(
            |args: &[Input]| MulConstant::apply(args),
            &[x.into(), Input::Scalar(3.0)],
            None,
            &options
        ),
        Ok(true)
    );

    let x = random_leaf(&mut rng, &[4]);
    assert_eq!(
        gradgradcheck(|args: &[Input]| Exp::apply(args), &[x.into()], None, &options),
        Ok(true)
    );
}

#[test]
fn once_differentiable_sort_fails_second_order() {
    let x = leaf(vec![0.4, -0.9, 1.7, 0.1], vec![4]);
    // First order is fine.
    assert_eq!(
        gradcheck(|args: &[Input]| Sort::apply(args), &[(&x).into()], &loose()),
        Ok(true)
    );
    assert_eq!(
        gradgradcheck(|args: &[Input]| Sort::apply(args), &[x.into()], None, &loose()),
        Err(GradCheckError::BackwardPassError(
            AutofuncError::DoubleBackwardUnsupported { op: "SortBackward" }
        ))
    );
}

#[test]
fn wrong_backward_is_caught() {
    let x = leaf(vec![1.0, 2.0], vec![2]);
    let func = |args: &[Input]| DoubleWithWrongBackward::apply(args);

    let quiet = GradCheckOptions {
        raise_exception: false,
        ..loose()
    };
    assert_eq!(gradcheck(func, &[(&x).into()], &quiet), Ok(false));

    match gradcheck(func, &[x.into()], &loose()) {
        Err(GradCheckError::JacobianMismatch {
            analytical,
            numerical,
            ..
        }) => {
            assert!((analytical - 1.0).abs() < 1e-12);
            assert!((numerical - 2.0).abs() < 1e-6);
        }
        other => panic!("expected a Jacobian mismatch, got {:?}", other),
    }
}

#[test]
fn single_precision_input_is_rejected() {
    let x = Tensor::new(vec![1.0, 2.0], vec![2])
        .and_then(|t| t.with_requires_grad(true))
        .unwrap();
    assert_eq!(
        gradcheck(|args: &[Input]| Exp::apply(args), &[x.into()], &loose()),
        Err(GradCheckError::LowPrecisionInput {
            input_index: 0,
            dtype: autofunc_core::DType::F32,
        })
    );
}
