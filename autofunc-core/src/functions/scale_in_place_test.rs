use super::*;
use crate::autograd::grad_check::{gradcheck, GradCheckOptions};
use crate::utils::testing::{check_tensor_near, create_test_tensor_with_grad};

#[test]
fn test_scale_in_place_without_grad() -> Result<(), AutofuncError> {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2])?;
    let version = t.version();
    let result = scale_in_place(&t, 3.0)?;
    assert!(result.is_same(&t));
    assert_eq!(t.to_vec_f64(), vec![3.0, 6.0]);
    assert_eq!(t.version(), version + 1);
    assert!(t.is_leaf());
    Ok(())
}

#[test]
fn test_scale_in_place_rebases_history() -> Result<(), AutofuncError> {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let y = x.mul_scalar(2.0)?;
    let z = scale_in_place(&y, 3.0)?;

    assert!(z.is_same(&y));
    assert_eq!(y.grad_fn_name(), Some("ScaleInPlaceBackward"));
    assert_eq!(
        y.grad_fn().unwrap().next_functions(),
        vec![Some("MulScalarBackward"), None]
    );
    check_tensor_near(&y, &[2], &[6.0, 12.0], 1e-12);

    y.sum()?.backward()?;
    check_tensor_near(&x.grad().unwrap(), &[2], &[6.0, 6.0], 1e-12);
    Ok(())
}

#[test]
fn test_scale_in_place_invalidates_earlier_saves() -> Result<(), AutofuncError> {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let y = x.mul_scalar(1.0)?;
    // `y * y` saves `y`; scaling it afterwards makes that save stale.
    let loss = y.mul(&y)?.sum()?;
    scale_in_place(&y, 2.0)?;
    assert!(matches!(
        loss.backward(),
        Err(AutofuncError::SavedTensorModified { op: "MulBackward", .. })
    ));
    Ok(())
}

#[test]
fn test_scale_in_place_on_leaf_requiring_grad() {
    let x = create_test_tensor_with_grad(vec![1.0], vec![1]);
    assert!(matches!(
        scale_in_place(&x, 2.0),
        Err(AutofuncError::InplaceOnLeaf { .. })
    ));
}

#[test]
fn test_scale_in_place_gradcheck() {
    let x = create_test_tensor_with_grad(vec![0.2, -1.4, 0.9], vec![3]);
    // Copy first: the function must not run on a leaf that requires grad.
    let func = |args: &[Input]| -> Result<Vec<Tensor>, AutofuncError> {
        let copy = tensor_arg(args, 0, "scaled_copy")?.mul_scalar(1.0)?;
        Ok(vec![scale_in_place(&copy, -2.0)?])
    };
    assert_eq!(
        gradcheck(func, &[x.into()], &GradCheckOptions::default()),
        Ok(true)
    );
}
