use super::*;
use crate::utils::testing::{check_tensor_near, create_test_tensor_with_grad};

#[test]
fn test_expand_row() {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    let e = expand_op(&t, &[3, 2]).unwrap();
    check_tensor_near(&e, &[3, 2], &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0], 1e-12);
}

#[test]
fn test_expand_scalar() {
    let t = Tensor::new_f64(vec![4.0], vec![]).unwrap();
    check_tensor_near(&expand_op(&t, &[2, 2]).unwrap(), &[2, 2], &[4.0; 4], 1e-12);
}

#[test]
fn test_expand_rejects_incompatible_shape() {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    assert!(matches!(
        expand_op(&t, &[3]),
        Err(AutofuncError::BroadcastError { .. })
    ));
    // Expanding must not shrink.
    let big = Tensor::new_f64(vec![1.0; 4], vec![2, 2]).unwrap();
    assert!(matches!(
        expand_op(&big, &[2]),
        Err(AutofuncError::BroadcastError { .. })
    ));
}

#[test]
fn test_expand_backward_sums() -> Result<(), AutofuncError> {
    let t = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2, 1]);
    let e = expand_op(&t, &[2, 3])?;
    assert_eq!(e.grad_fn_name(), Some("ExpandBackward"));
    let seed = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
    e.backward_with(Some(seed), Default::default())?;
    check_tensor_near(&t.grad().unwrap(), &[2, 1], &[6.0, 15.0], 1e-12);
    Ok(())
}
