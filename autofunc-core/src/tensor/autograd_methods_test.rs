use crate::autograd::{no_grad, BackwardOptions};
use crate::error::AutofuncError;
use crate::tensor::{ones_f64, Tensor};
use crate::types::DType;
use crate::utils::testing::{check_tensor_near, create_test_tensor_with_grad};

#[test]
fn test_requires_grad_rejects_integers() {
    let t = Tensor::new_i64(vec![1, 2], vec![2]).unwrap();
    assert_eq!(
        t.requires_grad_(true),
        Err(AutofuncError::NonFloatRequiresGrad(DType::I64))
    );
    // Disabling is always fine on a leaf.
    assert!(t.requires_grad_(false).is_ok());
}

#[test]
fn test_requires_grad_on_non_leaf() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let b = a.mul_scalar(2.0).unwrap();
    assert!(!b.is_leaf());
    assert_eq!(b.grad_fn_name(), Some("MulScalarBackward"));
    assert_eq!(b.requires_grad_(false), Err(AutofuncError::RequiresGradOnNonLeaf));
}

#[test]
fn test_backward_accumulates_into_leaves() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0, 3.0], vec![3]);
    let b = create_test_tensor_with_grad(vec![4.0, 5.0, 6.0], vec![3]);
    let loss = a.mul(&b).unwrap().sum().unwrap();
    loss.backward().unwrap();

    check_tensor_near(&a.grad().unwrap(), &[3], &[4.0, 5.0, 6.0], 1e-12);
    check_tensor_near(&b.grad().unwrap(), &[3], &[1.0, 2.0, 3.0], 1e-12);
    assert!(loss.grad().is_none(), "non-leaf tensors do not keep .grad");
}

#[test]
fn test_backward_accumulates_across_calls() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    for _ in 0..2 {
        a.mul_scalar(3.0).unwrap().sum().unwrap().backward().unwrap();
    }
    check_tensor_near(&a.grad().unwrap(), &[2], &[6.0, 6.0], 1e-12);

    a.zero_grad();
    assert!(a.grad().is_none());
}

#[test]
fn test_backward_non_scalar_needs_gradient() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let b = a.mul_scalar(2.0).unwrap();
    assert_eq!(b.backward(), Err(AutofuncError::BackwardNonScalar));

    b.backward_with(Some(ones_f64(&[2]).unwrap()), BackwardOptions::default())
        .unwrap();
    check_tensor_near(&a.grad().unwrap(), &[2], &[2.0, 2.0], 1e-12);
}

#[test]
fn test_backward_without_requires_grad() {
    let a = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    assert_eq!(a.backward(), Err(AutofuncError::RequiresGradNotMet));
}

#[test]
fn test_backward_on_leaf_seeds_its_own_grad() {
    let a = create_test_tensor_with_grad(vec![5.0], vec![]);
    a.backward().unwrap();
    check_tensor_near(&a.grad().unwrap(), &[], &[1.0], 0.0);
}

#[test]
fn test_no_grad_records_nothing() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let b = {
        let _guard = no_grad();
        a.mul_scalar(2.0).unwrap()
    };
    assert!(!b.requires_grad());
    assert!(b.is_leaf());
}

#[test]
fn test_accumulated_grad_is_history_free_copy() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let seed = Tensor::new_f64(vec![1.0, 1.0], vec![2]).unwrap();
    a.backward_with(Some(seed.clone()), BackwardOptions::default())
        .unwrap();
    let grad = a.grad().unwrap();
    assert!(grad.is_leaf());
    assert!(!grad.shares_storage(&seed));
}
