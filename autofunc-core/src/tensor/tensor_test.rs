use super::*;
use crate::error::AutofuncError;

#[test]
fn test_new_validates_length() {
    let err = Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
    assert_eq!(
        err,
        AutofuncError::TensorCreationError {
            data_len: 3,
            shape: vec![2, 2]
        }
    );
}

#[test]
fn test_f32_values_are_rounded() {
    let t = Tensor::new(vec![0.1], vec![1]).unwrap();
    assert_eq!(t.dtype(), DType::F32);
    assert_eq!(t.to_vec_f64(), vec![f64::from(0.1f32)]);

    let d = Tensor::new_f64(vec![0.1], vec![1]).unwrap();
    assert_eq!(d.to_vec_f64(), vec![0.1]);
}

#[test]
fn test_accessors() {
    let t = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
    assert_eq!(t.shape(), vec![2, 3]);
    assert_eq!(t.rank(), 2);
    assert_eq!(t.numel(), 6);
    assert_eq!(t.version(), 0);
    assert!(t.is_leaf());
    assert!(!t.requires_grad());
}

#[test]
fn test_item() {
    let s = scalar_f64(4.5).unwrap();
    assert_eq!(s.item().unwrap(), 4.5);

    let v = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    assert!(matches!(v.item(), Err(AutofuncError::ShapeMismatch { .. })));
}

#[test]
fn test_clone_is_same_handle() {
    let t = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let c = t.clone();
    assert!(t.is_same(&c));
    assert!(t.shares_storage(&c));
}

#[test]
fn test_detach_shares_storage_but_not_identity() {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2])
        .unwrap()
        .with_requires_grad(true)
        .unwrap();
    let d = t.detach();
    assert!(!d.is_same(&t));
    assert!(d.shares_storage(&t));
    assert!(!d.requires_grad());

    d.mul_scalar_(3.0).unwrap();
    assert_eq!(t.to_vec_f64(), vec![3.0, 6.0]);
    assert_eq!(t.version(), 1);
}

#[test]
fn test_deep_copy_owns_storage() {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    let copy = t.deep_copy().unwrap();
    assert!(!copy.shares_storage(&t));
    copy.fill_(0.0).unwrap();
    assert_eq!(t.to_vec_f64(), vec![1.0, 2.0]);
}

#[test]
fn test_debug_shows_grad_fn() {
    let a = Tensor::new_f64(vec![1.0, 2.0], vec![2])
        .unwrap()
        .with_requires_grad(true)
        .unwrap();
    let b = a.mul_scalar(2.0).unwrap();
    let text = format!("{:?}", b);
    assert!(text.contains("shape=[2]"));
    assert!(text.contains("MulScalarBackward"));
    assert!(text.contains("requires_grad=true"));
}
