use super::*;
use crate::autograd::graph::{grad, GradOptions};
use crate::utils::testing::{check_tensor_near, create_test_tensor_with_grad};

#[test]
fn test_mul_tensors_ok() {
    let t1 = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
    let t2 = Tensor::new_f64(vec![5.0, 6.0, 7.0, 8.0], vec![2, 2]).unwrap();
    let result = mul_op(&t1, &t2).unwrap();
    check_tensor_near(&result, &[2, 2], &[5.0, 12.0, 21.0, 32.0], 1e-12);
}

#[test]
fn test_mul_backward() -> Result<(), AutofuncError> {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0, 3.0], vec![3]);
    let b = create_test_tensor_with_grad(vec![4.0, 5.0, 6.0], vec![3]);
    let output = mul_op(&a, &b)?;
    assert_eq!(output.grad_fn_name(), Some("MulBackward"));
    output.sum()?.backward()?;
    check_tensor_near(&a.grad().unwrap(), &[3], &[4.0, 5.0, 6.0], 1e-12);
    check_tensor_near(&b.grad().unwrap(), &[3], &[1.0, 2.0, 3.0], 1e-12);
    Ok(())
}

#[test]
fn test_mul_backward_broadcast_scalar_operand() -> Result<(), AutofuncError> {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let s = create_test_tensor_with_grad(vec![3.0], vec![]);
    mul_op(&a, &s)?.sum()?.backward()?;
    check_tensor_near(&a.grad().unwrap(), &[2, 2], &[3.0; 4], 1e-12);
    check_tensor_near(&s.grad().unwrap(), &[], &[10.0], 1e-12);
    Ok(())
}

#[test]
fn test_mul_square_second_derivative() -> Result<(), AutofuncError> {
    let x = create_test_tensor_with_grad(vec![1.5, -2.0], vec![2]);
    let y = mul_op(&x, &x)?.sum()?;
    let options = GradOptions {
        create_graph: true,
        ..Default::default()
    };
    let dx = grad(&[y], &[x.clone()], None, options)?.remove(0).unwrap();
    check_tensor_near(&dx, &[2], &[3.0, -4.0], 1e-12);
    assert!(dx.requires_grad());

    let d2x = grad(&[dx.sum()?], &[x], None, GradOptions::default())?.remove(0).unwrap();
    check_tensor_near(&d2x, &[2], &[2.0, 2.0], 1e-12);
    Ok(())
}
