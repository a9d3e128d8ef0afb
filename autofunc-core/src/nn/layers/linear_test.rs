use super::*;
use crate::tensor::create::randn_f64_with_rng;
use crate::types::DType;
use crate::utils::testing::{check_tensor_near, seeded_rng};

#[test]
fn test_linear_creation() -> Result<(), AutofuncError> {
    let layer = Linear::new_with_rng(4, 3, true, &mut seeded_rng(0))?;
    assert_eq!(layer.in_features(), 4);
    assert_eq!(layer.out_features(), 3);
    assert_eq!(layer.weight().shape(), vec![3, 4]);
    assert_eq!(layer.weight().dtype(), DType::F64);
    assert!(layer.weight().requires_grad());
    assert_eq!(layer.bias().map(|b| b.shape()), Some(vec![3]));
    assert!(layer
        .weight()
        .to_vec_f64()
        .iter()
        .all(|w| (-INIT_BOUND..INIT_BOUND).contains(w)));
    Ok(())
}

#[test]
fn test_linear_is_deterministic_for_a_seed() -> Result<(), AutofuncError> {
    let a = Linear::new_with_rng(2, 2, true, &mut seeded_rng(5))?;
    let b = Linear::new_with_rng(2, 2, true, &mut seeded_rng(5))?;
    assert_eq!(a.weight().to_vec_f64(), b.weight().to_vec_f64());
    Ok(())
}

#[test]
fn test_linear_without_bias() -> Result<(), AutofuncError> {
    let layer = Linear::new(2, 5, false)?;
    assert!(layer.bias().is_none());
    assert_eq!(layer.parameters().len(), 1);
    let names: Vec<String> = layer.named_parameters().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["weight".to_string()]);
    Ok(())
}

#[test]
fn test_linear_named_parameters() -> Result<(), AutofuncError> {
    let layer = Linear::new(2, 5, true)?;
    let named = layer.named_parameters();
    assert_eq!(named.len(), 2);
    assert_eq!(named[0].0, "weight");
    assert_eq!(named[1].0, "bias");
    assert_eq!(named[1].1.name(), Some("bias"));
    Ok(())
}

#[test]
fn test_linear_forward_matches_function() -> Result<(), AutofuncError> {
    let layer = Linear::new_with_rng(3, 2, true, &mut seeded_rng(1))?;
    let input = randn_f64_with_rng(&[4, 3], &mut seeded_rng(2))?;
    let output = layer.forward(&input)?;
    assert_eq!(output.shape(), vec![4, 2]);
    assert_eq!(output.grad_fn_name(), Some("LinearFunctionBackward"));

    let expected = linear(&input, layer.weight(), layer.bias().map(|b| &**b))?;
    check_tensor_near(&output, &[4, 2], &expected.to_vec_f64(), 1e-12);
    Ok(())
}

#[test]
fn test_linear_backward_fills_parameter_grads() -> Result<(), AutofuncError> {
    let layer = Linear::new_with_rng(3, 2, true, &mut seeded_rng(3))?;
    let input = Tensor::new_f64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
    layer.forward(&input)?.sum()?.backward()?;

    let weight_grad = layer.weight().grad().unwrap();
    check_tensor_near(&weight_grad, &[2, 3], &[5.0, 7.0, 9.0, 5.0, 7.0, 9.0], 1e-12);
    let bias_grad = layer.bias().unwrap().grad().unwrap();
    check_tensor_near(&bias_grad, &[2], &[2.0, 2.0], 1e-12);

    layer.zero_grad();
    assert!(layer.weight().grad().is_none());
    assert!(layer.bias().unwrap().grad().is_none());
    Ok(())
}

#[test]
fn test_linear_rejects_wrong_feature_count() -> Result<(), AutofuncError> {
    let layer = Linear::new(3, 2, true)?;
    let input = Tensor::new_f64(vec![1.0; 8], vec![2, 4])?;
    assert!(matches!(
        layer.forward(&input),
        Err(AutofuncError::ShapeMismatch { .. })
    ));
    let flat = Tensor::new_f64(vec![1.0; 3], vec![3])?;
    assert!(matches!(
        layer.forward(&flat),
        Err(AutofuncError::ShapeMismatch { .. })
    ));
    Ok(())
}
