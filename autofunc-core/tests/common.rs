use autofunc_core::tensor::Tensor;

// Helpers shared by the integration test crates. Each test crate only uses some of them.

/// F64 leaf tensor that requires grad.
#[allow(dead_code)]
pub fn leaf(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    Tensor::new_f64(data, shape)
        .and_then(|t| t.with_requires_grad(true))
        .expect("Test tensor creation failed")
}

/// F64 tensor without gradient tracking.
#[allow(dead_code)]
pub fn constant(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    Tensor::new_f64(data, shape).expect("Test tensor creation failed")
}

/// Asserts element-wise closeness of a tensor's values.
#[allow(dead_code)]
pub fn assert_values_near(tensor: &Tensor, expected: &[f64], tolerance: f64) {
    let actual = tensor.to_vec_f64();
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            approx::abs_diff_eq!(*a, *e, epsilon = tolerance),
            "value {} differs: actual={}, expected={}",
            i,
            a,
            e
        );
    }
}
