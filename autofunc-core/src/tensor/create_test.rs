use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_zeros_and_ones() {
    let z = zeros(&[2, 3]).unwrap();
    assert_eq!(z.shape(), vec![2, 3]);
    assert_eq!(z.dtype(), DType::F32);
    assert!(z.to_vec_f64().iter().all(|&v| v == 0.0));

    let o = ones_f64(&[4]).unwrap();
    assert_eq!(o.dtype(), DType::F64);
    assert_eq!(o.to_vec_f64(), vec![1.0; 4]);
}

#[test]
fn test_like_constructors_keep_dtype() {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    let z = zeros_like(&t).unwrap();
    assert_eq!(z.dtype(), DType::F64);
    assert_eq!(z.shape(), vec![2]);
    assert_eq!(ones_like(&t).unwrap().to_vec_f64(), vec![1.0, 1.0]);
}

#[test]
fn test_scalar_f64() {
    let s = scalar_f64(2.5).unwrap();
    assert!(s.shape().is_empty());
    assert_eq!(s.numel(), 1);
    assert_eq!(s.item().unwrap(), 2.5);
}

#[test]
fn test_randn_f64_with_rng_is_reproducible() {
    let a = randn_f64_with_rng(&[3, 3], &mut StdRng::seed_from_u64(7)).unwrap();
    let b = randn_f64_with_rng(&[3, 3], &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a.to_vec_f64(), b.to_vec_f64());
    assert_eq!(a.dtype(), DType::F64);
}

#[test]
fn test_uniform_range() {
    let t = uniform_f64_with_rng(&[100], -0.1, 0.1, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(t.to_vec_f64().iter().all(|&v| (-0.1..0.1).contains(&v)));
    assert!(uniform_f64_with_rng(&[1], 1.0, 1.0, &mut StdRng::seed_from_u64(1)).is_err());
}

#[test]
fn test_rand_and_randn_shapes() {
    assert_eq!(rand(&[2, 2]).unwrap().shape(), vec![2, 2]);
    assert_eq!(randn(&[5]).unwrap().dtype(), DType::F32);
    assert_eq!(rand_f64(&[3]).unwrap().dtype(), DType::F64);
    assert_eq!(randn_f64(&[1, 4]).unwrap().numel(), 4);
}
