pub(crate) use super::*;

#[test]
fn test_from_vec() {
    let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .expect("test data has correct dimensions: 2*3=6 elements");
    assert_eq!(m.shape(), (2, 3));
    assert!((m.get(0, 0) - 1.0).abs() < 1e-6);
    assert!((m.get(1, 2) - 6.0).abs() < 1e-6);
}

#[test]
fn test_from_vec_error() {
    let result = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0]);
    assert!(result.is_err());
}

#[test]
fn test_zeros() {
    let m = Matrix::<f32>::zeros(2, 3);
    assert_eq!(m.shape(), (2, 3));
    assert!(m.as_slice().iter().all(|&x| x == 0.0));
}

#[test]
fn test_zero_rows_is_valid() {
    let m = Matrix::<f32>::zeros(0, 4);
    assert_eq!(m.shape(), (0, 4));
    assert!(m.as_slice().is_empty());
}

#[test]
fn test_from_fn() {
    let m = Matrix::from_fn(2, 2, |i, j| (i * 10 + j) as f32);
    assert!((m.get(1, 0) - 10.0).abs() < 1e-6);
    assert!((m.get(1, 1) - 11.0).abs() < 1e-6);
}

#[test]
fn test_row_slice_mut_writes_through() {
    let mut m = Matrix::<f32>::zeros(2, 2);
    m.row_slice_mut(1)[0] = 3.5;
    assert!((m.get(1, 0) - 3.5).abs() < 1e-6);
    assert!((m.get(0, 0)).abs() < 1e-6);
}

#[test]
fn test_row_dot() {
    let a = Matrix::from_vec(1, 3, vec![1.0_f32, 2.0, 3.0]).expect("1x3");
    let b = Matrix::from_vec(2, 3, vec![0.0_f32, 0.0, 0.0, 4.0, 5.0, 6.0]).expect("2x3");
    // 1*4 + 2*5 + 3*6 = 32
    assert!((a.row_dot(0, &b, 1) - 32.0).abs() < 1e-6);
    assert!(a.row_dot(0, &b, 0).abs() < 1e-6);
}

#[test]
fn test_row_distance_sq() {
    let m = Matrix::from_vec(1, 2, vec![0.0_f32, 0.0]).expect("1x2");
    assert!((m.row_distance_sq(0, &[3.0, 4.0]) - 25.0).abs() < 1e-6);
}
