use super::*;

#[test]
fn falsify_rmse_of_perfect_prediction_is_zero() {
    let y = Vector::from_slice(&[1.0, 2.5, 4.0]);
    assert!(rmse(&y, &y).abs() < 1e-7, "rmse(y, y) = {}", rmse(&y, &y));
    assert!(mae(&y, &y).abs() < 1e-7);
}

#[test]
fn falsify_known_values() {
    let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
    let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
    // squared errors: 0.25, 0.25, 0, 1 -> mse 0.375
    assert!((mse(&y_pred, &y_true) - 0.375).abs() < 1e-6);
    assert!((rmse(&y_pred, &y_true) - 0.375_f32.sqrt()).abs() < 1e-6);
    // abs errors: 0.5, 0.5, 0, 1 -> mae 0.5
    assert!((mae(&y_pred, &y_true) - 0.5).abs() < 1e-6);
}

#[test]
fn falsify_rmse_dominates_mae() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0]);
    let y_pred = Vector::from_slice(&[1.5, 1.0, 3.0, 6.0]);
    let r = rmse(&y_pred, &y_true);
    let m = mae(&y_pred, &y_true);
    assert!(r >= m, "rmse {r} < mae {m}");
}

#[test]
#[should_panic(expected = "Vectors must have same length")]
fn falsify_length_mismatch_panics() {
    let _ = mae(&Vector::from_slice(&[1.0]), &Vector::from_slice(&[1.0, 2.0]));
}
