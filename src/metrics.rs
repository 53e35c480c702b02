//! Evaluation metrics for emulator comparison.
//!
//! Regression metrics only: RMSE (primary, lower is better) and R²
//! (secondary, higher is better). Multi-target variants average uniformly
//! across target columns.

use crate::primitives::{Matrix, Vector};

/// Computes the coefficient of determination (R²).
///
/// R² = 1 - (`SS_res` / `SS_tot`). Returns 0.0 when the true values have
/// zero variance.
///
/// # Examples
///
/// ```
/// use emular::metrics::r_squared;
/// use emular::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
/// let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
/// assert!(r_squared(&y_pred, &y_true) > 0.9);
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn r_squared(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");

    let y_mean = y_true.mean();

    let ss_res: f32 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f32 = y_true.as_slice().iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return 0.0;
    }

    1.0 - (ss_res / ss_tot)
}

/// Computes root mean squared error.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn rmse(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    if y_true.is_empty() {
        return 0.0;
    }

    let mse: f32 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f32>()
        / y_true.len() as f32;

    mse.sqrt()
}

/// RMSE over a multi-target prediction, averaged uniformly across targets.
///
/// # Panics
///
/// Panics if shapes differ.
#[must_use]
pub fn rmse_multi(y_pred: &Matrix<f32>, y_true: &Matrix<f32>) -> f32 {
    assert_eq!(y_pred.shape(), y_true.shape(), "Shapes must match");
    let n_targets = y_true.n_cols();
    if n_targets == 0 {
        return 0.0;
    }
    (0..n_targets)
        .map(|j| rmse(&y_pred.column(j), &y_true.column(j)))
        .sum::<f32>()
        / n_targets as f32
}

/// R² over a multi-target prediction, averaged uniformly across targets.
///
/// A zero-variance target column contributes 0.0.
///
/// # Panics
///
/// Panics if shapes differ.
#[must_use]
pub fn r_squared_multi(y_pred: &Matrix<f32>, y_true: &Matrix<f32>) -> f32 {
    assert_eq!(y_pred.shape(), y_true.shape(), "Shapes must match");
    let n_targets = y_true.n_cols();
    if n_targets == 0 {
        return 0.0;
    }
    (0..n_targets)
        .map(|j| r_squared(&y_pred.column(j), &y_true.column(j)))
        .sum::<f32>()
        / n_targets as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r_squared_perfect_prediction() {
        let y = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_r_squared_mean_prediction_is_zero() {
        let y_true = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let y_pred = Vector::from_slice(&[2.0, 2.0, 2.0]);
        assert!(r_squared(&y_pred, &y_true).abs() < 1e-6);
    }

    #[test]
    fn test_r_squared_constant_target_is_zero() {
        let y_true = Vector::from_slice(&[5.0, 5.0, 5.0]);
        let y_pred = Vector::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(r_squared(&y_pred, &y_true), 0.0);
    }

    #[test]
    fn test_rmse_known_value() {
        let y_true = Vector::from_slice(&[0.0, 0.0]);
        let y_pred = Vector::from_slice(&[3.0, 4.0]);
        // sqrt((9 + 16) / 2) = sqrt(12.5)
        assert!((rmse(&y_pred, &y_true) - 12.5_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_rmse_perfect_is_zero() {
        let y = Vector::from_slice(&[1.0, -2.0, 3.0]);
        assert_eq!(rmse(&y, &y), 0.0);
    }

    #[test]
    fn test_rmse_multi_averages_targets() {
        // Target 0 perfect, target 1 constant error of 2.
        let y_true = Matrix::from_vec(2, 2, vec![1.0, 0.0, 2.0, 0.0]).expect("matrix");
        let y_pred = Matrix::from_vec(2, 2, vec![1.0, 2.0, 2.0, 2.0]).expect("matrix");
        assert!((rmse_multi(&y_pred, &y_true) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_r_squared_multi_averages_targets() {
        // Target 0 predicted perfectly, target 1 predicted at its mean.
        let y_true = Matrix::from_vec(3, 2, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]).expect("matrix");
        let y_pred = Matrix::from_vec(3, 2, vec![1.0, 2.0, 2.0, 2.0, 3.0, 2.0]).expect("matrix");
        assert!((r_squared_multi(&y_pred, &y_true) - 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_rmse_length_mismatch_panics() {
        let a = Vector::from_slice(&[1.0, 2.0]);
        let b = Vector::from_slice(&[1.0]);
        let _ = rmse(&a, &b);
    }
}
