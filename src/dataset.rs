//! Input data container and train/test partitioning.

use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{EmularError, Result};
use crate::primitives::Matrix;

/// Paired inputs and targets for one comparison run.
///
/// Rows are samples; `x` columns are simulator inputs, `y` columns are
/// simulator outputs. Construction validates that both sides describe the
/// same samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Matrix<f32>,
    y: Matrix<f32>,
}

impl Dataset {
    /// Builds a dataset from an input matrix and a target matrix.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the row counts differ, and an
    /// invalid-configuration error for empty data.
    pub fn new(x: Matrix<f32>, y: Matrix<f32>) -> Result<Self> {
        if x.n_rows() != y.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_samples",
                x.n_rows(),
                y.n_rows(),
            ));
        }
        if x.n_rows() == 0 {
            return Err(EmularError::invalid_configuration(
                "dataset must contain at least one sample",
            ));
        }
        if x.n_cols() == 0 || y.n_cols() == 0 {
            return Err(EmularError::invalid_configuration(
                "dataset must have at least one input and one output column",
            ));
        }
        Ok(Self { x, y })
    }

    /// Input matrix, shape (`n_samples`, `n_features`).
    #[must_use]
    pub fn x(&self) -> &Matrix<f32> {
        &self.x
    }

    /// Target matrix, shape (`n_samples`, `n_targets`).
    #[must_use]
    pub fn y(&self) -> &Matrix<f32> {
        &self.y
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.x.n_rows()
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.n_cols()
    }

    /// Number of target outputs.
    #[must_use]
    pub fn n_targets(&self) -> usize {
        self.y.n_cols()
    }

    /// Dataset restricted to the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.take_rows(indices),
            y: self.y.take_rows(indices),
        }
    }
}

/// Splits a dataset into shuffled train and test partitions.
///
/// `test_size` is the held-out fraction, strictly between 0 and 1. The same
/// `random_state` always produces the same split. The test partition gets
/// `round(n * test_size)` samples, at least 1, and at least 1 sample stays
/// in training.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for a `test_size` outside (0, 1) or a
/// dataset too small to leave both partitions non-empty.
pub fn train_test_split(
    data: &Dataset,
    test_size: f64,
    random_state: u64,
) -> Result<(Dataset, Dataset)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(EmularError::invalid_configuration(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n = data.n_samples();
    if n < 2 {
        return Err(EmularError::invalid_configuration(
            "train/test split needs at least 2 samples",
        ));
    }

    let mut n_test = (n as f64 * test_size).round() as usize;
    n_test = n_test.clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(random_state);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((data.take_rows(train_idx), data.take_rows(test_idx)))
}
