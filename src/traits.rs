//! Core capability traits for emulators and data transformers.
//!
//! Emulators are heterogeneous (direct estimators, staged pipelines), so the
//! engine talks to them through a uniform fit/predict/params capability
//! contract rather than a shared base type.

use crate::error::Result;
use crate::params::ParamMap;
use crate::primitives::Matrix;

/// Capability contract every candidate emulator implements.
///
/// `Y` is a matrix so simulators with several outputs are first-class;
/// single-output data is just `n_targets = 1`.
///
/// # Examples
///
/// ```
/// use emular::prelude::*;
/// use emular::emulators::LinearEmulator;
///
/// // y0 = 2x + 1, y1 = -x
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let y = Matrix::from_vec(4, 2, vec![3.0, -1.0, 5.0, -2.0, 7.0, -3.0, 9.0, -4.0]).unwrap();
///
/// let mut model = LinearEmulator::new();
/// model.fit(&x, &y).unwrap();
/// let pred = model.predict(&x).unwrap();
/// assert_eq!(pred.shape(), (4, 2));
/// ```
pub trait Emulator: Send + std::fmt::Debug {
    /// Fits the model to training data.
    ///
    /// Mutates internal learned state only; the inputs are never modified.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, singular
    /// system, numerical instability, etc.).
    fn fit(&mut self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()>;

    /// Predicts target values for input data.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before `fit`, or a dimension error when `x` has
    /// the wrong number of features.
    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Current hyperparameter values, keyed by (possibly qualified) name.
    fn params(&self) -> ParamMap;

    /// Applies hyperparameter values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when a key does not exist for this model
    /// or a value is outside its domain. Validation happens before any
    /// value is applied.
    fn set_params(&mut self, params: &ParamMap) -> Result<()>;

    /// Fresh boxed copy, used to obtain one independent instance per fold.
    fn clone_box(&self) -> Box<dyn Emulator>;
}

impl Clone for Box<dyn Emulator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Trait for data transformers (scalers, dimensionality reducers).
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}
