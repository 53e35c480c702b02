//! Ordinary least squares and ridge regression emulators.

use crate::error::{EmularError, Result};
use crate::params::{ParamDistribution, ParamMap, SearchSpace};
use crate::primitives::Matrix;
use crate::traits::Emulator;

use super::{design_with_intercept, solve_ridge};

/// Multi-output linear regression fit by normal equations.
///
/// No hyperparameters; its search space is empty, so hyperparameter search
/// reduces to a single default-configuration trial.
#[derive(Debug, Clone, Default)]
pub struct LinearEmulator {
    /// Weights, shape (n_features + 1, n_targets), intercept first.
    weights: Option<Matrix<f32>>,
}

impl LinearEmulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default (empty) search space.
    #[must_use]
    pub fn search_space() -> SearchSpace {
        SearchSpace::new()
    }
}

impl Emulator for LinearEmulator {
    fn fit(&mut self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()> {
        if x.n_rows() != y.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_samples",
                x.n_rows(),
                y.n_rows(),
            ));
        }
        let design = design_with_intercept(x);
        self.weights = Some(solve_ridge(&design, y, 0.0)?);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let weights = self.weights.as_ref().ok_or(EmularError::NotFitted {
            what: "LinearEmulator".to_string(),
        })?;
        if x.n_cols() + 1 != weights.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                weights.n_rows() - 1,
                x.n_cols(),
            ));
        }
        design_with_intercept(x).matmul(weights).map_err(Into::into)
    }

    fn params(&self) -> ParamMap {
        ParamMap::new()
    }

    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        if let Some(name) = params.keys().next() {
            return Err(EmularError::invalid_parameter(
                "LinearEmulator",
                name.clone(),
                "model has no hyperparameters",
            ));
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Emulator> {
        Box::new(self.clone())
    }
}

/// Linear regression with L2 penalty on the non-intercept weights.
#[derive(Debug, Clone)]
pub struct RidgeEmulator {
    alpha: f64,
    weights: Option<Matrix<f32>>,
}

impl Default for RidgeEmulator {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            weights: None,
        }
    }
}

impl RidgeEmulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ridge with an explicit penalty strength.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a non-positive or non-finite alpha.
    pub fn with_alpha(alpha: f64) -> Result<Self> {
        validate_alpha("RidgeEmulator", "alpha", alpha)?;
        Ok(Self {
            alpha,
            weights: None,
        })
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Default search space: alpha log-uniform over [1e-3, 1e2].
    #[must_use]
    pub fn search_space() -> SearchSpace {
        SearchSpace::new().add("alpha", ParamDistribution::continuous_log(1e-3, 1e2))
    }
}

pub(crate) fn validate_alpha(model: &str, param: &str, alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha <= 0.0 {
        return Err(EmularError::invalid_parameter(
            model,
            param,
            format!("must be a positive finite number, got {alpha}"),
        ));
    }
    Ok(())
}

impl Emulator for RidgeEmulator {
    fn fit(&mut self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()> {
        if x.n_rows() != y.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_samples",
                x.n_rows(),
                y.n_rows(),
            ));
        }
        let design = design_with_intercept(x);
        self.weights = Some(solve_ridge(&design, y, self.alpha as f32)?);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let weights = self.weights.as_ref().ok_or(EmularError::NotFitted {
            what: "RidgeEmulator".to_string(),
        })?;
        if x.n_cols() + 1 != weights.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                weights.n_rows() - 1,
                x.n_cols(),
            ));
        }
        design_with_intercept(x).matmul(weights).map_err(Into::into)
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("alpha".to_string(), self.alpha.into());
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        // Validate everything before mutating anything.
        let mut alpha = None;
        for (name, value) in params {
            match name.as_str() {
                "alpha" => {
                    let v = value.as_f64().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "RidgeEmulator",
                            "alpha",
                            format!("expected a number, got {value}"),
                        )
                    })?;
                    validate_alpha("RidgeEmulator", "alpha", v)?;
                    alpha = Some(v);
                }
                other => {
                    return Err(EmularError::invalid_parameter(
                        "RidgeEmulator",
                        other,
                        "no such parameter",
                    ));
                }
            }
        }
        if let Some(v) = alpha {
            self.alpha = v;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Emulator> {
        Box::new(self.clone())
    }
}
