//! Second-order polynomial surrogate: feature expansion into a ridge solve.
//!
//! A two-stage pipeline, so its hyperparameters are qualified per stage:
//! `expand.interactions` and `ridge.alpha`.

use crate::error::{EmularError, Result};
use crate::params::{ParamDistribution, ParamMap, SearchSpace};
use crate::primitives::Matrix;
use crate::traits::Emulator;

use super::linear::validate_alpha;
use super::{design_with_intercept, solve_ridge};

/// Degree-2 polynomial regression with an L2-penalized solve.
///
/// Expands inputs to squares (and optionally pairwise interaction terms),
/// then fits ridge regression on the expanded features.
#[derive(Debug, Clone)]
pub struct SecondOrderPolynomial {
    interactions: bool,
    alpha: f64,
    n_features: Option<usize>,
    weights: Option<Matrix<f32>>,
}

impl Default for SecondOrderPolynomial {
    fn default() -> Self {
        Self {
            interactions: true,
            alpha: 1e-6,
            n_features: None,
            weights: None,
        }
    }
}

impl SecondOrderPolynomial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default search space over both stages.
    #[must_use]
    pub fn search_space() -> SearchSpace {
        SearchSpace::new()
            .add(
                "expand.interactions",
                ParamDistribution::categorical([true, false]),
            )
            .add("ridge.alpha", ParamDistribution::continuous_log(1e-6, 1e1))
    }

    /// Expanded features: [x_i..., x_i^2..., x_i * x_j (i < j)...].
    fn expand(&self, x: &Matrix<f32>) -> Matrix<f32> {
        let (n, p) = x.shape();
        let n_expanded = if self.interactions {
            2 * p + p * (p - 1) / 2
        } else {
            2 * p
        };
        let mut data = Vec::with_capacity(n * n_expanded);
        for i in 0..n {
            for j in 0..p {
                data.push(x.get(i, j));
            }
            for j in 0..p {
                let v = x.get(i, j);
                data.push(v * v);
            }
            if self.interactions {
                for a in 0..p {
                    for b in (a + 1)..p {
                        data.push(x.get(i, a) * x.get(i, b));
                    }
                }
            }
        }
        Matrix::from_vec(n, n_expanded, data).expect("expansion dimensions are consistent")
    }
}

impl Emulator for SecondOrderPolynomial {
    fn fit(&mut self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()> {
        if x.n_rows() != y.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_samples",
                x.n_rows(),
                y.n_rows(),
            ));
        }
        if x.n_cols() == 0 {
            return Err(EmularError::dimension_mismatch("n_features", 1, 0));
        }
        let expanded = self.expand(x);
        let design = design_with_intercept(&expanded);
        self.weights = Some(solve_ridge(&design, y, self.alpha as f32)?);
        self.n_features = Some(x.n_cols());
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let weights = self.weights.as_ref().ok_or(EmularError::NotFitted {
            what: "SecondOrderPolynomial".to_string(),
        })?;
        let n_features = self.n_features.expect("set together with weights");
        if x.n_cols() != n_features {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                n_features,
                x.n_cols(),
            ));
        }
        let expanded = self.expand(x);
        design_with_intercept(&expanded)
            .matmul(weights)
            .map_err(Into::into)
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("expand.interactions".to_string(), self.interactions.into());
        params.insert("ridge.alpha".to_string(), self.alpha.into());
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        let mut interactions = None;
        let mut alpha = None;
        for (name, value) in params {
            match name.as_str() {
                "expand.interactions" => {
                    interactions = Some(value.as_bool().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "SecondOrderPolynomial",
                            "expand.interactions",
                            format!("expected a bool, got {value}"),
                        )
                    })?);
                }
                "ridge.alpha" => {
                    let v = value.as_f64().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "SecondOrderPolynomial",
                            "ridge.alpha",
                            format!("expected a number, got {value}"),
                        )
                    })?;
                    validate_alpha("SecondOrderPolynomial", "ridge.alpha", v)?;
                    alpha = Some(v);
                }
                other => {
                    return Err(EmularError::invalid_parameter(
                        "SecondOrderPolynomial",
                        other,
                        "no such parameter",
                    ));
                }
            }
        }
        if let Some(v) = interactions {
            self.interactions = v;
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
