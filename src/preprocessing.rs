//! Data transformers: feature scaling and dimensionality reduction.
//!
//! The orchestrator fits these on the training partition only. Inside
//! cross-validation the runner can additionally refit a scaler per fold so
//! no held-out statistics leak into a fold's training step.

use serde::{Deserialize, Serialize};

use crate::error::{EmularError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// Uses population standard deviation (divide by n). Features with
/// near-zero variance are centered but not scaled.
///
/// # Example
///
/// ```
/// use emular::prelude::*;
/// use emular::preprocessing::StandardScaler;
///
/// let data = Matrix::from_vec(3, 1, vec![0.0, 5.0, 10.0]).expect("matrix");
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("fit_transform");
/// assert!(scaled.column(0).mean().abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
}

impl StandardScaler {
    /// Create a new unfitted scaler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted per-feature means.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn mean(&self) -> &[f32] {
        self.mean.as_ref().expect("StandardScaler not fitted")
    }

    /// Fitted per-feature standard deviations.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn std(&self) -> &[f32] {
        self.std.as_ref().expect("StandardScaler not fitted")
    }

    /// Whether `fit` has been called.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err("Cannot fit scaler with zero samples".into());
        }

        let mut mean = vec![0.0; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x.get(i, j);
            }
            *mean_j = sum / n_samples as f32;
        }

        let mut std = vec![0.0; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x.get(i, j) - mean[j];
                sum_sq += diff * diff;
            }
            *std_j = (sum_sq / n_samples as f32).sqrt();
        }

        self.mean = Some(mean);
        self.std = Some(std);

        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self.mean.as_ref().ok_or(EmularError::NotFitted {
            what: "StandardScaler".to_string(),
        })?;
        let std = self.std.as_ref().ok_or(EmularError::NotFitted {
            what: "StandardScaler".to_string(),
        })?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                mean.len(),
                n_features,
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j) - mean[j];
                if std[j] > 1e-10 {
                    val /= std[j];
                }
                result[i * n_features + j] = val;
            }
        }

        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

/// Principal component analysis via power iteration with deflation.
///
/// Projects features onto the top `n_components` eigenvectors of the
/// training covariance matrix. Deterministic: the iteration always starts
/// from the same initial vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    n_components: usize,
    mean: Option<Vec<f32>>,
    /// Component matrix, shape (n_features, n_components).
    components: Option<Matrix<f32>>,
}

impl Pca {
    /// Create a PCA reducer keeping `n_components` components.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            mean: None,
            components: None,
        }
    }

    /// Number of components kept.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Whether `fit` has been called.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.components.is_some()
    }

    /// Dominant eigenvector of `cov` by power iteration.
    fn dominant_eigenvector(cov: &Matrix<f32>) -> (Vec<f32>, f32) {
        let n = cov.n_rows();
        // Deterministic start, slightly asymmetric so it is not orthogonal
        // to the dominant eigenvector by construction.
        let mut v: Vec<f32> = (0..n).map(|i| 1.0 + 0.01 * i as f32).collect();
        normalize(&mut v);

        let mut eigenvalue = 0.0;
        for _ in 0..200 {
            let mut next = vec![0.0_f32; n];
            for (i, next_i) in next.iter_mut().enumerate() {
                for (j, &v_j) in v.iter().enumerate() {
                    *next_i += cov.get(i, j) * v_j;
                }
            }
            let norm = next.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-12 {
                eigenvalue = 0.0;
                break;
            }
            for x in &mut next {
                *x /= norm;
            }
            let delta: f32 = next
                .iter()
                .zip(v.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f32::max);
            v = next;
            eigenvalue = norm;
            if delta < 1e-7 {
                break;
            }
        }
        (v, eigenvalue)
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

impl Transformer for Pca {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples < 2 {
            return Err("PCA needs at least 2 samples".into());
        }
        if self.n_components == 0 || self.n_components > n_features {
            return Err(EmularError::invalid_configuration(format!(
                "n_components must be in [1, {n_features}], got {}",
                self.n_components
            )));
        }

        let mut mean = vec![0.0_f32; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            for i in 0..n_samples {
                *mean_j += x.get(i, j);
            }
            *mean_j /= n_samples as f32;
        }

        // Covariance of the centered data.
        let mut cov = Matrix::zeros(n_features, n_features);
        for i in 0..n_samples {
            for a in 0..n_features {
                let da = x.get(i, a) - mean[a];
                for b in a..n_features {
                    let db = x.get(i, b) - mean[b];
                    let v = cov.get(a, b) + da * db;
                    cov.set(a, b, v);
                }
            }
        }
        let denom = (n_samples - 1) as f32;
        for a in 0..n_features {
            for b in a..n_features {
                let v = cov.get(a, b) / denom;
                cov.set(a, b, v);
                cov.set(b, a, v);
            }
        }

        let mut components = Matrix::zeros(n_features, self.n_components);
        for c in 0..self.n_components {
            let (v, eigenvalue) = Self::dominant_eigenvector(&cov);
            for (i, &vi) in v.iter().enumerate() {
                components.set(i, c, vi);
            }
            // Deflate: cov -= lambda * v * v^T
            for a in 0..n_features {
                for b in 0..n_features {
                    let val = cov.get(a, b) - eigenvalue * v[a] * v[b];
                    cov.set(a, b, val);
                }
            }
        }

        self.mean = Some(mean);
        self.components = Some(components);
        Ok(())
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self.mean.as_ref().ok_or(EmularError::NotFitted {
            what: "Pca".to_string(),
        })?;
        let components = self.components.as_ref().ok_or(EmularError::NotFitted {
            what: "Pca".to_string(),
        })?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                mean.len(),
                n_features,
            ));
        }

        let mut out = Matrix::zeros(n_samples, self.n_components);
        for i in 0..n_samples {
            for c in 0..self.n_components {
                let mut sum = 0.0;
                for j in 0..n_features {
                    sum += (x.get(i, j) - mean[j]) * components.get(j, c);
                }
                out.set(i, c, sum);
            }
        }
        Ok(out)
    }
}
