//! Radial basis function interpolation emulator.

use crate::error::{EmularError, Result};
use crate::params::{ParamDistribution, ParamMap, SearchSpace};
use crate::primitives::Matrix;
use crate::traits::Emulator;

/// Radial kernel applied to pairwise distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbfKernel {
    /// exp(-(eps * r)^2). Positive definite.
    Gaussian,
    /// sqrt(1 + (eps * r)^2). Conditionally positive definite; the
    /// regularized solve can still fail on some data.
    Multiquadric,
    /// r^2 * ln(r). Scale-free, ignores epsilon.
    ThinPlateSpline,
}

impl RbfKernel {
    /// Parses a kernel name as used in hyperparameter maps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an unrecognized name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "gaussian" => Ok(Self::Gaussian),
            "multiquadric" => Ok(Self::Multiquadric),
            "thin_plate_spline" => Ok(Self::ThinPlateSpline),
            other => Err(EmularError::invalid_parameter(
                "RadialBasis",
                "kernel",
                format!(
                    "no such kernel '{other}'; expected gaussian, multiquadric or thin_plate_spline"
                ),
            )),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Multiquadric => "multiquadric",
            Self::ThinPlateSpline => "thin_plate_spline",
        }
    }

    fn apply(&self, r: f32, epsilon: f32) -> f32 {
        match self {
            Self::Gaussian => {
                let s = epsilon * r;
                (-s * s).exp()
            }
            Self::Multiquadric => {
                let s = epsilon * r;
                (1.0 + s * s).sqrt()
            }
            Self::ThinPlateSpline => {
                if r <= 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
        }
    }
}

/// RBF interpolator over the training points.
///
/// Fitting solves `(K + smoothing * I) W = Y` where `K[i][j]` is the kernel
/// applied to the distance between training rows i and j. Prediction
/// evaluates the kernel between query rows and the stored centers.
#[derive(Debug, Clone)]
pub struct RadialBasis {
    kernel: RbfKernel,
    epsilon: f64,
    smoothing: f64,
    centers: Option<Matrix<f32>>,
    weights: Option<Matrix<f32>>,
}

impl Default for RadialBasis {
    fn default() -> Self {
        Self {
            kernel: RbfKernel::Gaussian,
            epsilon: 1.0,
            // Large enough to survive f32 rounding on a unit-diagonal
            // kernel matrix; smaller values lose to the ridge entirely.
            smoothing: 1e-3,
            centers: None,
            weights: None,
        }
    }
}

impl RadialBasis {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    /// Default search space: kernel choice, epsilon and smoothing strength.
    #[must_use]
    pub fn search_space() -> SearchSpace {
        SearchSpace::new()
            .add(
                "kernel",
                ParamDistribution::categorical([
                    "gaussian",
                    "multiquadric",
                    "thin_plate_spline",
                ]),
            )
            .add("epsilon", ParamDistribution::continuous_log(1e-2, 1e1))
            .add("smoothing", ParamDistribution::continuous_log(1e-6, 1e-1))
    }

    fn distance(a: &Matrix<f32>, i: usize, b: &Matrix<f32>, j: usize) -> f32 {
        let p = a.n_cols();
        let mut sum = 0.0;
        for c in 0..p {
            let d = a.get(i, c) - b.get(j, c);
            sum += d * d;
        }
        sum.sqrt()
    }

    /// Kernel matrix between `a` rows and `b` rows, shape (a.rows, b.rows).
    fn kernel_matrix(&self, a: &Matrix<f32>, b: &Matrix<f32>) -> Matrix<f32> {
        let eps = self.epsilon as f32;
        let mut k = Matrix::zeros(a.n_rows(), b.n_rows());
        for i in 0..a.n_rows() {
            for j in 0..b.n_rows() {
                let r = Self::distance(a, i, b, j);
                k.set(i, j, self.kernel.apply(r, eps));
            }
        }
        k
    }
}

impl Emulator for RadialBasis {
    fn fit(&mut self, x: &Matrix<f32>, y: &Matrix<f32>) -> Result<()> {
        if x.n_rows() != y.n_rows() {
            return Err(EmularError::dimension_mismatch(
                "n_samples",
                x.n_rows(),
                y.n_rows(),
            ));
        }
        if x.n_rows() == 0 {
            return Err(EmularError::dimension_mismatch("n_samples", 1, 0));
        }

        let mut k = self.kernel_matrix(x, x);
        let smoothing = self.smoothing as f32;
        for i in 0..k.n_rows() {
            let v = k.get(i, i) + smoothing;
            k.set(i, i, v);
        }

        let weights = k.cholesky_solve_multi(y).map_err(|e| EmularError::ModelFit {
            model: "RadialBasis".to_string(),
            fold: None,
            message: format!("kernel system solve failed ({e})"),
        })?;

        self.centers = Some(x.clone());
        self.weights = Some(weights);
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let centers = self.centers.as_ref().ok_or(EmularError::NotFitted {
            what: "RadialBasis".to_string(),
        })?;
        let weights = self.weights.as_ref().expect("set together with centers");
        if x.n_cols() != centers.n_cols() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                centers.n_cols(),
                x.n_cols(),
            ));
        }
        let k = self.kernel_matrix(x, centers);
        k.matmul(weights).map_err(Into::into)
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("kernel".to_string(), self.kernel.name().into());
        params.insert("epsilon".to_string(), self.epsilon.into());
        params.insert("smoothing".to_string(), self.smoothing.into());
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        let mut kernel = None;
        let mut epsilon = None;
        let mut smoothing = None;
        for (name, value) in params {
            match name.as_str() {
                "kernel" => {
                    let s = value.as_str().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "RadialBasis",
                            "kernel",
                            format!("expected a string, got {value}"),
                        )
                    })?;
                    kernel = Some(RbfKernel::parse(s)?);
                }
                "epsilon" => {
                    let v = value.as_f64().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "RadialBasis",
                            "epsilon",
                            format!("expected a number, got {value}"),
                        )
                    })?;
                    if !v.is_finite() || v <= 0.0 {
                        return Err(EmularError::invalid_parameter(
                            "RadialBasis",
                            "epsilon",
                            format!("must be a positive finite number, got {v}"),
                        ));
                    }
                    epsilon = Some(v);
                }
                "smoothing" => {
                    let v = value.as_f64().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "RadialBasis",
                            "smoothing",
                            format!("expected a number, got {value}"),
                        )
                    })?;
                    if !v.is_finite() || v < 0.0 {
                        return Err(EmularError::invalid_parameter(
                            "RadialBasis",
                            "smoothing",
                            format!("must be a non-negative finite number, got {v}"),
                        ));
                    }
                    smoothing = Some(v);
                }
                other => {
                    return Err(EmularError::invalid_parameter(
                        "RadialBasis",
                        other,
                        "no such parameter",
                    ));
                }
            }
        }
        if let Some(v) = kernel {
            self.kernel = v;
        }
        if let Some(v) = epsilon {
            self.epsilon = v;
        }
        if let Some(v) = smoothing {
            self.smoothing = v;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Emulator> {
        Box::new(self.clone())
    }
}
