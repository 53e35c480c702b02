//! K-nearest-neighbors regression emulator.

use crate::error::{EmularError, Result};
use crate::params::{ParamDistribution, ParamMap, SearchSpace};
use crate::primitives::Matrix;
use crate::traits::Emulator;

/// Neighbor weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Weighting {
    Uniform,
    Distance,
}

impl Weighting {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "uniform" => Ok(Self::Uniform),
            "distance" => Ok(Self::Distance),
            other => Err(EmularError::invalid_parameter(
                "KNearest",
                "weights",
                format!("no such weighting '{other}'; expected uniform or distance"),
            )),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Distance => "distance",
        }
    }
}

/// Predicts each target as a (possibly distance-weighted) average over the
/// k closest training samples. Fitting just stores the training data.
#[derive(Debug, Clone)]
pub struct KNearest {
    k: usize,
    weighting: Weighting,
    train_x: Option<Matrix<f32>>,
    train_y: Option<Matrix<f32>>,
}

impl Default for KNearest {
    fn default() -> Self {
        Self {
            k: 5,
            weighting: Weighting::Uniform,
            train_x: None,
            train_y: None,
        }
    }
}

impl KNearest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Default search space: k in [2, 10] and the weighting scheme.
    ///
    /// Fully finite, so a small trial budget turns hyperparameter search
    /// into an exhaustive grid.
    #[must_use]
    pub fn search_space() -> SearchSpace {
        SearchSpace::new()
            .add("k", ParamDistribution::integer(2, 10))
            .add(
                "weights",
                ParamDistribution::categorical(["uniform", "distance"]),
            )
    }
}

impl Emulator for KNearest {
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
        self.train_x = Some(x.clone());
        self.train_y = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let train_x = self.train_x.as_ref().ok_or(EmularError::NotFitted {
            what: "KNearest".to_string(),
        })?;
        let train_y = self.train_y.as_ref().expect("set together with train_x");
        if x.n_cols() != train_x.n_cols() {
            return Err(EmularError::dimension_mismatch(
                "n_features",
                train_x.n_cols(),
                x.n_cols(),
            ));
        }

        let n_train = train_x.n_rows();
        let k = self.k.min(n_train);
        let n_targets = train_y.n_cols();
        let mut out = Matrix::zeros(x.n_rows(), n_targets);

        for i in 0..x.n_rows() {
            let mut dists: Vec<(f32, usize)> = (0..n_train)
                .map(|t| {
                    let mut sum = 0.0;
                    for c in 0..x.n_cols() {
                        let d = x.get(i, c) - train_x.get(t, c);
                        sum += d * d;
                    }
                    (sum.sqrt(), t)
                })
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let nearest = &dists[..k];

            // An exact match short-circuits distance weighting.
            let exact = nearest.iter().find(|(d, _)| *d == 0.0);
            for j in 0..n_targets {
                let value = match (self.weighting, exact) {
                    (Weighting::Distance, Some(&(_, t))) => train_y.get(t, j),
                    (Weighting::Distance, None) => {
                        let mut num = 0.0;
                        let mut den = 0.0;
                        for &(d, t) in nearest {
                            let w = 1.0 / d;
                            num += w * train_y.get(t, j);
                            den += w;
                        }
                        num / den
                    }
                    (Weighting::Uniform, _) => {
                        nearest.iter().map(|&(_, t)| train_y.get(t, j)).sum::<f32>()
                            / k as f32
                    }
                };
                out.set(i, j, value);
            }
        }
        Ok(out)
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("k".to_string(), self.k.into());
        params.insert("weights".to_string(), self.weighting.name().into());
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        let mut k = None;
        let mut weighting = None;
        for (name, value) in params {
            match name.as_str() {
                "k" => {
                    let v = value.as_i64().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "KNearest",
                            "k",
                            format!("expected an integer, got {value}"),
                        )
                    })?;
                    if v < 1 {
                        return Err(EmularError::invalid_parameter(
                            "KNearest",
                            "k",
                            format!("must be at least 1, got {v}"),
                        ));
                    }
                    k = Some(v as usize);
                }
                "weights" => {
                    let s = value.as_str().ok_or_else(|| {
                        EmularError::invalid_parameter(
                            "KNearest",
                            "weights",
                            format!("expected a string, got {value}"),
                        )
                    })?;
                    weighting = Some(Weighting::parse(s)?);
                }
                other => {
                    return Err(EmularError::invalid_parameter(
                        "KNearest",
                        other,
                        "no such parameter",
                    ));
                }
            }
        }
        if let Some(v) = k {
            self.k = v;
        }
        if let Some(v) = weighting {
            self.weighting = v;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Emulator> {
        Box::new(self.clone())
    }
}
