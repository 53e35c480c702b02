//! K-fold cross-validation over emulators.
//!
//! The runner scores one model configuration across folds. Each fold gets
//! an independent clone of the model; a fold that fails to fit becomes a
//! `Failed` outcome instead of aborting its siblings, unless the caller
//! asks for fail-fast behavior.

use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{EmularError, Result};
use crate::metrics::{r_squared_multi, rmse_multi};
use crate::parallel::{CancelToken, Executor};
use crate::preprocessing::StandardScaler;
use crate::progress::ProgressSink;
use crate::primitives::Matrix;
use crate::traits::{Emulator, Transformer};

/// K-fold splitter with optional shuffling.
///
/// # Example
///
/// ```
/// use emular::model_selection::KFold;
///
/// let kfold = KFold::new(5).expect("5 folds");
/// let folds = kfold.split(23).expect("split");
/// assert_eq!(folds.len(), 5);
/// let total: usize = folds.iter().map(|(_, test)| test.len()).sum();
/// assert_eq!(total, 23);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: u64,
}

impl KFold {
    /// Shuffled k-fold with a fixed default seed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for fewer than 2 splits.
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(EmularError::invalid_configuration(format!(
                "n_splits must be at least 2, got {n_splits}"
            )));
        }
        Ok(Self {
            n_splits,
            shuffle: true,
            random_state: 42,
        })
    }

    /// Replaces the shuffle seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Disables shuffling: folds become contiguous index ranges.
    #[must_use]
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generates (train, validation) index pairs.
    ///
    /// Validation sets partition `0..n_samples`; the first
    /// `n_samples % n_splits` folds are one sample larger.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when there are fewer samples than
    /// splits.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if n_samples < self.n_splits {
            return Err(EmularError::invalid_configuration(format!(
                "cannot split {n_samples} samples into {} folds",
                self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let test: Vec<usize> = indices[start..start + size].to_vec();
            let train: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[start + size..].iter())
                .copied()
                .collect();
            folds.push((train, test));
            start += size;
        }
        Ok(folds)
    }
}

/// What to do when a fold fails to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep scoring the remaining folds.
    #[default]
    Collect,
    /// Stop the model's run on the first failing fold.
    FailFast,
}

/// Score or failure of a single fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FoldOutcome {
    Scored { rmse: f32, r_squared: f32 },
    Failed { message: String },
}

impl FoldOutcome {
    #[must_use]
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored { .. })
    }
}

/// One fold's result, tagged with its index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub outcome: FoldOutcome,
}

/// Aggregate statistics over the scored folds of one configuration.
///
/// Means and standard deviations are `NaN` when every fold failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvSummary {
    pub rmse_mean: f32,
    pub rmse_std: f32,
    pub r_squared_mean: f32,
    pub r_squared_std: f32,
    pub n_scored: usize,
    pub n_failed: usize,
}

impl CvSummary {
    /// Summarizes fold results, skipping failed folds.
    #[must_use]
    pub fn from_folds(folds: &[FoldResult]) -> Self {
        let scored: Vec<(f32, f32)> = folds
            .iter()
            .filter_map(|f| match &f.outcome {
                FoldOutcome::Scored { rmse, r_squared } => Some((*rmse, *r_squared)),
                FoldOutcome::Failed { .. } => None,
            })
            .collect();
        let n_scored = scored.len();
        let n_failed = folds.len() - n_scored;

        if n_scored == 0 {
            return Self {
                rmse_mean: f32::NAN,
                rmse_std: f32::NAN,
                r_squared_mean: f32::NAN,
                r_squared_std: f32::NAN,
                n_scored,
                n_failed,
            };
        }

        let n = n_scored as f32;
        let rmse_mean = scored.iter().map(|(r, _)| r).sum::<f32>() / n;
        let r_squared_mean = scored.iter().map(|(_, r2)| r2).sum::<f32>() / n;
        let rmse_std =
            (scored.iter().map(|(r, _)| (r - rmse_mean).powi(2)).sum::<f32>() / n).sqrt();
        let r_squared_std = (scored
            .iter()
            .map(|(_, r2)| (r2 - r_squared_mean).powi(2))
            .sum::<f32>()
            / n)
            .sqrt();

        Self {
            rmse_mean,
            rmse_std,
            r_squared_mean,
            r_squared_std,
            n_scored,
            n_failed,
        }
    }

    /// True when at least one fold produced a score.
    #[must_use]
    pub fn has_scores(&self) -> bool {
        self.n_scored > 0
    }
}

const SKIP_SENTINEL: &str = "skipped after earlier failure";

/// First failure that is not a cancellation sentinel.
///
/// Under a pooled executor a later fold can fail first and cancel
/// earlier-indexed folds, so the lowest-indexed `Failed` entry may be a
/// skip sentinel rather than the fold that actually failed.
fn first_failure(results: &[FoldResult]) -> Option<&FoldResult> {
    results
        .iter()
        .find(|r| matches!(&r.outcome, FoldOutcome::Failed { message } if message != SKIP_SENTINEL))
        .or_else(|| results.iter().find(|r| !r.outcome.is_scored()))
}

/// Fits a model clone on one fold's training rows and scores it on the
/// fold's validation rows.
fn fit_and_score(
    mut model: Box<dyn Emulator>,
    x: &Matrix<f32>,
    y: &Matrix<f32>,
    train: &[usize],
    test: &[usize],
    scale_fold: bool,
) -> std::result::Result<(f32, f32), String> {
    let mut train_x = x.take_rows(train);
    let mut test_x = x.take_rows(test);
    let train_y = y.take_rows(train);
    let test_y = y.take_rows(test);

    if scale_fold {
        let mut scaler = StandardScaler::new();
        train_x = scaler.fit_transform(&train_x).map_err(|e| e.to_string())?;
        test_x = scaler.transform(&test_x).map_err(|e| e.to_string())?;
    }

    model.fit(&train_x, &train_y).map_err(|e| e.to_string())?;
    let pred = model.predict(&test_x).map_err(|e| e.to_string())?;

    let rmse = rmse_multi(&pred, &test_y);
    let r_squared = r_squared_multi(&pred, &test_y);
    if !rmse.is_finite() || !r_squared.is_finite() {
        return Err("produced non-finite metrics".to_string());
    }
    Ok((rmse, r_squared))
}

/// Cross-validates one model configuration.
///
/// Folds run through `executor` and results come back in fold order, so
/// the output is identical whether the executor is sequential or pooled.
/// `scale_folds` refits a standard scaler inside each fold, using only
/// that fold's training rows. Fold completions are reported to `progress`
/// in fold order after the batch finishes.
///
/// # Errors
///
/// Returns `InvalidConfiguration` from the splitter, or `ModelFit` under
/// [`FailurePolicy::FailFast`] naming the fold that actually failed rather
/// than one cancelled by it.
#[allow(clippy::too_many_arguments)]
pub fn cross_validate(
    model_name: &str,
    prototype: &dyn Emulator,
    x: &Matrix<f32>,
    y: &Matrix<f32>,
    kfold: &KFold,
    scale_folds: bool,
    policy: FailurePolicy,
    executor: &Executor,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<FoldResult>> {
    let folds = kfold.split(x.n_rows())?;
    let token = CancelToken::new();

    let tasks: Vec<_> = folds
        .into_iter()
        .enumerate()
        .map(|(fold, (train, test))| {
            let model = prototype.clone_box();
            let token = token.clone();
            move || {
                if token.is_cancelled() {
                    return FoldResult {
                        fold,
                        outcome: FoldOutcome::Failed {
                            message: SKIP_SENTINEL.to_string(),
                        },
                    };
                }
                match fit_and_score(model, x, y, &train, &test, scale_folds) {
                    Ok((rmse, r_squared)) => FoldResult {
                        fold,
                        outcome: FoldOutcome::Scored { rmse, r_squared },
                    },
                    Err(message) => {
                        if policy == FailurePolicy::FailFast {
                            token.cancel();
                        }
                        FoldResult {
                            fold,
                            outcome: FoldOutcome::Failed { message },
                        }
                    }
                }
            }
        })
        .collect();

    let results = executor.run(tasks);

    for result in &results {
        progress.on_fold(model_name, result);
    }

    if policy == FailurePolicy::FailFast {
        if let Some(result) = first_failure(&results) {
            if let FoldOutcome::Failed { message } = &result.outcome {
                return Err(EmularError::ModelFit {
                    model: model_name.to_string(),
                    fold: Some(result.fold),
                    message: message.clone(),
                });
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulators::{LinearEmulator, RadialBasis};
    use crate::params::ParamMap;
    use crate::progress::SilentProgress;

    fn linear_data(n: usize) -> (Matrix<f32>, Matrix<f32>) {
        let x_data: Vec<f32> = (0..n * 2).map(|i| (i % 17) as f32).collect();
        let x = Matrix::from_vec(n, 2, x_data).expect("matrix");
        let mut y_data = Vec::with_capacity(n);
        for i in 0..n {
            y_data.push(1.0 + 2.0 * x.get(i, 0) - 0.5 * x.get(i, 1));
        }
        (x, Matrix::from_vec(n, 1, y_data).expect("matrix"))
    }

    #[test]
    fn test_kfold_validation_sets_partition_samples() {
        let kfold = KFold::new(4).expect("kfold");
        let folds = kfold.split(10).expect("split");
        assert_eq!(folds.len(), 4);

        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);

        let mut all: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_kfold_train_and_test_disjoint() {
        let kfold = KFold::new(3).expect("kfold");
        for (train, test) in kfold.split(9).expect("split") {
            assert_eq!(train.len() + test.len(), 9);
            assert!(test.iter().all(|t| !train.contains(t)));
        }
    }

    #[test]
    fn test_kfold_deterministic_per_seed() {
        let a = KFold::new(3).expect("kfold").with_random_state(7);
        let b = KFold::new(3).expect("kfold").with_random_state(7);
        assert_eq!(a.split(20).expect("split"), b.split(20).expect("split"));

        let c = KFold::new(3).expect("kfold").with_random_state(8);
        assert_ne!(a.split(20).expect("split"), c.split(20).expect("split"));
    }

    #[test]
    fn test_kfold_without_shuffle_contiguous() {
        let kfold = KFold::new(2).expect("kfold").without_shuffle();
        let folds = kfold.split(4).expect("split");
        assert_eq!(folds[0].1, vec![0, 1]);
        assert_eq!(folds[1].1, vec![2, 3]);
    }

    #[test]
    fn test_kfold_invalid_configs() {
        assert!(KFold::new(1).is_err());
        assert!(KFold::new(5).expect("kfold").split(3).is_err());
    }

    #[test]
    fn test_cross_validate_scores_every_fold() {
        let (x, y) = linear_data(40);
        let kfold = KFold::new(5).expect("kfold");
        let executor = Executor::sequential();
        let results = cross_validate(
            "LinearEmulator",
            &LinearEmulator::new(),
            &x,
            &y,
            &kfold,
            false,
            FailurePolicy::Collect,
            &executor,
            &mut SilentProgress,
        )
        .expect("cv");

        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.fold, i);
            match &result.outcome {
                FoldOutcome::Scored { rmse, r_squared } => {
                    assert!(*rmse < 1e-2);
                    assert!(*r_squared > 0.99);
                }
                FoldOutcome::Failed { message } => panic!("fold {i} failed: {message}"),
            }
        }
    }

    #[test]
    fn test_cross_validate_parallel_matches_sequential() {
        let (x, y) = linear_data(60);
        let kfold = KFold::new(6).expect("kfold");
        let model = LinearEmulator::new();

        let seq = cross_validate(
            "LinearEmulator",
            &model,
            &x,
            &y,
            &kfold,
            true,
            FailurePolicy::Collect,
            &Executor::sequential(),
            &mut SilentProgress,
        )
        .expect("cv");
        let par = cross_validate(
            "LinearEmulator",
            &model,
            &x,
            &y,
            &kfold,
            true,
            FailurePolicy::Collect,
            &Executor::from_n_jobs(-1).expect("executor"),
            &mut SilentProgress,
        )
        .expect("cv");

        for (a, b) in seq.iter().zip(par.iter()) {
            assert_eq!(a.fold, b.fold);
            match (&a.outcome, &b.outcome) {
                (
                    FoldOutcome::Scored { rmse: ra, r_squared: sa },
                    FoldOutcome::Scored { rmse: rb, r_squared: sb },
                ) => {
                    assert_eq!(ra, rb);
                    assert_eq!(sa, sb);
                }
                _ => panic!("outcome mismatch on fold {}", a.fold),
            }
        }
    }

    fn fragile_rbf() -> RadialBasis {
        // Zero smoothing over data with duplicate rows fails the solve.
        let mut model = RadialBasis::new();
        let mut params = ParamMap::new();
        params.insert("smoothing".to_string(), 0.0.into());
        model.set_params(&params).expect("set_params");
        model
    }

    fn degenerate_data() -> (Matrix<f32>, Matrix<f32>) {
        // Every row identical: each fold's kernel matrix is singular.
        let x = Matrix::from_vec(12, 1, vec![1.0; 12]).expect("matrix");
        let y = Matrix::from_vec(12, 1, (0..12).map(|i| i as f32).collect()).expect("matrix");
        (x, y)
    }

    #[test]
    fn test_fold_failure_recorded_as_outcome() {
        let (x, y) = degenerate_data();
        let kfold = KFold::new(3).expect("kfold");
        let results = cross_validate(
            "RadialBasis",
            &fragile_rbf(),
            &x,
            &y,
            &kfold,
            false,
            FailurePolicy::Collect,
            &Executor::sequential(),
            &mut SilentProgress,
        )
        .expect("cv returns outcomes, not an error");
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.outcome.is_scored()));
    }

    #[test]
    fn test_fail_fast_surfaces_model_fit_error() {
        let (x, y) = degenerate_data();
        let kfold = KFold::new(3).expect("kfold");
        let err = cross_validate(
            "RadialBasis",
            &fragile_rbf(),
            &x,
            &y,
            &kfold,
            false,
            FailurePolicy::FailFast,
            &Executor::sequential(),
            &mut SilentProgress,
        )
        .unwrap_err();
        match err {
            EmularError::ModelFit { model, fold, .. } => {
                assert_eq!(model, "RadialBasis");
                assert_eq!(fold, Some(0));
            }
            other => panic!("expected ModelFit, got {other}"),
        }
    }

    #[test]
    fn test_fail_fast_names_the_failing_fold_not_a_skipped_one() {
        // A pooled run where fold 2 failed first and cancelled fold 0.
        let results = vec![
            FoldResult {
                fold: 0,
                outcome: FoldOutcome::Failed { message: SKIP_SENTINEL.to_string() },
            },
            FoldResult {
                fold: 1,
                outcome: FoldOutcome::Scored { rmse: 1.0, r_squared: 0.5 },
            },
            FoldResult {
                fold: 2,
                outcome: FoldOutcome::Failed { message: "singular".to_string() },
            },
        ];
        let failure = first_failure(&results).expect("failure present");
        assert_eq!(failure.fold, 2);
        match &failure.outcome {
            FoldOutcome::Failed { message } => assert_eq!(message, "singular"),
            FoldOutcome::Scored { .. } => panic!("expected a failure"),
        }
    }

    #[test]
    fn test_only_sentinels_fall_back_to_the_first_one() {
        let results = vec![
            FoldResult {
                fold: 0,
                outcome: FoldOutcome::Failed { message: SKIP_SENTINEL.to_string() },
            },
            FoldResult {
                fold: 1,
                outcome: FoldOutcome::Failed { message: SKIP_SENTINEL.to_string() },
            },
        ];
        assert_eq!(first_failure(&results).expect("failure").fold, 0);
    }

    #[test]
    fn test_summary_skips_failed_folds() {
        let folds = vec![
            FoldResult {
                fold: 0,
                outcome: FoldOutcome::Scored { rmse: 1.0, r_squared: 0.8 },
            },
            FoldResult {
                fold: 1,
                outcome: FoldOutcome::Failed { message: "singular".to_string() },
            },
            FoldResult {
                fold: 2,
                outcome: FoldOutcome::Scored { rmse: 3.0, r_squared: 0.6 },
            },
        ];
        let summary = CvSummary::from_folds(&folds);
        assert_eq!(summary.n_scored, 2);
        assert_eq!(summary.n_failed, 1);
        assert!((summary.rmse_mean - 2.0).abs() < 1e-6);
        assert!((summary.r_squared_mean - 0.7).abs() < 1e-6);
        assert!((summary.rmse_std - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_all_failed_is_nan() {
        let folds = vec![FoldResult {
            fold: 0,
            outcome: FoldOutcome::Failed { message: "boom".to_string() },
        }];
        let summary = CvSummary::from_folds(&folds);
        assert!(!summary.has_scores());
        assert!(summary.rmse_mean.is_nan());
    }

    proptest::proptest! {
        #[test]
        fn prop_split_covers_every_sample_once(
            n in 4usize..200,
            k in 2usize..8,
            seed in 0u64..100,
        ) {
            proptest::prop_assume!(n >= k);
            let kfold = KFold::new(k).unwrap().with_random_state(seed);
            let folds = kfold.split(n).unwrap();
            proptest::prop_assert_eq!(folds.len(), k);

            let mut all: Vec<usize> =
                folds.iter().flat_map(|(_, test)| test.clone()).collect();
            all.sort_unstable();
            proptest::prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn prop_split_train_and_test_disjoint(
            n in 4usize..120,
            k in 2usize..6,
            seed in 0u64..100,
        ) {
            proptest::prop_assume!(n >= k);
            let kfold = KFold::new(k).unwrap().with_random_state(seed);
            for (train, test) in kfold.split(n).unwrap() {
                proptest::prop_assert_eq!(train.len() + test.len(), n);
                proptest::prop_assert!(test.iter().all(|t| !train.contains(t)));
            }
        }
    }
}
