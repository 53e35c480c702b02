//! Comparison orchestrator: setup, run, summarize.
//!
//! `EmulatorComparison` walks a fixed state machine: `Unconfigured ->
//! Configured -> Comparing -> Compared`. Setup validates the whole
//! configuration before any compute; compare evaluates each selected model
//! through cross-validation (optionally driven by hyperparameter search)
//! and keeps the best configuration refit on the full training partition.

use serde::{Deserialize, Serialize};

use crate::dataset::{train_test_split, Dataset};
use crate::error::{EmularError, Result};
use crate::metrics::{r_squared_multi, rmse_multi};
use crate::model_selection::{
    cross_validate, CvSummary, FailurePolicy, FoldResult, KFold,
};
use crate::parallel::{CancelToken, Executor};
use crate::params::{format_params, ParamMap};
use crate::preprocessing::{Pca, StandardScaler};
use crate::primitives::Matrix;
use crate::progress::{ProgressSink, SilentProgress};
use crate::registry::{ModelRegistry, ModelSpec};
use crate::search::{SearchDriver, SearchResult, DEFAULT_SEARCH_ITERS};
use crate::traits::{Emulator, Transformer};

/// Input scaling applied to the training partition at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalerChoice {
    #[default]
    Standard,
    None,
}

impl ScalerChoice {
    /// Parses a scaler name from a configuration string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an unrecognized name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "standard" => Ok(Self::Standard),
            "none" => Ok(Self::None),
            other => Err(EmularError::invalid_configuration(format!(
                "unknown scaler '{other}'; expected standard or none"
            ))),
        }
    }
}

/// Configuration surface for one comparison run.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// 1 sequential, -1 all cores, n > 1 bounded pool.
    pub n_jobs: i32,
    /// Subset of registry models by display or short name; `None` selects all.
    pub models: Option<Vec<String>>,
    pub cross_validator: KFold,
    pub param_search: bool,
    pub param_search_iters: usize,
    /// Held-out fraction, strictly between 0 and 1.
    pub test_set_size: f64,
    pub scale: bool,
    pub scaler: ScalerChoice,
    pub reduce_dim: bool,
    /// Required when `reduce_dim` is set.
    pub n_components: Option<usize>,
    /// Print the setup report to stdout once setup succeeds.
    pub print_setup: bool,
    /// Abort a model's run on its first failing fold.
    pub fail_fast: bool,
    /// Seeds the train/test split and hyperparameter sampling.
    pub random_state: u64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            n_jobs: 1,
            models: None,
            cross_validator: KFold::new(5).expect("5 is a valid fold count"),
            param_search: false,
            param_search_iters: DEFAULT_SEARCH_ITERS,
            test_set_size: 0.2,
            scale: true,
            scaler: ScalerChoice::Standard,
            reduce_dim: false,
            n_components: None,
            print_setup: false,
            fail_fast: false,
            random_state: 42,
        }
    }
}

impl CompareConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    #[must_use]
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_cross_validator(mut self, kfold: KFold) -> Self {
        self.cross_validator = kfold;
        self
    }

    #[must_use]
    pub fn with_param_search(mut self, iters: usize) -> Self {
        self.param_search = true;
        self.param_search_iters = iters;
        self
    }

    #[must_use]
    pub fn with_test_set_size(mut self, test_set_size: f64) -> Self {
        self.test_set_size = test_set_size;
        self
    }

    #[must_use]
    pub fn without_scaling(mut self) -> Self {
        self.scale = false;
        self
    }

    #[must_use]
    pub fn with_reduce_dim(mut self, n_components: usize) -> Self {
        self.reduce_dim = true;
        self.n_components = Some(n_components);
        self
    }

    #[must_use]
    pub fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    fn scaling_enabled(&self) -> bool {
        self.scale && self.scaler == ScalerChoice::Standard
    }
}

/// Everything retained for one evaluated model.
pub struct ModelReport {
    pub name: String,
    pub short_name: String,
    /// Winning configuration (the model defaults without search).
    pub best_params: ParamMap,
    pub summary: CvSummary,
    /// Fold results of the winning configuration.
    pub folds: Vec<FoldResult>,
    /// Full search history, `None` when search was disabled.
    pub search: Option<SearchResult>,
    /// Winning configuration refit on the full training partition.
    pub emulator: Box<dyn Emulator>,
}

/// One line of the ranked comparison summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub name: String,
    pub short_name: String,
    pub rmse_mean: f32,
    pub r_squared_mean: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unconfigured,
    Configured,
    Comparing,
    Compared,
}

/// The comparison engine.
///
/// # Example
///
/// ```no_run
/// use emular::prelude::*;
///
/// # fn run(x: Matrix<f32>, y: Matrix<f32>) -> emular::error::Result<()> {
/// let mut comparison = EmulatorComparison::new();
/// let config = CompareConfig::new().with_models(["rbf", "sop"]);
/// comparison.setup(x, y, config)?;
/// comparison.compare()?;
/// for row in comparison.summarise_cv()? {
///     println!("{}: rmse {:.4}", row.name, row.rmse_mean);
/// }
/// let best = comparison.get_model("rbf")?;
/// # let _ = best;
/// # Ok(())
/// # }
/// ```
pub struct EmulatorComparison {
    registry: ModelRegistry,
    phase: Phase,
    config: CompareConfig,
    cancel: CancelToken,
    selected: Vec<ModelSpec>,
    executor: Option<Executor>,
    train: Option<Dataset>,
    test: Option<Dataset>,
    scaler: Option<StandardScaler>,
    reducer: Option<Pca>,
    reports: Vec<ModelReport>,
}

impl Default for EmulatorComparison {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorComparison {
    /// Engine over the built-in registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ModelRegistry::core())
    }

    /// Engine over a caller-supplied registry.
    #[must_use]
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self {
            registry,
            phase: Phase::Unconfigured,
            config: CompareConfig::default(),
            cancel: CancelToken::new(),
            selected: Vec::new(),
            executor: None,
            train: None,
            test: None,
            scaler: None,
            reducer: None,
            reports: Vec::new(),
        }
    }

    /// Token for cancelling a running comparison from another thread.
    ///
    /// Cancellation takes effect between models; the model being evaluated
    /// finishes first.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Validates the configuration and prepares the data partitions.
    ///
    /// Everything is checked before any compute: the split fraction, the
    /// model selection, fold counts against the training partition size,
    /// the search budget and the `n_jobs` knob. The shared scaler and the
    /// optional reducer are fit on the training partition only.
    ///
    /// Valid from `Unconfigured` or `Compared`; a successful call discards
    /// earlier results.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` or `UnknownModel` without touching
    /// the engine's previous state.
    pub fn setup(&mut self, x: Matrix<f32>, y: Matrix<f32>, config: CompareConfig) -> Result<()> {
        if self.phase == Phase::Configured || self.phase == Phase::Comparing {
            return Err(EmularError::invalid_configuration(
                "setup() is only valid before configuration or after compare()",
            ));
        }

        let selected: Vec<ModelSpec> = self
            .registry
            .select(config.models.as_deref())?
            .into_iter()
            .cloned()
            .collect();

        let executor = Executor::from_n_jobs(config.n_jobs)?;

        if config.param_search && config.param_search_iters == 0 {
            return Err(EmularError::invalid_configuration(
                "param_search_iters must be at least 1",
            ));
        }

        let data = Dataset::new(x, y)?;
        if !(config.test_set_size > 0.0 && config.test_set_size < 1.0) {
            return Err(EmularError::invalid_configuration(format!(
                "test_set_size must be in (0, 1), got {}",
                config.test_set_size
            )));
        }
        let (mut train, mut test) =
            train_test_split(&data, config.test_set_size, config.random_state)?;

        if train.n_samples() < config.cross_validator.n_splits() {
            return Err(EmularError::invalid_configuration(format!(
                "training partition has {} samples, fewer than {} folds",
                train.n_samples(),
                config.cross_validator.n_splits()
            )));
        }

        if config.reduce_dim {
            let n_components = config.n_components.ok_or_else(|| {
                EmularError::invalid_configuration(
                    "reduce_dim requires n_components",
                )
            })?;
            if n_components == 0 || n_components > train.n_features() {
                return Err(EmularError::invalid_configuration(format!(
                    "n_components must be in [1, {}], got {n_components}",
                    train.n_features()
                )));
            }
        }

        let mut scaler = None;
        if config.scaling_enabled() {
            let mut fitted = StandardScaler::new();
            let train_x = fitted.fit_transform(train.x())?;
            let test_x = fitted.transform(test.x())?;
            train = Dataset::new(train_x, train.y().clone())?;
            test = Dataset::new(test_x, test.y().clone())?;
            scaler = Some(fitted);
        }

        let mut reducer = None;
        if config.reduce_dim {
            let n_components = config.n_components.expect("validated above");
            let mut fitted = Pca::new(n_components);
            let train_x = fitted.fit_transform(train.x())?;
            let test_x = fitted.transform(test.x())?;
            train = Dataset::new(train_x, train.y().clone())?;
            test = Dataset::new(test_x, test.y().clone())?;
            reducer = Some(fitted);
        }

        self.selected = selected;
        self.executor = Some(executor);
        self.train = Some(train);
        self.test = Some(test);
        self.scaler = scaler;
        self.reducer = reducer;
        self.config = config;
        self.cancel = CancelToken::new();
        self.reports.clear();
        self.phase = Phase::Configured;

        if self.config.print_setup {
            println!("{}", self.setup_report()?);
        }
        Ok(())
    }

    /// Human-readable description of the configured run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` before `setup()`.
    pub fn setup_report(&self) -> Result<String> {
        let train = self.train.as_ref().ok_or_else(|| {
            EmularError::invalid_configuration("setup() has not been run")
        })?;
        let test = self.test.as_ref().expect("set together with train");

        let mut lines = Vec::new();
        lines.push("Comparison setup".to_string());
        lines.push(format!(
            "  data: {} train / {} test samples, {} feature(s), {} target(s)",
            train.n_samples(),
            test.n_samples(),
            train.n_features(),
            train.n_targets(),
        ));
        lines.push(format!(
            "  models: {}",
            self.selected
                .iter()
                .map(|s| format!("{} ({})", s.name(), s.short_name()))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        lines.push(format!(
            "  folds: {}, n_jobs: {}, scaling: {}, reduce_dim: {}",
            self.config.cross_validator.n_splits(),
            self.config.n_jobs,
            self.config.scaling_enabled(),
            self.config.reduce_dim,
        ));
        if self.config.param_search {
            lines.push(format!(
                "  param search: {} trial(s) per model",
                self.config.param_search_iters
            ));
        }
        Ok(lines.join("\n"))
    }

    /// Runs the comparison silently.
    ///
    /// # Errors
    ///
    /// See [`EmulatorComparison::compare_with`].
    pub fn compare(&mut self) -> Result<()> {
        self.compare_with(&mut SilentProgress)
    }

    /// Runs the comparison, reporting through `progress`.
    ///
    /// Models are evaluated in selection order; each model's folds (and
    /// search trials) go through the configured executor. The winning
    /// configuration is refit on the full training partition and retained.
    /// Deterministic given the same data and configuration, so calling it
    /// again reproduces the same results.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` before `setup()`. With `fail_fast`, the
    /// first failing fold escalates as `ModelFit`. Otherwise a model whose
    /// run fails outright is skipped and all such failures come back as
    /// one `Aggregate` error, with the surviving models' results intact.
    pub fn compare_with(&mut self, progress: &mut dyn ProgressSink) -> Result<()> {
        match self.phase {
            Phase::Configured | Phase::Compared => {}
            _ => {
                return Err(EmularError::invalid_configuration(
                    "compare() requires a successful setup()",
                ));
            }
        }
        self.phase = Phase::Comparing;
        self.reports.clear();

        let policy = if self.config.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Collect
        };
        let train = self.train.as_ref().expect("configured");
        let executor = self.executor.as_ref().expect("configured");
        let kfold = &self.config.cross_validator;

        let mut reports = Vec::with_capacity(self.selected.len());
        let mut failures: Vec<String> = Vec::new();

        for spec in &self.selected {
            if self.cancel.is_cancelled() {
                break;
            }
            progress.on_model_start(spec.name());

            let evaluated = evaluate_model(
                spec,
                train,
                kfold,
                &self.config,
                policy,
                executor,
                progress,
            );
            match evaluated {
                Ok(report) => {
                    progress.on_model_complete(spec.name(), &report.summary);
                    reports.push(report);
                }
                Err(err) => {
                    if self.config.fail_fast {
                        self.phase = Phase::Configured;
                        return Err(err);
                    }
                    failures.push(format!("{}: {err}", spec.name()));
                }
            }
        }

        self.reports = reports;
        self.phase = Phase::Compared;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EmularError::Aggregate { failures })
        }
    }

    /// Ranked summary, best model first.
    ///
    /// Ordered by mean RMSE ascending, ties by mean R² descending, then by
    /// selection order. Models whose every fold failed sort last.
    ///
    /// # Errors
    ///
    /// Returns `NotCompared` before a completed `compare()`.
    pub fn summarise_cv(&self) -> Result<Vec<SummaryRow>> {
        if self.phase != Phase::Compared {
            return Err(EmularError::NotCompared);
        }
        let mut order: Vec<usize> = (0..self.reports.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&self.reports[a].summary, &self.reports[b].summary);
            sb.has_scores()
                .cmp(&sa.has_scores())
                .then(sa.rmse_mean.total_cmp(&sb.rmse_mean))
                .then(sb.r_squared_mean.total_cmp(&sa.r_squared_mean))
                .then(a.cmp(&b))
        });
        Ok(order
            .into_iter()
            .map(|i| {
                let report = &self.reports[i];
                SummaryRow {
                    name: report.name.clone(),
                    short_name: report.short_name.clone(),
                    rmse_mean: report.summary.rmse_mean,
                    r_squared_mean: report.summary.r_squared_mean,
                }
            })
            .collect())
    }

    /// Renders the ranked summary as an aligned text table.
    ///
    /// # Errors
    ///
    /// Returns `NotCompared` before a completed `compare()`.
    pub fn render_summary(&self) -> Result<String> {
        let rows = self.summarise_cv()?;
        let width = rows
            .iter()
            .map(|r| r.name.len())
            .chain(["model".len()])
            .max()
            .unwrap_or(5);
        let mut out = format!("{:<width$}  {:>10}  {:>10}\n", "model", "rmse", "r2");
        for row in rows {
            out.push_str(&format!(
                "{:<width$}  {:>10.4}  {:>10.4}\n",
                row.name, row.rmse_mean, row.r_squared_mean,
            ));
        }
        Ok(out)
    }

    /// Full report for one evaluated model.
    ///
    /// # Errors
    ///
    /// `NotCompared` before `compare()`, `UnknownModel` when the name was
    /// not among the evaluated models.
    pub fn report(&self, name: &str) -> Result<&ModelReport> {
        if self.phase != Phase::Compared {
            return Err(EmularError::NotCompared);
        }
        self.reports
            .iter()
            .find(|r| r.name == name || r.short_name == name)
            .ok_or_else(|| EmularError::UnknownModel {
                name: name.to_string(),
                available: self
                    .reports
                    .iter()
                    .map(|r| format!("{} ({})", r.name, r.short_name))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Best fitted emulator for one evaluated model.
    ///
    /// # Errors
    ///
    /// See [`EmulatorComparison::report`].
    pub fn get_model(&self, name: &str) -> Result<&dyn Emulator> {
        Ok(self.report(name)?.emulator.as_ref())
    }

    /// Scores one evaluated model on the held-out test partition.
    ///
    /// Returns `(rmse, r_squared)` averaged across targets.
    ///
    /// # Errors
    ///
    /// See [`EmulatorComparison::report`]; prediction errors propagate.
    pub fn evaluate(&self, name: &str) -> Result<(f32, f32)> {
        let report = self.report(name)?;
        let test = self.test.as_ref().expect("compared implies configured");
        let pred = report.emulator.predict(test.x())?;
        Ok((rmse_multi(&pred, test.y()), r_squared_multi(&pred, test.y())))
    }
}

/// Evaluates one model end to end: CV (or search), then refit of the
/// winning configuration on the full training partition.
fn evaluate_model(
    spec: &ModelSpec,
    train: &Dataset,
    kfold: &KFold,
    config: &CompareConfig,
    policy: FailurePolicy,
    executor: &Executor,
    progress: &mut dyn ProgressSink,
) -> Result<ModelReport> {
    let (best_params, summary, folds, search) = if config.param_search {
        let driver = SearchDriver::new(config.param_search_iters, config.random_state);
        let result = driver.run(
            spec,
            train.x(),
            train.y(),
            kfold,
            false,
            policy,
            executor,
            progress,
        )?;
        let best_trial = result
            .trials
            .iter()
            .find(|t| t.params == result.best_params)
            .expect("best_params comes from the trial list");
        (
            result.best_params.clone(),
            result.best_summary.clone(),
            best_trial.folds.clone(),
            Some(result),
        )
    } else {
        let prototype = spec.instantiate();
        let folds = cross_validate(
            spec.name(),
            prototype.as_ref(),
            train.x(),
            train.y(),
            kfold,
            false,
            policy,
            executor,
            progress,
        )?;
        let summary = CvSummary::from_folds(&folds);
        (prototype.params(), summary, folds, None)
    };

    let mut emulator = spec.instantiate();
    emulator.set_params(&best_params)?;
    emulator
        .fit(train.x(), train.y())
        .map_err(|e| EmularError::ModelFit {
            model: spec.name().to_string(),
            fold: None,
            message: format!("refit of {} failed: {e}", format_params(&best_params)),
        })?;

    Ok(ModelReport {
        name: spec.name().to_string(),
        short_name: spec.short_name().to_string(),
        best_params,
        summary,
        folds,
        search,
        emulator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smooth_data(n: usize, seed: u64) -> (Matrix<f32>, Matrix<f32>) {
        // Deterministic smooth response over 2 inputs, 1 target.
        let mut state = seed.max(1);
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f32 / 1000.0
        };
        let mut x_data = Vec::with_capacity(n * 2);
        let mut y_data = Vec::with_capacity(n);
        for _ in 0..n {
            let (a, b) = (next(), next());
            x_data.push(a);
            x_data.push(b);
            y_data.push((a * 3.0).sin() + b * b);
        }
        (
            Matrix::from_vec(n, 2, x_data).expect("matrix"),
            Matrix::from_vec(n, 1, y_data).expect("matrix"),
        )
    }

    #[test]
    fn test_setup_rejects_bad_test_set_size_before_any_fit() {
        let (x, y) = smooth_data(50, 1);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_test_set_size(1.5);
        let err = comparison.setup(x, y, config).unwrap_err();
        assert!(matches!(err, EmularError::InvalidConfiguration { .. }));
        // Engine stays unconfigured.
        assert!(comparison.compare().is_err());
    }

    #[test]
    fn test_setup_rejects_unknown_model() {
        let (x, y) = smooth_data(50, 1);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["rbf", "nope"]);
        let err = comparison.setup(x, y, config).unwrap_err();
        assert!(matches!(err, EmularError::UnknownModel { .. }));
    }

    #[test]
    fn test_setup_rejects_invalid_n_jobs() {
        let (x, y) = smooth_data(50, 1);
        let mut comparison = EmulatorComparison::new();
        assert!(comparison
            .setup(x.clone(), y.clone(), CompareConfig::new().with_n_jobs(0))
            .is_err());
        assert!(comparison
            .setup(x, y, CompareConfig::new().with_n_jobs(-3))
            .is_err());
    }

    #[test]
    fn test_setup_rejects_too_many_folds() {
        let (x, y) = smooth_data(6, 1);
        let mut comparison = EmulatorComparison::new();
        let config =
            CompareConfig::new().with_cross_validator(KFold::new(10).expect("kfold"));
        assert!(comparison.setup(x, y, config).is_err());
    }

    #[test]
    fn test_setup_rejects_reduce_dim_without_components() {
        let (x, y) = smooth_data(50, 1);
        let mut comparison = EmulatorComparison::new();
        let mut config = CompareConfig::new();
        config.reduce_dim = true;
        assert!(comparison.setup(x, y, config).is_err());
    }

    #[test]
    fn test_compare_before_setup_fails() {
        let mut comparison = EmulatorComparison::new();
        assert!(comparison.compare().is_err());
    }

    #[test]
    fn test_summary_requires_compare() {
        let (x, y) = smooth_data(50, 1);
        let mut comparison = EmulatorComparison::new();
        comparison
            .setup(x, y, CompareConfig::new())
            .expect("setup");
        let err = comparison.summarise_cv().unwrap_err();
        assert!(matches!(err, EmularError::NotCompared));
    }

    #[test]
    fn test_full_run_ranks_selected_models() {
        let (x, y) = smooth_data(120, 7);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["rbf", "sop"]);
        comparison.setup(x, y, config).expect("setup");
        comparison.compare().expect("compare");

        let rows = comparison.summarise_cv().expect("summary");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].rmse_mean <= rows[1].rmse_mean);
        for row in &rows {
            assert!(row.rmse_mean.is_finite());
            assert!(row.r_squared_mean.is_finite());
        }
    }

    #[test]
    fn test_get_model_returns_fitted_emulator() {
        let (x, y) = smooth_data(80, 3);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["sop"]);
        comparison.setup(x.clone(), y, config).expect("setup");
        comparison.compare().expect("compare");

        let model = comparison.get_model("sop").expect("model");
        // Fitted on the scaled training partition, so predict wants the
        // same feature count as the raw inputs here (2 features).
        assert!(model.predict(&Matrix::zeros(3, 2)).is_ok());

        let err = comparison.get_model("nope").unwrap_err();
        assert!(matches!(err, EmularError::UnknownModel { .. }));
    }

    #[test]
    fn test_compare_is_idempotent() {
        let (x, y) = smooth_data(90, 11);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["lin", "knn"]);
        comparison.setup(x, y, config).expect("setup");

        comparison.compare().expect("first compare");
        let first = comparison.summarise_cv().expect("summary");
        comparison.compare().expect("second compare");
        let second = comparison.summarise_cv().expect("summary");

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.rmse_mean, b.rmse_mean);
            assert_eq!(a.r_squared_mean, b.r_squared_mean);
        }
    }

    #[test]
    fn test_setup_after_compare_resets_results() {
        let (x, y) = smooth_data(70, 5);
        let mut comparison = EmulatorComparison::new();
        comparison
            .setup(x.clone(), y.clone(), CompareConfig::new().with_models(["lin"]))
            .expect("setup");
        comparison.compare().expect("compare");
        assert!(comparison.summarise_cv().is_ok());

        comparison
            .setup(x, y, CompareConfig::new().with_models(["knn"]))
            .expect("re-setup");
        assert!(matches!(
            comparison.summarise_cv().unwrap_err(),
            EmularError::NotCompared
        ));
    }

    #[test]
    fn test_setup_not_allowed_while_configured() {
        let (x, y) = smooth_data(50, 2);
        let mut comparison = EmulatorComparison::new();
        comparison
            .setup(x.clone(), y.clone(), CompareConfig::new())
            .expect("setup");
        assert!(comparison.setup(x, y, CompareConfig::new()).is_err());
    }

    #[test]
    fn test_cancellation_stops_dispatch_between_models() {
        let (x, y) = smooth_data(60, 9);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["lin", "rdg", "knn"]);
        comparison.setup(x, y, config).expect("setup");

        comparison.cancel_token().cancel();
        comparison.compare().expect("compare");
        let rows = comparison.summarise_cv().expect("summary");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_scaler_fitted_on_training_partition_only() {
        let (x, y) = smooth_data(100, 13);
        let mut comparison = EmulatorComparison::new();
        comparison
            .setup(x.clone(), y, CompareConfig::new())
            .expect("setup");

        let scaler = comparison.scaler.as_ref().expect("scaling on by default");
        let mut whole = StandardScaler::new();
        whole.fit(&x).expect("fit");
        // Training statistics differ from whole-data statistics.
        assert_ne!(scaler.mean(), whole.mean());
    }

    #[test]
    fn test_reduce_dim_shrinks_feature_count() {
        let (x, y) = smooth_data(80, 17);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new()
            .with_models(["lin"])
            .with_reduce_dim(1);
        comparison.setup(x, y, config).expect("setup");
        assert_eq!(comparison.train.as_ref().expect("train").n_features(), 1);
        comparison.compare().expect("compare");
        let model = comparison.get_model("lin").expect("model");
        assert!(model.predict(&Matrix::zeros(2, 1)).is_ok());
    }

    #[test]
    fn test_search_report_carries_real_per_fold_scores() {
        use crate::model_selection::FoldOutcome;

        let (x, y) = smooth_data(80, 31);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new()
            .with_models(["knn"])
            .with_param_search(4);
        comparison.setup(x, y, config).expect("setup");
        comparison.compare().expect("compare");

        let report = comparison.report("knn").expect("report");
        assert_eq!(report.folds.len(), 5);
        let rmses: Vec<f32> = report
            .folds
            .iter()
            .enumerate()
            .map(|(i, f)| {
                assert_eq!(f.fold, i);
                match &f.outcome {
                    FoldOutcome::Scored { rmse, .. } => *rmse,
                    FoldOutcome::Failed { message } => panic!("fold {i} failed: {message}"),
                }
            })
            .collect();
        // Real fold scores vary; one repeated value would mean the mean
        // was echoed back per fold.
        assert!(rmses.iter().any(|r| *r != rmses[0]));
        // And they reduce to the reported summary.
        let mean = rmses.iter().sum::<f32>() / rmses.len() as f32;
        assert!((mean - report.summary.rmse_mean).abs() < 1e-5);
    }

    #[test]
    fn test_param_search_run_keeps_history() {
        let (x, y) = smooth_data(60, 19);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new()
            .with_models(["knn"])
            .with_param_search(4);
        comparison.setup(x, y, config).expect("setup");
        comparison.compare().expect("compare");

        let report = comparison.report("knn").expect("report");
        let search = report.search.as_ref().expect("search ran");
        assert_eq!(search.trials.len(), 4);
        assert_eq!(search.best_params, report.best_params);
    }

    #[test]
    fn test_evaluate_scores_on_test_partition() {
        let (x, y) = smooth_data(100, 23);
        let mut comparison = EmulatorComparison::new();
        let config = CompareConfig::new().with_models(["rbf"]);
        comparison.setup(x, y, config).expect("setup");
        comparison.compare().expect("compare");
        let (rmse, r_squared) = comparison.evaluate("rbf").expect("evaluate");
        assert!(rmse.is_finite());
        assert!(r_squared.is_finite());
    }

    #[test]
    fn test_render_summary_header() {
        let (x, y) = smooth_data(60, 29);
        let mut comparison = EmulatorComparison::new();
        comparison
            .setup(x, y, CompareConfig::new().with_models(["lin"]))
            .expect("setup");
        comparison.compare().expect("compare");
        let table = comparison.render_summary().expect("table");
        assert!(table.starts_with("model"));
        assert!(table.contains("LinearEmulator"));
    }

    #[test]
    fn test_scaler_choice_parse() {
        assert_eq!(ScalerChoice::parse("standard").expect("ok"), ScalerChoice::Standard);
        assert_eq!(ScalerChoice::parse("none").expect("ok"), ScalerChoice::None);
        assert!(ScalerChoice::parse("minmax").is_err());
    }
}
