//! Hyperparameter search over a model's search space.
//!
//! Strategy selection is automatic: a finite space whose cardinality fits
//! the trial budget is swept exhaustively in enumeration order, anything
//! else is sampled randomly with duplicate draws discarded. Either way at
//! most `budget` distinct configurations are cross-validated.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model_selection::{cross_validate, CvSummary, FailurePolicy, FoldResult, KFold};
use crate::parallel::Executor;
use crate::params::{ParamMap, SearchSpace, XorShift64};
use crate::progress::ProgressSink;
use crate::primitives::Matrix;
use crate::registry::ModelSpec;

/// Default number of search trials.
pub const DEFAULT_SEARCH_ITERS: usize = 20;

/// One evaluated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Draw order, starting at 0.
    pub trial: usize,
    pub params: ParamMap,
    pub summary: CvSummary,
    /// The configuration's fold results, in fold order.
    pub folds: Vec<FoldResult>,
}

/// Outcome of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: ParamMap,
    pub best_summary: CvSummary,
    /// Every trial in draw order.
    pub trials: Vec<TrialRecord>,
}

/// Budgeted, seed-deterministic search driver.
#[derive(Debug, Clone)]
pub struct SearchDriver {
    budget: usize,
    seed: u64,
}

impl SearchDriver {
    /// Driver with an explicit trial budget and sampling seed.
    #[must_use]
    pub fn new(budget: usize, seed: u64) -> Self {
        Self {
            budget: budget.max(1),
            seed,
        }
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Number of configurations a run will evaluate.
    ///
    /// The budget, except for a finite space that is smaller.
    #[must_use]
    pub fn iterations(&self, space: &SearchSpace) -> usize {
        match space.cardinality() {
            Some(card) => card.min(self.budget),
            None => self.budget,
        }
    }

    /// Upper bound on fit calls: iterations times folds.
    #[must_use]
    pub fn estimated_cost(&self, space: &SearchSpace, n_folds: usize) -> usize {
        self.iterations(space) * n_folds
    }

    /// Configurations to evaluate, in draw order.
    fn candidates(&self, space: &SearchSpace) -> Vec<ParamMap> {
        if let Some(card) = space.cardinality() {
            if card <= self.budget {
                return space.enumerate().expect("finite cardinality implies enumerable");
            }
        }

        let mut rng = XorShift64::new(self.seed);
        let mut configs: Vec<ParamMap> = Vec::with_capacity(self.budget);
        // A discrete region of the space can repeat; cap the redraws so a
        // tiny effective space cannot spin forever.
        let max_attempts = self.budget.saturating_mul(20).max(64);
        let mut attempts = 0;
        while configs.len() < self.budget && attempts < max_attempts {
            attempts += 1;
            let config = space.sample(&mut rng);
            if !configs.contains(&config) {
                configs.push(config);
            }
        }
        configs
    }

    /// Evaluates the space for one registered model and picks the winner.
    ///
    /// Best is the lowest mean RMSE over scored folds; ties go to the
    /// higher mean R², then to the earlier draw. Trials whose folds all
    /// failed never win against a scored trial.
    ///
    /// # Errors
    ///
    /// Propagates configuration application errors, splitter errors, and
    /// fold failures under [`FailurePolicy::FailFast`].
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        spec: &ModelSpec,
        x: &Matrix<f32>,
        y: &Matrix<f32>,
        kfold: &KFold,
        scale_folds: bool,
        policy: FailurePolicy,
        executor: &Executor,
        progress: &mut dyn ProgressSink,
    ) -> Result<SearchResult> {
        let candidates = self.candidates(spec.search_space());
        let mut trials: Vec<TrialRecord> = Vec::with_capacity(candidates.len());
        let mut best: Option<usize> = None;

        for (trial, params) in candidates.into_iter().enumerate() {
            let mut model = spec.instantiate();
            model.set_params(&params)?;

            let folds = cross_validate(
                spec.name(),
                model.as_ref(),
                x,
                y,
                kfold,
                scale_folds,
                policy,
                executor,
                progress,
            )?;
            let summary = CvSummary::from_folds(&folds);
            progress.on_trial(spec.name(), trial, &params, &summary);

            let record = TrialRecord {
                trial,
                params,
                summary,
                folds,
            };
            if is_better(&record.summary, best.map(|i| &trials[i].summary)) {
                best = Some(trials.len());
            }
            trials.push(record);
        }

        // Candidate list is never empty: even an empty space enumerates to
        // the single default configuration.
        let best = best.unwrap_or(0);
        Ok(SearchResult {
            best_params: trials[best].params.clone(),
            best_summary: trials[best].summary.clone(),
            trials,
        })
    }
}

impl Default for SearchDriver {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_ITERS, 0)
    }
}

/// Strict improvement over the incumbent.
fn is_better(candidate: &CvSummary, incumbent: Option<&CvSummary>) -> bool {
    if !candidate.has_scores() {
        return false;
    }
    let Some(incumbent) = incumbent else {
        return true;
    };
    if !incumbent.has_scores() {
        return true;
    }
    match candidate.rmse_mean.total_cmp(&incumbent.rmse_mean) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => candidate.r_squared_mean > incumbent.r_squared_mean,
    }
}
