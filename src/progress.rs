//! Progress observation for long comparison runs.
//!
//! The engine reports through an injected [`ProgressSink`] instead of
//! printing. Callbacks are synchronous and arrive in a deterministic
//! order: folds in fold order, trials in draw order, models in selection
//! order.

use crate::model_selection::{CvSummary, FoldResult};
use crate::params::ParamMap;

/// Observer for comparison progress events.
///
/// All methods default to no-ops so implementors opt into the events they
/// care about.
pub trait ProgressSink {
    /// A model's evaluation is starting.
    fn on_model_start(&mut self, _model: &str) {}

    /// One cross-validation fold finished.
    fn on_fold(&mut self, _model: &str, _result: &FoldResult) {}

    /// One hyperparameter search trial finished.
    fn on_trial(&mut self, _model: &str, _trial: usize, _params: &ParamMap, _summary: &CvSummary) {}

    /// A model's evaluation finished with its final summary.
    fn on_model_complete(&mut self, _model: &str, _summary: &CvSummary) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {}
