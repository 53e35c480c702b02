//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use emular::prelude::*;
//! ```

pub use crate::compare::{CompareConfig, EmulatorComparison, ScalerChoice, SummaryRow};
pub use crate::dataset::{train_test_split, Dataset};
pub use crate::error::{EmularError, Result};
pub use crate::metrics::{r_squared, r_squared_multi, rmse, rmse_multi};
pub use crate::model_selection::{CvSummary, FailurePolicy, KFold};
pub use crate::params::{ParamDistribution, ParamMap, ParamValue, SearchSpace};
pub use crate::primitives::{Matrix, Vector};
pub use crate::progress::{ProgressSink, SilentProgress};
pub use crate::registry::{ModelRegistry, ModelSpec};
pub use crate::traits::{Emulator, Transformer};
