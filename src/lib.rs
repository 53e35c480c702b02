//! Emular: automated emulator selection for expensive simulators.
//!
//! Emular cross-validates a registry of candidate regression emulators on
//! simulator input/output data, optionally searches their hyperparameters,
//! and hands back a ranked summary plus the best fitted model of each kind.
//!
//! # Quick Start
//!
//! ```
//! use emular::prelude::*;
//!
//! // Simulator snapshots: 2 inputs, 1 output, y = a + 2b.
//! let mut x_data = Vec::new();
//! let mut y_data = Vec::new();
//! for i in 0..40 {
//!     let (a, b) = ((i % 7) as f32, (i % 5) as f32);
//!     x_data.extend([a, b]);
//!     y_data.push(a + 2.0 * b);
//! }
//! let x = Matrix::from_vec(40, 2, x_data).unwrap();
//! let y = Matrix::from_vec(40, 1, y_data).unwrap();
//!
//! let mut comparison = EmulatorComparison::new();
//! comparison.setup(x, y, CompareConfig::new().with_models(["lin", "knn"])).unwrap();
//! comparison.compare().unwrap();
//!
//! let ranked = comparison.summarise_cv().unwrap();
//! assert_eq!(ranked.len(), 2);
//! assert_eq!(ranked[0].name, "LinearEmulator");
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`traits`]: The `Emulator` and `Transformer` capability contracts
//! - [`emulators`]: Built-in emulator zoo (linear, ridge, polynomial, RBF, k-NN)
//! - [`registry`]: Named emulator constructors and search spaces
//! - [`dataset`]: Input data container and train/test splitting
//! - [`preprocessing`]: Standard scaling and PCA reduction
//! - [`metrics`]: RMSE and R² scoring
//! - [`model_selection`]: K-fold cross-validation runner
//! - [`params`]: Hyperparameter values, distributions and search spaces
//! - [`search`]: Budgeted grid/random hyperparameter search
//! - [`parallel`]: Bounded task execution and cancellation
//! - [`progress`]: Progress observation hooks
//! - [`compare`]: The comparison orchestrator
//! - [`error`]: Error types

pub mod compare;
pub mod dataset;
pub mod emulators;
pub mod error;
pub mod metrics;
pub mod model_selection;
pub mod parallel;
pub mod params;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod progress;
pub mod registry;
pub mod search;
pub mod traits;
