//! Error types for emulator comparison runs.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for emular operations.
///
/// Covers registry lookups, hyperparameter validation, setup-time
/// configuration checks, fold-level fit failures and state-machine
/// violations of the comparison orchestrator.
///
/// # Examples
///
/// ```
/// use emular::error::EmularError;
///
/// let err = EmularError::UnknownModel {
///     name: "nope".to_string(),
///     available: "RadialBasis (rbf), SecondOrderPolynomial (sop)".to_string(),
/// };
/// assert!(err.to_string().contains("Unknown model"));
/// ```
#[derive(Debug)]
pub enum EmularError {
    /// Model name not found in the registry or among the selected models.
    UnknownModel {
        /// The name that failed to resolve
        name: String,
        /// Human-readable list of valid names
        available: String,
    },

    /// Invalid hyperparameter key or value for a model.
    InvalidParameter {
        /// Model the parameter was set on
        model: String,
        /// Parameter name (qualified for staged models, e.g. `ridge.alpha`)
        param: String,
        /// What went wrong
        message: String,
    },

    /// Setup-time configuration validation failure.
    InvalidConfiguration {
        /// Validation failure message
        message: String,
    },

    /// A model failed to fit or converge.
    ModelFit {
        /// Model that failed
        model: String,
        /// Fold index, when the failure happened inside cross-validation
        fold: Option<usize>,
        /// Underlying failure description
        message: String,
    },

    /// Summary or fitted model requested before `compare()` completed.
    NotCompared,

    /// Prediction or transform requested before fitting.
    NotFitted {
        /// What was not fitted
        what: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Combined failures from independent units of work, in submission order.
    Aggregate {
        /// One entry per failing unit
        failures: Vec<String>,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for EmularError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmularError::UnknownModel { name, available } => {
                write!(f, "Unknown model '{name}'. Available models: {available}")
            }
            EmularError::InvalidParameter {
                model,
                param,
                message,
            } => {
                write!(f, "Invalid parameter '{param}' for {model}: {message}")
            }
            EmularError::InvalidConfiguration { message } => {
                write!(f, "Invalid configuration: {message}")
            }
            EmularError::ModelFit {
                model,
                fold,
                message,
            } => match fold {
                Some(fold) => write!(f, "Model {model} failed to fit on fold {fold}: {message}"),
                None => write!(f, "Model {model} failed to fit: {message}"),
            },
            EmularError::NotCompared => {
                write!(f, "Results not available: compare() has not been run")
            }
            EmularError::NotFitted { what } => write!(f, "{what} is not fitted"),
            EmularError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
            EmularError::Aggregate { failures } => {
                write!(f, "{} unit(s) of work failed: ", failures.len())?;
                write!(f, "{}", failures.join("; "))
            }
            EmularError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EmularError {}

impl From<&str> for EmularError {
    fn from(msg: &str) -> Self {
        EmularError::Other(msg.to_string())
    }
}

impl From<String> for EmularError {
    fn from(msg: String) -> Self {
        EmularError::Other(msg)
    }
}

impl EmularError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a setup-time configuration error
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    #[must_use]
    pub fn invalid_parameter(
        model: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            model: model.into(),
            param: param.into(),
            message: message.into(),
        }
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<&str> for EmularError {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<EmularError> for &str {
    fn eq(&self, other: &EmularError) -> bool {
        *self == other.to_string()
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, EmularError>;
