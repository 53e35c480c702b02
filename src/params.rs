//! Hyperparameter values, distributions and search spaces.
//!
//! A [`SearchSpace`] maps parameter names to candidate distributions and can
//! either sample random configurations or enumerate a finite grid. Parameter
//! names for staged models are qualified (`stage.param`), so a flat map
//! covers nested pipelines too.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A concrete hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    /// Get as f64 if numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as i64 if integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:.6}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered mapping from parameter name to value.
///
/// `BTreeMap` keys give a deterministic iteration order, so configuration
/// display, deduplication and tie-breaks never depend on insertion order.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Renders a configuration as `{k=v, ...}` for logs and reports.
#[must_use]
pub fn format_params(params: &ParamMap) -> String {
    let entries: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Candidate distribution for one hyperparameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamDistribution {
    /// Continuous parameter in [low, high].
    Continuous {
        low: f64,
        high: f64,
        log_scale: bool,
    },
    /// Integer parameter in [low, high] inclusive.
    Integer { low: i64, high: i64 },
    /// Categorical parameter with discrete choices.
    Categorical { choices: Vec<ParamValue> },
}

impl ParamDistribution {
    /// Create continuous distribution over [low, high].
    #[must_use]
    pub fn continuous(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: false,
        }
    }

    /// Create continuous distribution sampled on a log scale.
    #[must_use]
    pub fn continuous_log(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: true,
        }
    }

    /// Create integer distribution over [low, high] inclusive.
    #[must_use]
    pub fn integer(low: i64, high: i64) -> Self {
        Self::Integer { low, high }
    }

    /// Create categorical distribution from choices.
    #[must_use]
    pub fn categorical<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self::Categorical {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// Sample a random value from this distribution.
    #[must_use]
    pub fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        match self {
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                let value = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    let u = rng.gen_f64();
                    (log_low + u * (log_high - log_low)).exp()
                } else {
                    rng.gen_f64_range(*low, *high)
                };
                ParamValue::Float(value)
            }
            Self::Integer { low, high } => ParamValue::Int(rng.gen_i64_range(*low, *high)),
            Self::Categorical { choices } => choices[rng.gen_usize(choices.len())].clone(),
        }
    }

    /// All values of a finite distribution, `None` for continuous ones.
    #[must_use]
    pub fn values(&self) -> Option<Vec<ParamValue>> {
        match self {
            Self::Continuous { .. } => None,
            Self::Integer { low, high } => Some((*low..=*high).map(ParamValue::Int).collect()),
            Self::Categorical { choices } => Some(choices.clone()),
        }
    }
}

/// Search space for one model's hyperparameters.
///
/// # Example
///
/// ```
/// use emular::params::{ParamDistribution, SearchSpace, XorShift64};
///
/// let space = SearchSpace::new()
///     .add("k", ParamDistribution::integer(2, 10))
///     .add("weights", ParamDistribution::categorical(["uniform", "distance"]));
///
/// assert_eq!(space.cardinality(), Some(18));
/// let mut rng = XorShift64::new(42);
/// let config = space.sample(&mut rng);
/// assert_eq!(config.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    params: BTreeMap<String, ParamDistribution>,
}

impl SearchSpace {
    /// Create an empty search space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Add a parameter distribution.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, dist: ParamDistribution) -> Self {
        self.params.insert(name.into(), dist);
        self
    }

    /// Get a distribution by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamDistribution> {
        self.params.get(name)
    }

    /// Iterate over parameter definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamDistribution)> {
        self.params.iter()
    }

    /// Sample a random configuration.
    #[must_use]
    pub fn sample(&self, rng: &mut impl Rng) -> ParamMap {
        self.params
            .iter()
            .map(|(name, dist)| (name.clone(), dist.sample(rng)))
            .collect()
    }

    /// Number of distinct configurations, `None` if any parameter is continuous.
    ///
    /// The empty space has cardinality 1: the single default configuration.
    #[must_use]
    pub fn cardinality(&self) -> Option<usize> {
        let mut total = 1usize;
        for dist in self.params.values() {
            let n = dist.values()?.len();
            total = total.checked_mul(n)?;
        }
        Some(total)
    }

    /// Enumerate every configuration of a finite space, `None` otherwise.
    ///
    /// The cartesian product is taken in parameter-name order, so the
    /// resulting sequence is deterministic.
    #[must_use]
    pub fn enumerate(&self) -> Option<Vec<ParamMap>> {
        let mut configs: Vec<ParamMap> = vec![ParamMap::new()];
        for (name, dist) in &self.params {
            let values = dist.values()?;
            let mut next = Vec::with_capacity(configs.len() * values.len());
            for config in &configs {
                for value in &values {
                    let mut grown = config.clone();
                    grown.insert(name.clone(), value.clone());
                    next.push(grown);
                }
            }
            configs = next;
        }
        Some(configs)
    }
}

/// Simple random number generator trait.
pub trait Rng {
    /// Generate uniform random in [0, 1).
    fn gen_f64(&mut self) -> f64;

    /// Generate random f64 in range [low, high).
    fn gen_f64_range(&mut self, low: f64, high: f64) -> f64 {
        low + self.gen_f64() * (high - low)
    }

    /// Generate random i64 in range [low, high].
    fn gen_i64_range(&mut self, low: i64, high: i64) -> i64;

    /// Generate random usize in range [0, len).
    fn gen_usize(&mut self, len: usize) -> usize;
}

/// Xorshift64 RNG for deterministic, seed-reproducible sampling.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create RNG with seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Generate next u64.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl Rng for XorShift64 {
    fn gen_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    fn gen_i64_range(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        let range = (high - low + 1) as u64;
        low + (self.next_u64() % range) as i64
    }

    fn gen_usize(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() as usize) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Int(3).as_i64(), Some(3));
        assert_eq!(ParamValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ParamValue::Str("a".into()).as_str(), Some("a"));
        assert_eq!(ParamValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_format_params_deterministic_order() {
        let mut params = ParamMap::new();
        params.insert("kernel".into(), "gaussian".into());
        params.insert("alpha".into(), ParamValue::Float(0.5));
        // BTreeMap orders by key, so alpha renders first regardless of insertion.
        assert_eq!(format_params(&params), "{alpha=0.500000, kernel=gaussian}");
    }

    #[test]
    fn test_integer_values_inclusive() {
        let dist = ParamDistribution::integer(2, 4);
        let values = dist.values().expect("finite");
        assert_eq!(
            values,
            vec![ParamValue::Int(2), ParamValue::Int(3), ParamValue::Int(4)]
        );
    }

    #[test]
    fn test_continuous_has_no_finite_values() {
        assert!(ParamDistribution::continuous(0.0, 1.0).values().is_none());
    }

    #[test]
    fn test_cardinality_product() {
        let space = SearchSpace::new()
            .add("k", ParamDistribution::integer(1, 3))
            .add("w", ParamDistribution::categorical(["a", "b"]));
        assert_eq!(space.cardinality(), Some(6));
    }

    #[test]
    fn test_cardinality_none_with_continuous() {
        let space = SearchSpace::new().add("alpha", ParamDistribution::continuous(0.0, 1.0));
        assert_eq!(space.cardinality(), None);
    }

    #[test]
    fn test_empty_space_single_default_config() {
        let space = SearchSpace::new();
        assert_eq!(space.cardinality(), Some(1));
        let configs = space.enumerate().expect("finite");
        assert_eq!(configs.len(), 1);
        assert!(configs[0].is_empty());
    }

    #[test]
    fn test_enumerate_full_grid() {
        let space = SearchSpace::new()
            .add("k", ParamDistribution::integer(1, 2))
            .add("w", ParamDistribution::categorical(["a", "b"]));
        let configs = space.enumerate().expect("finite");
        assert_eq!(configs.len(), 4);
        // All configurations distinct.
        for (i, a) in configs.iter().enumerate() {
            for b in configs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_sample_reproducible_with_seed() {
        let space = SearchSpace::new()
            .add("alpha", ParamDistribution::continuous_log(1e-3, 1e2))
            .add("k", ParamDistribution::integer(2, 10));
        let mut rng1 = XorShift64::new(7);
        let mut rng2 = XorShift64::new(7);
        assert_eq!(space.sample(&mut rng1), space.sample(&mut rng2));
    }

    #[test]
    fn test_log_scale_sampling_within_bounds() {
        let dist = ParamDistribution::continuous_log(1e-3, 1e2);
        let mut rng = XorShift64::new(42);
        for _ in 0..100 {
            let v = dist.sample(&mut rng).as_f64().expect("float");
            assert!((1e-3..=1e2 + 1e-9).contains(&v), "out of bounds: {v}");
        }
    }

    #[test]
    fn test_xorshift_zero_seed_does_not_stall() {
        let mut rng = XorShift64::new(0);
        let a = rng.gen_f64();
        let b = rng.gen_f64();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_integer_sample_within_bounds(low in -50i64..50, span in 0i64..100, seed in 0u64..1000) {
            let high = low + span;
            let dist = ParamDistribution::integer(low, high);
            let mut rng = XorShift64::new(seed);
            for _ in 0..20 {
                let v = dist.sample(&mut rng).as_i64().expect("int");
                prop_assert!(v >= low && v <= high);
            }
        }

        #[test]
        fn prop_categorical_sample_is_a_choice(n in 1usize..8, seed in 0u64..1000) {
            let choices: Vec<i64> = (0..n as i64).collect();
            let dist = ParamDistribution::categorical(choices.clone());
            let mut rng = XorShift64::new(seed);
            for _ in 0..20 {
                let v = dist.sample(&mut rng).as_i64().expect("int");
                prop_assert!(choices.contains(&v));
            }
        }

        #[test]
        fn prop_enumerate_len_matches_cardinality(k in 1i64..5, c in 1usize..4) {
            let choices: Vec<i64> = (0..c as i64).collect();
            let space = SearchSpace::new()
                .add("k", ParamDistribution::integer(1, k))
                .add("c", ParamDistribution::categorical(choices));
            let card = space.cardinality().expect("finite");
            let configs = space.enumerate().expect("finite");
            prop_assert_eq!(configs.len(), card);
        }
    }
}
