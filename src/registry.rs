//! Model registry: named emulator constructors and their search spaces.
//!
//! The registry is the single source of truth for which emulators a
//! comparison run can instantiate. Each entry carries a display name, a
//! short code for terse selection, a factory closure and the model's
//! default hyperparameter search space.

use std::fmt;
use std::sync::Arc;

use crate::emulators::{
    KNearest, LinearEmulator, RadialBasis, RidgeEmulator, SecondOrderPolynomial,
};
use crate::error::{EmularError, Result};
use crate::params::SearchSpace;
use crate::traits::Emulator;

/// Factory producing a fresh, unfitted emulator instance.
pub type EmulatorFactory = Arc<dyn Fn() -> Box<dyn Emulator> + Send + Sync>;

/// One registered emulator.
#[derive(Clone)]
pub struct ModelSpec {
    name: String,
    short_name: String,
    factory: EmulatorFactory,
    search_space: SearchSpace,
}

impl ModelSpec {
    /// Registers an emulator under a display name and a short code.
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        search_space: SearchSpace,
        factory: impl Fn() -> Box<dyn Emulator> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            factory: Arc::new(factory),
            search_space,
        }
    }

    /// Display name, e.g. `RadialBasis`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short code, e.g. `rbf`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Default hyperparameter search space.
    #[must_use]
    pub fn search_space(&self) -> &SearchSpace {
        &self.search_space
    }

    /// Builds a fresh, unfitted instance.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Emulator> {
        (self.factory)()
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.short_name == name
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("name", &self.name)
            .field("short_name", &self.short_name)
            .field("search_space", &self.search_space)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of model specs.
///
/// Registry order is meaningful: it is the final tie-break when ranked
/// summaries have identical scores.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in emulator zoo.
    #[must_use]
    pub fn core() -> Self {
        let mut registry = Self::new();
        registry.register(ModelSpec::new(
            "LinearEmulator",
            "lin",
            LinearEmulator::search_space(),
            || Box::new(LinearEmulator::new()),
        ));
        registry.register(ModelSpec::new(
            "RidgeEmulator",
            "rdg",
            RidgeEmulator::search_space(),
            || Box::new(RidgeEmulator::new()),
        ));
        registry.register(ModelSpec::new(
            "SecondOrderPolynomial",
            "sop",
            SecondOrderPolynomial::search_space(),
            || Box::new(SecondOrderPolynomial::new()),
        ));
        registry.register(ModelSpec::new(
            "RadialBasis",
            "rbf",
            RadialBasis::search_space(),
            || Box::new(RadialBasis::new()),
        ));
        registry.register(ModelSpec::new(
            "KNearest",
            "knn",
            KNearest::search_space(),
            || Box::new(KNearest::new()),
        ));
        registry
    }

    /// Appends a spec. A duplicate name or short code replaces the
    /// existing entry in place, keeping its position.
    pub fn register(&mut self, spec: ModelSpec) {
        if let Some(existing) = self
            .specs
            .iter_mut()
            .find(|s| s.name == spec.name || s.short_name == spec.short_name)
        {
            *existing = spec;
        } else {
            self.specs.push(spec);
        }
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All specs in registration order.
    #[must_use]
    pub fn list(&self) -> &[ModelSpec] {
        &self.specs
    }

    /// Looks up a spec by display name or short code.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` naming every valid choice.
    pub fn resolve(&self, name: &str) -> Result<&ModelSpec> {
        self.specs
            .iter()
            .find(|s| s.matches(name))
            .ok_or_else(|| EmularError::UnknownModel {
                name: name.to_string(),
                available: self.available(),
            })
    }

    /// Subset selection in registry order, duplicates collapsed.
    ///
    /// `None` selects every registered model.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` on the first name that fails to resolve.
    pub fn select(&self, names: Option<&[String]>) -> Result<Vec<&ModelSpec>> {
        let Some(names) = names else {
            return Ok(self.specs.iter().collect());
        };
        if names.is_empty() {
            return Err(EmularError::invalid_configuration(
                "model selection must not be empty",
            ));
        }
        let mut wanted = Vec::with_capacity(names.len());
        for name in names {
            wanted.push(self.resolve(name)?);
        }
        Ok(self
            .specs
            .iter()
            .filter(|s| wanted.iter().any(|w| w.name == s.name))
            .collect())
    }

    /// Human-readable `Name (code), ...` list for error messages.
    #[must_use]
    pub fn available(&self) -> String {
        self.specs
            .iter()
            .map(|s| format!("{} ({})", s.name, s.short_name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
