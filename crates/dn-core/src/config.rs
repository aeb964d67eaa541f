//! Runtime engine configuration.
//!
//! [`EngineConfig`] is what the engine and evaluator actually read. It is
//! normally derived from [`dn_config::EngineSettings`] loaded from disk, with
//! the elimination ordering widened to allow explicit custom orders.

use dn_config::EngineSettings;
use serde::Serialize;

use crate::inference::EliminationOrdering;

/// Default tolerance under which two expected utilities are tied.
pub const DEFAULT_TIE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub ordering: EliminationOrdering,
    /// Drop chance variables that are not ancestors of the query or evidence.
    pub prune_barren: bool,
    /// Reuse heuristic orders across queries with the same variable sets.
    pub cache_orders: bool,
    /// CPT row-sum tolerance used when building networks from files.
    pub normalization_tolerance: f64,
    pub tie_tolerance: f64,
    /// Fail `choose_action` when the decision cannot affect the utility.
    pub require_influence: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            ordering: settings.ordering.into(),
            prune_barren: settings.prune_barren,
            cache_orders: settings.cache_orders,
            normalization_tolerance: settings.normalization_tolerance,
            tie_tolerance: settings.tie_tolerance,
            require_influence: settings.require_influence,
        }
    }
}

impl EngineConfig {
    pub fn with_ordering(mut self, ordering: EliminationOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_prune_barren(mut self, enabled: bool) -> Self {
        self.prune_barren = enabled;
        self
    }

    pub fn with_cache_orders(mut self, enabled: bool) -> Self {
        self.cache_orders = enabled;
        self
    }

    pub fn with_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.tie_tolerance = tolerance;
        self
    }

    pub fn with_require_influence(mut self, required: bool) -> Self {
        self.require_influence = required;
        self
    }

    /// Compact view for JSON output.
    pub fn summary(&self) -> EngineConfigSummary {
        EngineConfigSummary {
            ordering: self.ordering.to_string(),
            prune_barren: self.prune_barren,
            cache_orders: self.cache_orders,
            tie_tolerance: self.tie_tolerance,
            require_influence: self.require_influence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineConfigSummary {
    pub ordering: String,
    pub prune_barren: bool,
    pub cache_orders: bool,
    pub tie_tolerance: f64,
    pub require_influence: bool,
}
