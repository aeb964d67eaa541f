//! Engine settings.
//!
//! These knobs change how a query is computed (elimination order, pruning,
//! caching) and how results are compared, never what the answer is, with the
//! single exception of `require_influence`, which decides whether a decision
//! that cannot affect its utility is an error or a reported tie.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Elimination ordering heuristic selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingName {
    /// Greedy: eliminate the variable whose product factor is smallest.
    #[default]
    MinSize,
    /// Greedy: eliminate the variable adding the fewest fill-in edges.
    MinFill,
    /// Deterministic fallback: children before parents.
    ReverseTopological,
}

impl OrderingName {
    pub const ALL: &'static [OrderingName] = &[
        OrderingName::MinSize,
        OrderingName::MinFill,
        OrderingName::ReverseTopological,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingName::MinSize => "min_size",
            OrderingName::MinFill => "min_fill",
            OrderingName::ReverseTopological => "reverse_topological",
        }
    }
}

impl fmt::Display for OrderingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderingName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "min_size" | "minsize" | "min_weight" => Ok(OrderingName::MinSize),
            "min_fill" | "minfill" => Ok(OrderingName::MinFill),
            "reverse_topological" | "topological" | "reverse_topo" => {
                Ok(OrderingName::ReverseTopological)
            }
            _ => Err(format!("unknown elimination ordering: {}", s)),
        }
    }
}

/// Complete engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub schema_version: String,

    /// Heuristic used to pick the elimination order.
    pub ordering: OrderingName,

    /// Drop variables that are neither query, evidence, nor their ancestors.
    pub prune_barren: bool,

    /// Reuse orders computed for the same query/evidence variable sets.
    pub cache_orders: bool,

    /// Allowed deviation from 1 when checking CPT rows.
    pub normalization_tolerance: f64,

    /// Expected utilities closer than this are treated as tied.
    pub tie_tolerance: f64,

    /// Reject decisions that cannot influence the utility.
    pub require_influence: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            schema_version: crate::default_schema_version(),
            ordering: OrderingName::MinSize,
            prune_barren: true,
            cache_orders: true,
            normalization_tolerance: 1e-6,
            tie_tolerance: 1e-9,
            require_influence: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_name_parses_aliases() {
        assert_eq!("min-fill".parse::<OrderingName>(), Ok(OrderingName::MinFill));
        assert_eq!("MIN_SIZE".parse::<OrderingName>(), Ok(OrderingName::MinSize));
        assert_eq!(
            "topological".parse::<OrderingName>(),
            Ok(OrderingName::ReverseTopological)
        );
        assert!("random".parse::<OrderingName>().is_err());
    }

    #[test]
    fn ordering_name_display_round_trips() {
        for name in OrderingName::ALL {
            assert_eq!(name.to_string().parse::<OrderingName>(), Ok(*name));
        }
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: EngineSettings = toml::from_str("ordering = \"min_fill\"").unwrap();
        assert_eq!(settings.ordering, OrderingName::MinFill);
        assert!(settings.prune_barren);
        assert_eq!(settings.tie_tolerance, 1e-9);
    }

    #[test]
    fn json_uses_snake_case_names() {
        let settings = EngineSettings {
            ordering: OrderingName::ReverseTopological,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"reverse_topological\""));
    }
}
