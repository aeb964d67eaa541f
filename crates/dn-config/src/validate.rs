//! Semantic validation for configuration files.
//!
//! Shape and graph checks of network definitions (cycles, table sizes, CPT
//! normalization) belong to the model builder; this module only rejects
//! settings and definitions that are malformed before any graph exists.

use std::collections::HashSet;
use thiserror::Error;

use crate::engine::EngineSettings;
use crate::network::{NetworkSpec, VariableKindSpec};

/// Largest tolerance accepted for any comparison knob.
const MAX_TOLERANCE: f64 = 0.1;

/// Errors that can occur during semantic validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Schema version {actual} is incompatible with {expected}")]
    SchemaVersion { expected: String, actual: String },

    #[error("{field} must be finite and in (0, {max}] (got {value})")]
    ToleranceRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("Network definition has no variables")]
    EmptyNetwork,

    #[error("Variable name must not be empty (entry {index})")]
    EmptyName { index: usize },

    #[error("Variable {name} is defined more than once")]
    DuplicateName { name: String },

    #[error("Decision variable {name} must not carry a {field}")]
    DecisionField { name: String, field: &'static str },

    #[error("Utility variable {name} must not declare states")]
    UtilityStates { name: String },
}

/// Validate engine settings semantically.
pub fn validate_engine_settings(settings: &EngineSettings) -> Result<(), ValidationError> {
    check_schema_version(&settings.schema_version)?;
    check_tolerance("normalization_tolerance", settings.normalization_tolerance)?;
    check_tolerance("tie_tolerance", settings.tie_tolerance)?;
    Ok(())
}

/// Validate a network definition before it is handed to the model builder.
pub fn validate_network_spec(spec: &NetworkSpec) -> Result<(), ValidationError> {
    check_schema_version(&spec.schema_version)?;
    if spec.variables.is_empty() {
        return Err(ValidationError::EmptyNetwork);
    }

    let mut seen = HashSet::new();
    for (index, var) in spec.variables.iter().enumerate() {
        if var.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { index });
        }
        if !seen.insert(var.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: var.name.clone(),
            });
        }
        match var.kind {
            VariableKindSpec::Decision => {
                if !var.parents.is_empty() {
                    return Err(ValidationError::DecisionField {
                        name: var.name.clone(),
                        field: "parents",
                    });
                }
                if !var.table.is_empty() {
                    return Err(ValidationError::DecisionField {
                        name: var.name.clone(),
                        field: "table",
                    });
                }
            }
            VariableKindSpec::Utility => {
                if !var.states.is_empty() {
                    return Err(ValidationError::UtilityStates {
                        name: var.name.clone(),
                    });
                }
            }
            VariableKindSpec::Chance => {}
        }
    }
    Ok(())
}

fn check_schema_version(actual: &str) -> Result<(), ValidationError> {
    let major = |v: &str| v.split('.').next().unwrap_or("").to_string();
    if major(actual) != major(crate::CONFIG_SCHEMA_VERSION) {
        return Err(ValidationError::SchemaVersion {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn check_tolerance(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 || value > MAX_TOLERANCE {
        return Err(ValidationError::ToleranceRange {
            field,
            value,
            max: MAX_TOLERANCE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::VariableSpec;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_engine_settings(&EngineSettings::default()).is_ok());
    }

    #[test]
    fn rejects_zero_tolerance() {
        let settings = EngineSettings {
            tie_tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_engine_settings(&settings),
            Err(ValidationError::ToleranceRange { field: "tie_tolerance", .. })
        ));
    }

    #[test]
    fn rejects_nan_tolerance() {
        let settings = EngineSettings {
            normalization_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(validate_engine_settings(&settings).is_err());
    }

    #[test]
    fn rejects_future_major_version() {
        let settings = EngineSettings {
            schema_version: "2.0.0".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_engine_settings(&settings),
            Err(ValidationError::SchemaVersion { .. })
        ));
    }

    #[test]
    fn accepts_minor_version_bump() {
        let settings = EngineSettings {
            schema_version: "1.4.0".to_string(),
            ..Default::default()
        };
        assert!(validate_engine_settings(&settings).is_ok());
    }

    #[test]
    fn rejects_empty_network() {
        let spec = NetworkSpec::new("empty", Vec::new());
        assert_eq!(validate_network_spec(&spec), Err(ValidationError::EmptyNetwork));
    }

    #[test]
    fn rejects_duplicate_names() {
        let spec = NetworkSpec::new(
            "dup",
            vec![
                VariableSpec::chance("A", &["F", "T"], &[], vec![0.5, 0.5]),
                VariableSpec::decision("A", &["x", "y"]),
            ],
        );
        assert_eq!(
            validate_network_spec(&spec),
            Err(ValidationError::DuplicateName {
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn rejects_decision_with_table() {
        let mut decision = VariableSpec::decision("D", &["x", "y"]);
        decision.table = vec![0.5, 0.5];
        let spec = NetworkSpec::new("bad", vec![decision]);
        assert!(matches!(
            validate_network_spec(&spec),
            Err(ValidationError::DecisionField { field: "table", .. })
        ));
    }

    #[test]
    fn rejects_utility_with_states() {
        let mut utility = VariableSpec::utility("U", &[], vec![1.0]);
        utility.states = vec!["value".to_string()];
        let spec = NetworkSpec::new("bad", vec![utility]);
        assert!(matches!(
            validate_network_spec(&spec),
            Err(ValidationError::UtilityStates { .. })
        ));
    }
}
