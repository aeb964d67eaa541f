//! Observed variable assignments, keyed by name.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::factor::Assignment;
use crate::inference::InferenceError;
use crate::model::{Network, VariableKind};

/// A per-query set of observations: variable name → state label.
///
/// Decision variables may appear here; that is how the evaluator fixes an
/// action. Utility variables never can.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Evidence {
    observations: BTreeMap<String, String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, variable: &str, state: &str) -> Self {
        self.insert(variable, state);
        self
    }

    /// Insert or overwrite an observation.
    pub fn insert(&mut self, variable: &str, state: &str) {
        self.observations
            .insert(variable.to_string(), state.to_string());
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.observations.get(variable).map(String::as_str)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.observations.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.observations
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Translate names and labels into a positional assignment.
    pub fn resolve(&self, network: &Network) -> Result<Assignment, InferenceError> {
        let mut assignment = Assignment::new();
        for (name, state) in self.iter() {
            let var = network
                .lookup(name)
                .map_err(|_| InferenceError::UnknownVariable {
                    name: name.to_string(),
                })?;
            if var.kind() == VariableKind::Utility {
                return Err(InferenceError::InvalidEvidence {
                    variable: name.to_string(),
                    reason: "utility variables cannot be observed",
                });
            }
            let index = var
                .state_index(state)
                .ok_or_else(|| InferenceError::UnknownState {
                    variable: name.to_string(),
                    state: state.to_string(),
                })?;
            assignment.insert(var.id(), index);
        }
        Ok(assignment)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Evidence {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut evidence = Evidence::new();
        for (k, v) in iter {
            evidence.insert(k.as_ref(), v.as_ref());
        }
        evidence
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// One `VAR=STATE` observation, as typed on a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub variable: String,
    pub state: String,
}

impl FromStr for Observation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (variable, state) = s
            .split_once('=')
            .ok_or_else(|| format!("expected VAR=STATE, got '{s}'"))?;
        let (variable, state) = (variable.trim(), state.trim());
        if variable.is_empty() || state.is_empty() {
            return Err(format!("expected VAR=STATE, got '{s}'"));
        }
        Ok(Observation {
            variable: variable.to_string(),
            state: state.to_string(),
        })
    }
}

impl FromIterator<Observation> for Evidence {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        iter.into_iter().map(|o| (o.variable, o.state)).collect()
    }
}
