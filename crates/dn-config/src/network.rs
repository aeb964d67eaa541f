//! Network definition file types.
//!
//! A definition lists variables in any order; each chance variable carries
//! its CPT and each utility variable its payoff table. Tables are flat,
//! row-major over the parents in declared order, with a chance variable's own
//! states varying fastest (one row per parent assignment).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a variable in the decision network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKindSpec {
    /// Random variable with a CPT.
    #[default]
    Chance,
    /// Agent-controlled variable without a distribution.
    Decision,
    /// Real-valued payoff of its parents.
    Utility,
}

impl fmt::Display for VariableKindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKindSpec::Chance => write!(f, "chance"),
            VariableKindSpec::Decision => write!(f, "decision"),
            VariableKindSpec::Utility => write!(f, "utility"),
        }
    }
}

/// One variable of a network definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,

    #[serde(default)]
    pub kind: VariableKindSpec,

    /// Ordered state labels (empty for utilities).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// CPT or utility values (empty for decisions).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariableSpec {
    pub fn chance(name: &str, states: &[&str], parents: &[&str], table: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKindSpec::Chance,
            states: states.iter().map(|s| s.to_string()).collect(),
            parents: parents.iter().map(|s| s.to_string()).collect(),
            table,
            description: None,
        }
    }

    pub fn decision(name: &str, states: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKindSpec::Decision,
            states: states.iter().map(|s| s.to_string()).collect(),
            parents: Vec::new(),
            table: Vec::new(),
            description: None,
        }
    }

    pub fn utility(name: &str, parents: &[&str], table: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKindSpec::Utility,
            states: Vec::new(),
            parents: parents.iter().map(|s| s.to_string()).collect(),
            table,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A complete network definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub variables: Vec<VariableSpec>,
}

impl NetworkSpec {
    pub fn new(name: &str, variables: Vec<VariableSpec>) -> Self {
        Self {
            schema_version: crate::default_schema_version(),
            name: Some(name.to_string()),
            description: None,
            variables,
        }
    }

    /// Find a variable definition by name.
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names of all variables of a given kind, in file order.
    pub fn names_of_kind(&self, kind: VariableKindSpec) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.name.as_str())
            .collect()
    }
}
