//! Variable definitions.

use crate::factor::VarId;
use serde::Serialize;
use std::fmt;

/// Pseudo-state label of a utility variable.
pub const UTILITY_STATE: &str = "value";

/// Role of a variable in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Random variable owning a CPT.
    Chance,
    /// Agent-controlled, no distribution; fixed as evidence per action.
    Decision,
    /// Deterministic payoff of its parents.
    Utility,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Chance => write!(f, "chance"),
            VariableKind::Decision => write!(f, "decision"),
            VariableKind::Utility => write!(f, "utility"),
        }
    }
}

/// A named discrete variable with an ordered domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub(crate) id: VarId,
    pub(crate) name: String,
    pub(crate) kind: VariableKind,
    pub(crate) states: Vec<String>,
    pub(crate) parents: Vec<VarId>,
}

impl Variable {
    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Ordered state labels (`["value"]` for utilities).
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Parents in declaration order.
    pub fn parents(&self) -> &[VarId] {
        &self.parents
    }

    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    pub fn state_index(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s == label)
    }

    pub fn is_chance(&self) -> bool {
        self.kind == VariableKind::Chance
    }

    pub fn is_decision(&self) -> bool {
        self.kind == VariableKind::Decision
    }

    pub fn is_utility(&self) -> bool {
        self.kind == VariableKind::Utility
    }
}
