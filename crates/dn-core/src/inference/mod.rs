//! Exact inference over a built [`Network`](crate::model::Network).
//!
//! - [`evidence`]: name-keyed observations and their resolution
//! - [`ordering`]: pluggable elimination-order heuristics
//! - [`cache`]: read-mostly cache of computed orders
//! - [`elimination`]: the variable-elimination engine

pub mod cache;
pub mod elimination;
pub mod evidence;
pub mod ordering;

pub use cache::{CacheStats, OrderCache, OrderKey};
pub use elimination::{EliminationStats, Posterior, VariableElimination};
pub use evidence::{Evidence, Observation};
pub use ordering::{
    EliminationHeuristic, EliminationOrdering, MinFill, MinSize, ReverseTopological,
};

use crate::factor::FactorError;
use thiserror::Error;

/// Errors raised by a single query. The network is never affected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("unknown state {state} for variable {variable}")]
    UnknownState { variable: String, state: String },

    #[error("cannot observe {variable}: {reason}")]
    InvalidEvidence {
        variable: String,
        reason: &'static str,
    },

    #[error("cannot query {variable}: {reason}")]
    InvalidQuery { variable: String, reason: String },

    #[error("query variable {variable} is also observed")]
    QueryObserved { variable: String },

    #[error("query names no variables")]
    EmptyQuery,

    #[error("{variable} depends on decision {decision}, which is not fixed")]
    DecisionNotFixed { variable: String, decision: String },

    #[error("invalid elimination order: {message}")]
    InvalidEliminationOrder { message: String },

    #[error("evidence {evidence} has zero probability (total mass {total})")]
    Degenerate { evidence: String, total: f64 },

    #[error(transparent)]
    Factor(#[from] FactorError),
}
