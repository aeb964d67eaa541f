//! Network model: variables, CPTs, decisions and utilities.
//!
//! Models are assembled with [`NetworkBuilder`], which validates every step
//! (unknown parents, cycles, table shape, CPT normalization), and frozen into
//! an immutable [`Network`] by [`NetworkBuilder::build`]. Only built networks
//! can be queried.

pub mod builder;
pub mod load;
pub mod network;
pub mod variable;

pub use builder::NetworkBuilder;
pub use network::{Network, NetworkSummary, NodeSummary};
pub use variable::{Variable, VariableKind, UTILITY_STATE};

use thiserror::Error;

/// Errors raised while building or addressing a network.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("edge {parent} -> {child} would create a cycle")]
    CyclicGraph { parent: String, child: String },

    #[error("variable {name} already exists")]
    DuplicateVariable { name: String },

    #[error("CPT of {variable} does not sum to 1 for {row} (sum={sum:.6})")]
    Normalization {
        variable: String,
        row: String,
        sum: f64,
    },

    #[error("table for {variable} has {actual} entries, expected {expected}")]
    Shape {
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("unknown state {state} for variable {variable}")]
    UnknownState { variable: String, state: String },

    #[error("invalid domain for {variable}: {message}")]
    InvalidDomain { variable: String, message: String },

    #[error("chance variable {variable} has no CPT")]
    MissingCpt { variable: String },

    #[error("utility variable {variable} has no utility table")]
    MissingUtility { variable: String },

    #[error("{variable} is a {actual} variable, expected {expected}")]
    WrongKind {
        variable: String,
        expected: VariableKind,
        actual: VariableKind,
    },

    #[error("{parent} cannot be a parent of {variable}: {reason}")]
    InvalidParent {
        variable: String,
        parent: String,
        reason: &'static str,
    },

    #[error("CPT of {variable} contains negative probability {value}")]
    NegativeProbability { variable: String, value: f64 },

    #[error("table for {variable} contains a non-finite value")]
    NonFinite { variable: String },
}
