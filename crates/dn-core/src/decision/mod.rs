//! Decision evaluation: Maximum Expected Utility over a decision variable.
//!
//! - [`evaluator`]: per-action expected utility and arg-max selection
//! - [`break_even`]: indifference probability between two actions

pub mod break_even;
pub mod evaluator;

pub use break_even::BreakEven;
pub use evaluator::{ActionUtility, DecisionEvaluator, DecisionResult};

use crate::inference::InferenceError;
use crate::model::ModelError;
use thiserror::Error;

/// Errors raised during decision evaluation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecisionError {
    #[error("decision {decision} has no influence path to utility {utility}")]
    NoUtilityDependency { decision: String, utility: String },

    #[error("decision {decision} is already fixed by the evidence")]
    DecisionObserved { decision: String },

    #[error("unknown action {action} for decision {decision}")]
    UnknownAction { decision: String, action: String },

    #[error("break-even analysis not possible: {reason}")]
    BreakEvenUnsupported { reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
