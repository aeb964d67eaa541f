//! Unified error type.
//!
//! Each layer has its own error enum; [`Error`] wraps them for callers (the
//! CLI) that need one type. Every error exposes:
//! - a stable `kind()` name such as `"CyclicGraphError"`
//! - a stable numeric `code()`
//! - an [`ErrorCategory`], which also selects the CLI exit code
//!
//! and serializes to an [`ErrorReport`]:
//! ```json
//! {
//!   "code": 30,
//!   "kind": "DegenerateDistributionError",
//!   "category": "inference",
//!   "message": "evidence {A=True, B=False} has zero probability (total mass 0)",
//!   "exit_code": 13
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::decision::DecisionError;
use crate::exit_codes::ExitCode;
use crate::factor::FactorError;
use crate::inference::InferenceError;
use crate::model::ModelError;

pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network construction and validation.
    Model,
    /// Query evaluation.
    Inference,
    /// Decision evaluation.
    Decision,
    /// Engine settings and definition files.
    Config,
    /// File I/O and serialization.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Decision => write!(f, "decision"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

impl ErrorCategory {
    pub fn exit_code(self) -> ExitCode {
        match self {
            ErrorCategory::Model => ExitCode::ModelError,
            ErrorCategory::Inference => ExitCode::InferenceError,
            ErrorCategory::Decision => ExitCode::DecisionError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

/// Unified error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Factor(#[from] FactorError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error(transparent)]
    Config(#[from] dn_config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable numeric codes, grouped by category:
/// - 10-29: model
/// - 30-49: inference (including factor algebra)
/// - 50-59: decision
/// - 60-69: config
/// - 70-79: I/O
const KIND_CODES: &[(&str, u32)] = &[
    ("CyclicGraphError", 10),
    ("DuplicateVariableError", 11),
    ("NormalizationError", 12),
    ("ShapeError", 13),
    ("UnknownVariableError", 14),
    ("UnknownStateError", 15),
    ("InvalidDomainError", 16),
    ("MissingCptError", 17),
    ("MissingUtilityError", 18),
    ("WrongKindError", 19),
    ("InvalidParentError", 20),
    ("NegativeProbabilityError", 21),
    ("NonFiniteError", 22),
    ("DegenerateDistributionError", 30),
    ("ScopeError", 31),
    ("StateOutOfRangeError", 32),
    ("InvalidEvidenceError", 33),
    ("InvalidQueryError", 34),
    ("QueryObservedError", 35),
    ("DecisionNotFixedError", 36),
    ("InvalidEliminationOrderError", 37),
    ("NoUtilityDependencyError", 50),
    ("DecisionObservedError", 51),
    ("UnknownActionError", 52),
    ("BreakEvenUnsupportedError", 53),
    ("ConfigError", 60),
    ("IoError", 70),
    ("SerializationError", 71),
];

impl Error {
    /// Stable error kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Model(e) => e.kind(),
            Error::Factor(e) => e.kind(),
            Error::Inference(e) => e.kind(),
            Error::Decision(e) => e.kind(),
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "SerializationError",
        }
    }

    pub fn code(&self) -> u32 {
        let kind = self.kind();
        KIND_CODES
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Category of the innermost error: a degenerate query raised while
    /// evaluating a decision is still an inference error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Model(_) => ErrorCategory::Model,
            Error::Factor(_) | Error::Inference(_) => ErrorCategory::Inference,
            Error::Decision(DecisionError::Model(_)) => ErrorCategory::Model,
            Error::Decision(DecisionError::Inference(_)) => ErrorCategory::Inference,
            Error::Decision(_) => ErrorCategory::Decision,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.category().exit_code()
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            kind: self.kind(),
            category: self.category(),
            message: self.to_string(),
            exit_code: self.exit_code().as_i32(),
        }
    }

    /// Headline/reason block for terminals.
    pub fn format_human(&self) -> String {
        let headline = match self.category() {
            ErrorCategory::Model => "Model Error",
            ErrorCategory::Inference => "Inference Error",
            ErrorCategory::Decision => "Decision Error",
            ErrorCategory::Config => "Configuration Error",
            ErrorCategory::Io => "I/O Error",
        };
        format!("✗ {headline} [{}]\n  Reason: {self}", self.kind())
    }
}

/// JSON form of an error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: u32,
    pub kind: &'static str,
    pub category: ErrorCategory,
    pub message: String,
    pub exit_code: i32,
}

impl ModelError {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::CyclicGraph { .. } => "CyclicGraphError",
            ModelError::DuplicateVariable { .. } => "DuplicateVariableError",
            ModelError::Normalization { .. } => "NormalizationError",
            ModelError::Shape { .. } => "ShapeError",
            ModelError::UnknownVariable { .. } => "UnknownVariableError",
            ModelError::UnknownState { .. } => "UnknownStateError",
            ModelError::InvalidDomain { .. } => "InvalidDomainError",
            ModelError::MissingCpt { .. } => "MissingCptError",
            ModelError::MissingUtility { .. } => "MissingUtilityError",
            ModelError::WrongKind { .. } => "WrongKindError",
            ModelError::InvalidParent { .. } => "InvalidParentError",
            ModelError::NegativeProbability { .. } => "NegativeProbabilityError",
            ModelError::NonFinite { .. } => "NonFiniteError",
        }
    }
}

impl FactorError {
    pub fn kind(&self) -> &'static str {
        match self {
            FactorError::Scope { .. } => "ScopeError",
            FactorError::Shape { .. } => "ShapeError",
            FactorError::StateOutOfRange { .. } => "StateOutOfRangeError",
            FactorError::NonFinite => "NonFiniteError",
            FactorError::Degenerate { .. } => "DegenerateDistributionError",
        }
    }
}

impl InferenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::UnknownVariable { .. } => "UnknownVariableError",
            InferenceError::UnknownState { .. } => "UnknownStateError",
            InferenceError::InvalidEvidence { .. } => "InvalidEvidenceError",
            InferenceError::InvalidQuery { .. } | InferenceError::EmptyQuery => {
                "InvalidQueryError"
            }
            InferenceError::QueryObserved { .. } => "QueryObservedError",
            InferenceError::DecisionNotFixed { .. } => "DecisionNotFixedError",
            InferenceError::InvalidEliminationOrder { .. } => "InvalidEliminationOrderError",
            InferenceError::Degenerate { .. } => "DegenerateDistributionError",
            InferenceError::Factor(e) => e.kind(),
        }
    }
}

impl DecisionError {
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::NoUtilityDependency { .. } => "NoUtilityDependencyError",
            DecisionError::DecisionObserved { .. } => "DecisionObservedError",
            DecisionError::UnknownAction { .. } => "UnknownActionError",
            DecisionError::BreakEvenUnsupported { .. } => "BreakEvenUnsupportedError",
            DecisionError::Model(e) => e.kind(),
            DecisionError::Inference(e) => e.kind(),
        }
    }
}
