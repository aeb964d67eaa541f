//! Structured event vocabulary.
//!
//! Every event carries a stable `event` name from [`event_names`] and, when
//! emitted inside a CLI run, the `run_id` and `stage` of the enclosing span.

use serde::{Deserialize, Serialize};

/// Processing stages of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Loading and validating the network.
    Model,
    /// Variable elimination.
    Infer,
    /// Expected-utility evaluation.
    Decide,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Model => "model",
            Stage::Infer => "infer",
            Stage::Decide => "decide",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/init
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Model
    pub const MODEL_LOADED: &str = "model.loaded";
    pub const MODEL_INVALID: &str = "model.invalid";

    // Infer
    pub const ELIMINATION_STEP: &str = "infer.elimination_step";
    pub const INFER_COMPLETE: &str = "infer.complete";

    // Decide
    pub const DECIDE_ACTION_EVALUATED: &str = "decide.action_evaluated";
    pub const DECIDE_TIE_BREAK: &str = "decide.tie_break";
    pub const DECIDE_NO_INFLUENCE: &str = "decide.no_influence";
    pub const DECIDE_COMPLETE: &str = "decide.complete";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Model.to_string(), "model");
        assert_eq!(Stage::Infer.to_string(), "infer");
        assert_eq!(Stage::Decide.to_string(), "decide");
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::Init).unwrap(), "\"init\"");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_names::RUN_STARTED, "run.started");
        assert_eq!(event_names::INFER_COMPLETE, "infer.complete");
        assert_eq!(event_names::DECIDE_TIE_BREAK, "decide.tie_break");
    }
}
