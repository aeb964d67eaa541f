//! Output formats and payload rendering for the `dn` CLI.
//!
//! JSON payloads are wrapped in an [`Envelope`] carrying the run id and the
//! configuration snapshot; text and summary renderings come from
//! [`TextRender`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::decision::{BreakEven, DecisionResult};
use crate::error::ErrorReport;
use crate::inference::{Evidence, Posterior};
use crate::model::NetworkSummary;

/// Version of the JSON output envelope.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON (default for machine consumption)
    #[default]
    Json,

    /// Human-readable report
    Text,

    /// One-line summary
    Summary,

    /// Minimal output (exit code only)
    Exitcode,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Summary => write!(f, "summary"),
            OutputFormat::Exitcode => write!(f, "exitcode"),
        }
    }
}

/// JSON wrapper around every command payload.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize, C: Serialize> {
    pub schema_version: &'static str,
    pub run_id: &'a str,
    pub generated_at: String,
    pub command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<&'a C>,
    pub result: &'a T,
}

impl<'a, T: Serialize, C: Serialize> Envelope<'a, T, C> {
    pub fn new(run_id: &'a str, command: &'a str, config: Option<&'a C>, result: &'a T) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION,
            run_id,
            generated_at: chrono::Utc::now().to_rfc3339(),
            command,
            config,
            result,
        }
    }
}

/// Plain-text renderings of a payload.
pub trait TextRender {
    /// Multi-line report.
    fn to_text(&self) -> String;

    /// Single line, no trailing newline.
    fn to_summary(&self) -> String;
}

/// `P(A, B | {e})` heading used by posterior renderings.
fn posterior_heading(variables: &[String], evidence: &Evidence) -> String {
    if evidence.is_empty() {
        format!("P({})", variables.join(", "))
    } else {
        format!("P({} | {})", variables.join(", "), evidence)
    }
}

impl TextRender for Posterior {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", posterior_heading(&self.variables, &self.evidence));
        let rows = self.labelled_rows();
        let width = rows
            .iter()
            .map(|(labels, _)| labels.join(", ").len())
            .max()
            .unwrap_or(0);
        for (labels, p) in rows {
            let _ = writeln!(out, "  {:<width$}  {:.6}", labels.join(", "), p);
        }
        let _ = writeln!(
            out,
            "  order [{}]  max table {}  multiplications {}",
            self.stats.order.join(", "),
            self.stats.max_table_size,
            self.stats.multiplications
        );
        out
    }

    fn to_summary(&self) -> String {
        let cells: Vec<String> = self
            .labelled_rows()
            .into_iter()
            .map(|(labels, p)| format!("{}={:.4}", labels.join(","), p))
            .collect();
        format!(
            "{}: {}",
            posterior_heading(&self.variables, &self.evidence),
            cells.join(" ")
        )
    }
}

impl TextRender for DecisionResult {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Decision {} on {} given {}",
            self.decision,
            self.utility,
            if self.evidence.is_empty() {
                "no evidence".to_string()
            } else {
                self.evidence.to_string()
            }
        );
        for action in &self.action_utilities {
            let marker = if action.action == self.chosen_action {
                "→"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                "  {} {:<12} EU = {:.4}",
                marker, action.action, action.expected_utility
            );
        }
        let _ = writeln!(
            out,
            "  Chosen: {} (EU {:.4}){}",
            self.chosen_action,
            self.expected_utility,
            if self.tie_break { " [tie]" } else { "" }
        );
        if !self.influences_utility {
            let _ = writeln!(
                out,
                "  Note: {} cannot influence {}",
                self.decision, self.utility
            );
        }
        out
    }

    fn to_summary(&self) -> String {
        format!(
            "{} = {} (EU {:.4}{})",
            self.decision,
            self.chosen_action,
            self.expected_utility,
            if self.tie_break { ", tie" } else { "" }
        )
    }
}

impl TextRender for BreakEven {
    fn to_text(&self) -> String {
        format!(
            "Break-even at P({}={}) = {:.6}: {} below, {} above\n",
            self.outcome, self.outcome_state, self.probability, self.below, self.above
        )
    }

    fn to_summary(&self) -> String {
        format!(
            "P({}={}) break-even {:.6}",
            self.outcome, self.outcome_state, self.probability
        )
    }
}

impl TextRender for NetworkSummary {
    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_summary(&self) -> String {
        format!(
            "{}: {} nodes, {} edges",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.nodes.len(),
            self.edges.len()
        )
    }
}

impl TextRender for ErrorReport {
    fn to_text(&self) -> String {
        format!("✗ {} [{}]\n  Reason: {}\n", self.category, self.kind, self.message)
    }

    fn to_summary(&self) -> String {
        format!("error {}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::VariableElimination;
    use crate::model::NetworkBuilder;

    fn rain() -> crate::model::Network {
        let mut b = NetworkBuilder::new();
        b.add_variable("Rain", &["no", "yes"], &[] as &[&str]).unwrap();
        b.add_variable("Wet", &["no", "yes"], &["Rain"]).unwrap();
        b.set_cpt("Rain", &[0.8, 0.2]).unwrap();
        b.set_cpt("Wet", &[0.9, 0.1, 0.1, 0.9]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn format_display_matches_value_names() {
        for format in OutputFormat::value_variants() {
            let parsed = OutputFormat::from_str(&format.to_string(), true).unwrap();
            assert_eq!(parsed, *format);
        }
    }

    #[test]
    fn posterior_text_lists_every_state() {
        let net = rain();
        let engine = VariableElimination::new(&net);
        let post = engine
            .infer("Rain", &Evidence::new().with("Wet", "yes"))
            .unwrap();
        let text = post.to_text();
        assert!(text.starts_with("P(Rain | {Wet=yes})"));
        assert!(text.contains("no"));
        assert!(text.contains("yes"));
        assert!(post.to_summary().contains("yes="));
    }

    #[test]
    fn envelope_carries_result() {
        let payload = serde_json::json!({"answer": 1});
        let env: Envelope<'_, _, ()> = Envelope::new("run-abc", "infer", None, &payload);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["run_id"], "run-abc");
        assert_eq!(json["result"]["answer"], 1);
        assert!(json.get("config").is_none());
    }
}
