//! Maximum-expected-utility action selection.

use serde::Serialize;

use crate::factor::{Factor, VarId};
use crate::inference::{Evidence, InferenceError, VariableElimination};
use crate::logging::event_names;
use crate::model::{ModelError, Network, VariableKind};

use super::DecisionError;

/// Expected utility of one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionUtility {
    pub action: String,
    pub expected_utility: f64,
}

/// Outcome of [`DecisionEvaluator::choose_action`].
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub decision: String,
    pub utility: String,
    pub chosen_action: String,
    pub expected_utility: f64,
    /// Every action in domain order.
    pub action_utilities: Vec<ActionUtility>,
    /// Another action came within the tie tolerance of the chosen one; the
    /// earliest in domain order won.
    pub tie_break: bool,
    /// Whether the decision has a directed path to the utility.
    pub influences_utility: bool,
    /// Unobserved chance parents of the utility the posterior was taken over.
    pub outcome_variables: Vec<String>,
    pub evidence: Evidence,
}

impl DecisionResult {
    pub fn utility_of(&self, action: &str) -> Option<f64> {
        self.action_utilities
            .iter()
            .find(|a| a.action == action)
            .map(|a| a.expected_utility)
    }
}

/// Decision evaluator running on top of an elimination engine.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEvaluator<'e, 'n> {
    engine: &'e VariableElimination<'n>,
}

impl<'e, 'n> DecisionEvaluator<'e, 'n> {
    pub fn new(engine: &'e VariableElimination<'n>) -> Self {
        Self { engine }
    }

    pub fn network(&self) -> &'n Network {
        self.engine.network()
    }

    /// Pick the action of `decision` maximizing the expected value of
    /// `utility` under `evidence`.
    ///
    /// Each action is fixed as extra evidence, the joint posterior over the
    /// utility's unobserved chance parents is computed, and the utility table
    /// is averaged against it. Ties within the configured tolerance go to the
    /// first action in domain order.
    pub fn choose_action(
        &self,
        decision: &str,
        utility: &str,
        evidence: &Evidence,
    ) -> Result<DecisionResult, DecisionError> {
        let net = self.network();
        let (decision_id, utility_id) = self.resolve_pair(decision, utility)?;
        if evidence.contains(decision) {
            return Err(DecisionError::DecisionObserved {
                decision: decision.to_string(),
            });
        }

        let influences_utility = net.has_path(decision_id, utility_id);
        if !influences_utility {
            if self.engine.config().require_influence {
                return Err(DecisionError::NoUtilityDependency {
                    decision: decision.to_string(),
                    utility: utility.to_string(),
                });
            }
            tracing::warn!(
                target: "dn_core::decide",
                event = event_names::DECIDE_NO_INFLUENCE,
                decision,
                utility,
                "decision cannot influence utility; all actions tie"
            );
        }

        let mut action_utilities = Vec::with_capacity(net.variable(decision_id).cardinality());
        let mut outcome_variables = Vec::new();
        for action in net.variable(decision_id).states() {
            let extended = evidence.clone().with(decision, action);
            let (eu, outcomes) = self.expected_utility_given(utility_id, &extended)?;
            tracing::debug!(
                target: "dn_core::decide",
                event = event_names::DECIDE_ACTION_EVALUATED,
                decision,
                action = action.as_str(),
                expected_utility = eu,
                "evaluated action"
            );
            outcome_variables = outcomes;
            action_utilities.push(ActionUtility {
                action: action.clone(),
                expected_utility: eu,
            });
        }

        let (best, tie_break) =
            select_best_action(&action_utilities, self.engine.config().tie_tolerance);
        let chosen = &action_utilities[best];
        if tie_break {
            tracing::warn!(
                target: "dn_core::decide",
                event = event_names::DECIDE_TIE_BREAK,
                decision,
                chosen = chosen.action.as_str(),
                "expected utilities tied; earliest action chosen"
            );
        }
        tracing::info!(
            target: "dn_core::decide",
            event = event_names::DECIDE_COMPLETE,
            decision,
            utility,
            evidence = %evidence,
            chosen = chosen.action.as_str(),
            expected_utility = chosen.expected_utility,
            "decision complete"
        );

        Ok(DecisionResult {
            decision: decision.to_string(),
            utility: utility.to_string(),
            chosen_action: chosen.action.clone(),
            expected_utility: chosen.expected_utility,
            tie_break,
            influences_utility,
            outcome_variables,
            evidence: evidence.clone(),
            action_utilities,
        })
    }

    /// Expected utility of `utility` with every decision parent already fixed
    /// in `evidence`.
    pub fn expected_utility(
        &self,
        utility: &str,
        evidence: &Evidence,
    ) -> Result<f64, DecisionError> {
        let utility_id = self.expect_kind(utility, VariableKind::Utility)?;
        self.expected_utility_given(utility_id, evidence)
            .map(|(eu, _)| eu)
    }

    fn expected_utility_given(
        &self,
        utility_id: VarId,
        evidence: &Evidence,
    ) -> Result<(f64, Vec<String>), DecisionError> {
        let net = self.network();
        let assignment = evidence.resolve(net)?;
        let table = self.utility_table(utility_id)?;

        let mut outcomes = Vec::new();
        for &parent in net.parents(utility_id) {
            if assignment.contains_key(&parent) {
                continue;
            }
            let var = net.variable(parent);
            if var.is_decision() {
                return Err(InferenceError::DecisionNotFixed {
                    variable: net.variable(utility_id).name().to_string(),
                    decision: var.name().to_string(),
                }
                .into());
            }
            outcomes.push(var.name().to_string());
        }

        let reduced = table.reduce(&assignment).map_err(InferenceError::from)?;
        if outcomes.is_empty() {
            // No posterior is taken, so impossible evidence must be caught here.
            let total = self.engine.probability_of_evidence(evidence)?;
            if total <= 0.0 {
                return Err(InferenceError::Degenerate {
                    evidence: evidence.to_string(),
                    total,
                }
                .into());
            }
            return Ok((reduced.total(), outcomes));
        }
        let posterior = self.engine.infer_joint(&outcomes, evidence)?;
        let eu = posterior
            .factor()
            .multiply(&reduced)
            .map_err(InferenceError::from)?
            .marginalize_all()
            .total();
        Ok((eu, posterior.variables.clone()))
    }

    pub(crate) fn resolve_pair(
        &self,
        decision: &str,
        utility: &str,
    ) -> Result<(VarId, VarId), DecisionError> {
        Ok((
            self.expect_kind(decision, VariableKind::Decision)?,
            self.expect_kind(utility, VariableKind::Utility)?,
        ))
    }

    pub(crate) fn expect_kind(
        &self,
        name: &str,
        expected: VariableKind,
    ) -> Result<VarId, DecisionError> {
        let var = self.network().lookup(name)?;
        if var.kind() != expected {
            return Err(ModelError::WrongKind {
                variable: name.to_string(),
                expected,
                actual: var.kind(),
            }
            .into());
        }
        Ok(var.id())
    }

    pub(crate) fn utility_table(&self, utility_id: VarId) -> Result<&'n Factor, DecisionError> {
        let net = self.network();
        net.utility(utility_id).ok_or_else(|| {
            ModelError::MissingUtility {
                variable: net.variable(utility_id).name().to_string(),
            }
            .into()
        })
    }
}

/// Index of the best action and whether a tie was broken.
///
/// A later action replaces the incumbent only when it is better by more than
/// `tolerance`, so among near-equal actions the first in domain order wins.
fn select_best_action(utilities: &[ActionUtility], tolerance: f64) -> (usize, bool) {
    let mut best = 0;
    let mut tie_break = false;
    for (i, cand) in utilities.iter().enumerate().skip(1) {
        let incumbent = utilities[best].expected_utility;
        if cand.expected_utility > incumbent + tolerance {
            best = i;
            tie_break = false;
        } else if (cand.expected_utility - incumbent).abs() <= tolerance {
            tie_break = true;
        }
    }
    (best, tie_break)
}
