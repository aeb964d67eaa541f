//! Break-even probability between two actions.
//!
//! When a utility depends on a single binary outcome (all its other parents
//! fixed by evidence or the decision itself), the expected utility of each
//! action is linear in p = P(outcome = state):
//!
//! ```text
//! EU_a(p) = p * U(a, s) + (1 - p) * U(a, ¬s)
//! ```
//!
//! Two such lines cross at most once. For the fraud costs (Allow: 0 / -1000,
//! Block: -10 / -10) they cross at p = 0.01.

use serde::Serialize;

use crate::factor::Assignment;
use crate::inference::{Evidence, InferenceError};
use crate::model::VariableKind;

use super::evaluator::DecisionEvaluator;
use super::DecisionError;

/// Slopes closer than this are treated as parallel.
const PARALLEL_EPS: f64 = 1e-12;

/// Posterior probability at which two actions are indifferent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakEven {
    pub outcome: String,
    pub outcome_state: String,
    pub probability: f64,
    /// Action preferred when P(outcome = state) is below `probability`.
    pub below: String,
    /// Action preferred above it.
    pub above: String,
}

impl DecisionEvaluator<'_, '_> {
    /// Solve for the probability of `outcome = outcome_state` at which
    /// `action_a` and `action_b` have equal expected utility.
    ///
    /// Returns `Ok(None)` when the two actions never cross inside `[0, 1]`
    /// (one dominates, or their utility lines are parallel).
    #[allow(clippy::too_many_arguments)]
    pub fn break_even_probability(
        &self,
        decision: &str,
        utility: &str,
        action_a: &str,
        action_b: &str,
        outcome: &str,
        outcome_state: &str,
        evidence: &Evidence,
    ) -> Result<Option<BreakEven>, DecisionError> {
        let net = self.network();
        let (decision_id, utility_id) = self.resolve_pair(decision, utility)?;
        let outcome_var = net.lookup(outcome)?;
        if outcome_var.kind() != VariableKind::Chance {
            return Err(DecisionError::BreakEvenUnsupported {
                reason: format!("{outcome} is not a chance variable"),
            });
        }
        if outcome_var.cardinality() != 2 {
            return Err(DecisionError::BreakEvenUnsupported {
                reason: format!(
                    "{outcome} has {} states; break-even needs a binary outcome",
                    outcome_var.cardinality()
                ),
            });
        }
        if !net.parents(utility_id).contains(&outcome_var.id()) {
            return Err(DecisionError::BreakEvenUnsupported {
                reason: format!("{utility} does not depend on {outcome}"),
            });
        }
        let target = net.state_index(outcome, outcome_state)?;
        let other = 1 - target;

        let decision_var = net.variable(decision_id);
        let action_index = |action: &str| {
            decision_var
                .state_index(action)
                .ok_or_else(|| DecisionError::UnknownAction {
                    decision: decision.to_string(),
                    action: action.to_string(),
                })
        };
        let a = action_index(action_a)?;
        let b = action_index(action_b)?;

        let base = evidence.resolve(net)?;
        let table = self.utility_table(utility_id)?;
        let value = |action: usize, state: usize| -> Result<f64, DecisionError> {
            let mut assignment: Assignment = base.clone();
            assignment.insert(decision_id, action);
            assignment.insert(outcome_var.id(), state);
            let reduced = table.reduce(&assignment).map_err(InferenceError::from)?;
            reduced
                .scalar_value()
                .ok_or_else(|| DecisionError::BreakEvenUnsupported {
                    reason: format!(
                        "{utility} has parents besides {decision} and {outcome} that are not observed"
                    ),
                })
        };

        let (ua_s, ua_n) = (value(a, target)?, value(a, other)?);
        let (ub_s, ub_n) = (value(b, target)?, value(b, other)?);

        // D(p) = EU_a(p) - EU_b(p) = d0 + p * slope
        let d0 = ua_n - ub_n;
        let slope = (ua_s - ua_n) - (ub_s - ub_n);
        if slope.abs() < PARALLEL_EPS {
            return Ok(None);
        }
        let p = -d0 / slope;
        if !(0.0..=1.0).contains(&p) {
            return Ok(None);
        }
        let (below, above) = if d0 > 0.0 || (d0 == 0.0 && slope < 0.0) {
            (action_a, action_b)
        } else {
            (action_b, action_a)
        };
        Ok(Some(BreakEven {
            outcome: outcome.to_string(),
            outcome_state: outcome_state.to_string(),
            probability: p,
            below: below.to_string(),
            above: above.to_string(),
        }))
    }
}
