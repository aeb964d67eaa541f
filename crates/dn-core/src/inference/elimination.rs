//! Exact inference by variable elimination.
//!
//! For a query `Q` and evidence `e`:
//! 1. (optional) keep only `Q`, `e` and their ancestors; every other chance
//!    node is barren and sums to one,
//! 2. reduce every remaining CPT by `e`,
//! 3. sum out the non-query variables in the planned order, multiplying only
//!    the factors that mention the variable being eliminated,
//! 4. multiply what is left (scope exactly `Q`) and normalize.
//!
//! Cost is exponential in the largest intermediate scope, which the ordering
//! controls. [`EliminationStats`] reports it for every query.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::factor::{Assignment, Factor, FactorError, VarId};
use crate::inference::cache::{CacheStats, OrderCache, OrderKey};
use crate::inference::evidence::Evidence;
use crate::inference::ordering::{
    plan_order, resolve_custom_order, EliminationHeuristic, EliminationOrdering, MinFill, MinSize,
    ReverseTopological,
};
use crate::inference::InferenceError;
use crate::logging::event_names;
use crate::model::{Network, VariableKind};

/// What one elimination run cost.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EliminationStats {
    /// Heuristic or `custom`.
    pub ordering: String,
    /// Variables in the order they were summed out.
    pub order: Vec<String>,
    /// Largest scope of any product factor formed.
    pub max_scope_len: usize,
    /// Largest table of any product factor formed.
    pub max_table_size: usize,
    /// Pairwise factor multiplications performed.
    pub multiplications: usize,
    /// Chance variables dropped as barren before elimination.
    pub pruned: usize,
    pub cache_hit: bool,
}

/// Normalized posterior over one or more query variables.
#[derive(Debug, Clone, Serialize)]
pub struct Posterior {
    /// Query variables in table order.
    pub variables: Vec<String>,
    /// State labels for each query variable.
    pub states: Vec<Vec<String>>,
    /// Row-major probabilities, last variable fastest.
    pub probabilities: Vec<f64>,
    pub evidence: Evidence,
    pub stats: EliminationStats,
    #[serde(skip)]
    factor: Factor,
}

impl Posterior {
    /// The underlying normalized factor.
    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    /// Marginal probability of `variable = state`.
    pub fn probability(&self, variable: &str, state: &str) -> Option<f64> {
        let pos = self.variables.iter().position(|v| v == variable)?;
        let idx = self.states[pos].iter().position(|s| s == state)?;
        let mut total = 0.0;
        for (row, p) in self.rows() {
            if row[pos] == idx {
                total += p;
            }
        }
        Some(total)
    }

    /// `(state, probability)` pairs when the posterior is over one variable.
    pub fn distribution(&self) -> Option<Vec<(&str, f64)>> {
        if self.variables.len() != 1 {
            return None;
        }
        Some(
            self.states[0]
                .iter()
                .map(String::as_str)
                .zip(self.probabilities.iter().copied())
                .collect(),
        )
    }

    /// Every joint state index tuple with its probability.
    pub fn rows(&self) -> impl Iterator<Item = (Vec<usize>, f64)> + '_ {
        self.factor
            .assignments()
            .into_iter()
            .zip(self.probabilities.iter().copied())
    }

    /// Joint rows with state labels.
    pub fn labelled_rows(&self) -> Vec<(Vec<&str>, f64)> {
        self.rows()
            .map(|(row, p)| {
                let labels = row
                    .iter()
                    .enumerate()
                    .map(|(i, s)| self.states[i][*s].as_str())
                    .collect();
                (labels, p)
            })
            .collect()
    }
}

/// Variable-elimination engine bound to one network.
///
/// The engine never mutates the network; it is `Send + Sync` and can serve
/// concurrent queries from several threads.
#[derive(Debug)]
pub struct VariableElimination<'n> {
    network: &'n Network,
    config: EngineConfig,
    cache: Arc<OrderCache>,
}

/// Unnormalized result of one elimination pass.
struct Eliminated {
    factor: Factor,
    stats: EliminationStats,
}

impl<'n> VariableElimination<'n> {
    pub fn new(network: &'n Network) -> Self {
        Self::with_config(network, EngineConfig::default())
    }

    pub fn with_config(network: &'n Network, config: EngineConfig) -> Self {
        Self {
            network,
            config,
            cache: Arc::new(OrderCache::new()),
        }
    }

    /// Share an existing cache (it must belong to the same network).
    pub fn with_cache(mut self, cache: Arc<OrderCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn network(&self) -> &'n Network {
        self.network
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Posterior over a single variable.
    pub fn infer(&self, query: &str, evidence: &Evidence) -> Result<Posterior, InferenceError> {
        self.infer_joint(&[query], evidence)
    }

    /// Joint posterior over several variables.
    pub fn infer_joint<S: AsRef<str>>(
        &self,
        query: &[S],
        evidence: &Evidence,
    ) -> Result<Posterior, InferenceError> {
        let assignment = evidence.resolve(self.network)?;
        let query_ids = self.resolve_query(query, &assignment)?;

        let Eliminated { factor, stats } = self.eliminate(&query_ids, &assignment)?;
        let total = factor.total();
        let normalized = factor.normalize().map_err(|err| match err {
            FactorError::Degenerate { .. } => InferenceError::Degenerate {
                evidence: evidence.to_string(),
                total,
            },
            other => InferenceError::Factor(other),
        })?;

        tracing::info!(
            target: "dn_core::infer",
            event = event_names::INFER_COMPLETE,
            query = ?query.iter().map(|q| q.as_ref()).collect::<Vec<_>>(),
            evidence = %evidence,
            ordering = %stats.ordering,
            max_scope_len = stats.max_scope_len,
            max_table_size = stats.max_table_size,
            "inference complete"
        );

        let variables: Vec<String> = normalized
            .scope()
            .iter()
            .map(|v| self.network.variable(*v).name().to_string())
            .collect();
        let states = normalized
            .scope()
            .iter()
            .map(|v| self.network.variable(*v).states().to_vec())
            .collect();
        Ok(Posterior {
            variables,
            states,
            probabilities: normalized.values().to_vec(),
            evidence: evidence.clone(),
            stats,
            factor: normalized,
        })
    }

    /// Probability of the evidence, P(e). The empty evidence has probability 1.
    pub fn probability_of_evidence(&self, evidence: &Evidence) -> Result<f64, InferenceError> {
        let assignment = evidence.resolve(self.network)?;
        let Eliminated { factor, .. } = self.eliminate(&[], &assignment)?;
        Ok(factor.total())
    }

    fn resolve_query<S: AsRef<str>>(
        &self,
        query: &[S],
        assignment: &Assignment,
    ) -> Result<Vec<VarId>, InferenceError> {
        if query.is_empty() {
            return Err(InferenceError::EmptyQuery);
        }
        let mut ids = Vec::with_capacity(query.len());
        for name in query {
            let name = name.as_ref();
            let var = self
                .network
                .lookup(name)
                .map_err(|_| InferenceError::UnknownVariable {
                    name: name.to_string(),
                })?;
            if var.kind() != VariableKind::Chance {
                return Err(InferenceError::InvalidQuery {
                    variable: name.to_string(),
                    reason: format!("{} variables have no distribution", var.kind()),
                });
            }
            if assignment.contains_key(&var.id()) {
                return Err(InferenceError::QueryObserved {
                    variable: name.to_string(),
                });
            }
            if ids.contains(&var.id()) {
                return Err(InferenceError::InvalidQuery {
                    variable: name.to_string(),
                    reason: "listed twice".to_string(),
                });
            }
            ids.push(var.id());
        }
        Ok(ids)
    }

    fn eliminate(
        &self,
        query: &[VarId],
        assignment: &Assignment,
    ) -> Result<Eliminated, InferenceError> {
        let net = self.network;
        let chance = net.ids_of_kind(VariableKind::Chance);
        let relevant: BTreeSet<VarId> = if self.config.prune_barren {
            let ancestors = net.ancestors(query.iter().chain(assignment.keys()).copied());
            chance.iter().copied().filter(|v| ancestors.contains(v)).collect()
        } else {
            chance.iter().copied().collect()
        };
        let pruned = chance.len() - relevant.len();

        let mut factors = Vec::with_capacity(relevant.len());
        for &v in &relevant {
            for &parent in net.parents(v) {
                if net.variable(parent).is_decision() && !assignment.contains_key(&parent) {
                    return Err(InferenceError::DecisionNotFixed {
                        variable: net.variable(v).name().to_string(),
                        decision: net.variable(parent).name().to_string(),
                    });
                }
            }
            if let Some(cpt) = net.cpt(v) {
                factors.push(cpt.reduce(assignment)?);
            }
        }

        let to_eliminate: BTreeSet<VarId> = relevant
            .iter()
            .copied()
            .filter(|v| !query.contains(v) && !assignment.contains_key(v))
            .collect();

        let (order, cache_hit) = self.order_for(query, assignment, &to_eliminate, &factors)?;

        let mut stats = EliminationStats {
            ordering: self.config.ordering.name().to_string(),
            order: order
                .iter()
                .map(|v| net.variable(*v).name().to_string())
                .collect(),
            pruned,
            cache_hit,
            ..EliminationStats::default()
        };

        for &var in order.iter() {
            let (touching, rest): (Vec<Factor>, Vec<Factor>) =
                factors.into_iter().partition(|f| f.contains(var));
            factors = rest;
            let product = multiply_all(touching, &mut stats)?;
            tracing::debug!(
                target: "dn_core::infer",
                event = event_names::ELIMINATION_STEP,
                variable = net.variable(var).name(),
                scope_len = product.scope().len(),
                table_size = product.len(),
                remaining = factors.len(),
                "eliminated variable"
            );
            factors.push(product.marginalize(var)?);
        }

        let factor = multiply_all(factors, &mut stats)?;
        Ok(Eliminated { factor, stats })
    }

    fn order_for(
        &self,
        query: &[VarId],
        assignment: &Assignment,
        to_eliminate: &BTreeSet<VarId>,
        factors: &[Factor],
    ) -> Result<(Arc<Vec<VarId>>, bool), InferenceError> {
        let heuristic: &dyn EliminationHeuristic = match &self.config.ordering {
            EliminationOrdering::Custom(names) => {
                let order = resolve_custom_order(names, to_eliminate, self.network)?;
                return Ok((Arc::new(order), false));
            }
            EliminationOrdering::MinSize => &MinSize,
            EliminationOrdering::MinFill => &MinFill,
            EliminationOrdering::ReverseTopological => &ReverseTopological,
        };
        let plan = || {
            let scopes = factors
                .iter()
                .map(|f| f.scope().iter().copied().collect())
                .collect();
            plan_order(heuristic, to_eliminate, scopes, self.network)
        };
        if !self.config.cache_orders {
            return Ok((Arc::new(plan()), false));
        }
        let key = OrderKey::new(
            heuristic.name(),
            query.iter().copied(),
            assignment.keys().copied(),
            self.config.prune_barren,
        );
        Ok(self.cache.get_or_insert_with(key, plan))
    }
}

/// Fold a factor list with `multiply`; the empty product is the scalar 1.
fn multiply_all(
    factors: Vec<Factor>,
    stats: &mut EliminationStats,
) -> Result<Factor, InferenceError> {
    let mut iter = factors.into_iter();
    let Some(mut product) = iter.next() else {
        return Ok(Factor::scalar(1.0));
    };
    for f in iter {
        product = product.multiply(&f)?;
        stats.multiplications += 1;
        stats.max_scope_len = stats.max_scope_len.max(product.scope().len());
        stats.max_table_size = stats.max_table_size.max(product.len());
    }
    stats.max_scope_len = stats.max_scope_len.max(product.scope().len());
    stats.max_table_size = stats.max_table_size.max(product.len());
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkBuilder;
    use dn_math::approx_eq;

    const TF: &[&str] = &["False", "True"];
    const NONE: &[&str] = &[];

    fn sprinkler() -> Network {
        let mut b = NetworkBuilder::new();
        b.add_variable("Rain", TF, NONE).unwrap();
        b.add_variable("Sprinkler", TF, &["Rain"]).unwrap();
        b.add_variable("Wet", TF, &["Rain", "Sprinkler"]).unwrap();
        b.set_cpt("Rain", &[0.8, 0.2]).unwrap();
        b.set_cpt("Sprinkler", &[0.6, 0.4, 0.99, 0.01]).unwrap();
        b.set_cpt("Wet", &[1.0, 0.0, 0.2, 0.8, 0.1, 0.9, 0.01, 0.99])
            .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn prior_matches_cpt_for_root() {
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        let post = engine.infer("Rain", &Evidence::new()).unwrap();
        assert!(approx_eq(post.probability("Rain", "True").unwrap(), 0.2, 1e-12));
        assert_eq!(post.stats.pruned, 2);
    }

    #[test]
    fn posterior_by_hand() {
        // P(Wet=T) = sum_r sum_s P(r) P(s|r) P(W=T|r,s)
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        let wet = engine.infer("Wet", &Evidence::new()).unwrap();
        let expected = 0.8 * (0.6 * 0.0 + 0.4 * 0.8) + 0.2 * (0.99 * 0.9 + 0.01 * 0.99);
        assert!(approx_eq(wet.probability("Wet", "True").unwrap(), expected, 1e-12));

        let rain = engine
            .infer("Rain", &Evidence::new().with("Wet", "True"))
            .unwrap();
        let joint_rain = 0.2 * (0.99 * 0.9 + 0.01 * 0.99);
        assert!(approx_eq(
            rain.probability("Rain", "True").unwrap(),
            joint_rain / expected,
            1e-12
        ));
    }

    #[test]
    fn probability_of_evidence_matches_marginal() {
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        let p_e = engine
            .probability_of_evidence(&Evidence::new().with("Wet", "True"))
            .unwrap();
        let wet = engine.infer("Wet", &Evidence::new()).unwrap();
        assert!(approx_eq(p_e, wet.probability("Wet", "True").unwrap(), 1e-12));
        assert!(approx_eq(
            engine.probability_of_evidence(&Evidence::new()).unwrap(),
            1.0,
            1e-12
        ));
    }

    #[test]
    fn joint_posterior_sums_to_one() {
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        let joint = engine
            .infer_joint(&["Rain", "Sprinkler"], &Evidence::new().with("Wet", "True"))
            .unwrap();
        assert_eq!(joint.probabilities.len(), 4);
        assert!(approx_eq(joint.probabilities.iter().sum::<f64>(), 1.0, 1e-12));
        assert!(joint.distribution().is_none());
    }

    #[test]
    fn query_errors() {
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        assert!(matches!(
            engine.infer("Snow", &Evidence::new()),
            Err(InferenceError::UnknownVariable { .. })
        ));
        assert!(matches!(
            engine.infer("Rain", &Evidence::new().with("Rain", "True")),
            Err(InferenceError::QueryObserved { .. })
        ));
        assert!(matches!(
            engine.infer_joint(&[] as &[&str], &Evidence::new()),
            Err(InferenceError::EmptyQuery)
        ));
    }

    #[test]
    fn impossible_evidence_is_degenerate() {
        let mut b = NetworkBuilder::new();
        b.add_variable("A", TF, NONE).unwrap();
        b.add_variable("B", TF, &["A"]).unwrap();
        b.add_variable("C", TF, NONE).unwrap();
        b.set_cpt("A", &[0.5, 0.5]).unwrap();
        b.set_cpt("B", &[1.0, 0.0, 0.0, 1.0]).unwrap();
        b.set_cpt("C", &[0.3, 0.7]).unwrap();
        let net = b.build().unwrap();
        let engine = VariableElimination::new(&net);
        let ev = Evidence::new().with("A", "True").with("B", "False");
        assert!(matches!(
            engine.infer("C", &ev),
            Err(InferenceError::Degenerate { .. })
        ));
        assert!(approx_eq(engine.probability_of_evidence(&ev).unwrap(), 0.0, 1e-15));
        // The engine stays usable after a failed query.
        assert!(engine.infer("C", &Evidence::new()).is_ok());
    }

    #[test]
    fn cache_is_used_for_repeated_shapes() {
        let net = sprinkler();
        let engine = VariableElimination::new(&net);
        let a = engine
            .infer("Rain", &Evidence::new().with("Wet", "True"))
            .unwrap();
        let b = engine
            .infer("Rain", &Evidence::new().with("Wet", "False"))
            .unwrap();
        assert!(!a.stats.cache_hit);
        assert!(b.stats.cache_hit);
        assert_eq!(engine.cache_stats().hits, 1);
    }
}
