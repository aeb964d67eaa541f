//! Elimination ordering heuristics.
//!
//! The cost of variable elimination is exponential in the largest factor
//! scope created along the way, and that scope is determined entirely by the
//! order in which variables are summed out. Orders are computed up front by
//! simulating elimination on factor *scopes* only (no tables), asking an
//! [`EliminationHeuristic`] for the next variable at every step.

use std::collections::BTreeSet;
use std::fmt;

use dn_config::OrderingName;

use crate::factor::VarId;
use crate::inference::InferenceError;
use crate::model::Network;

/// Strategy choosing the next variable to sum out.
pub trait EliminationHeuristic: Send + Sync {
    /// Stable name, used as part of order-cache keys.
    fn name(&self) -> &'static str;

    /// Pick one of `candidates` given the current factor scopes.
    ///
    /// Returns `None` only when `candidates` is empty. Implementations must
    /// be deterministic.
    fn next_variable(
        &self,
        candidates: &BTreeSet<VarId>,
        scopes: &[BTreeSet<VarId>],
        network: &Network,
    ) -> Option<VarId>;
}

/// Greedy min-size: smallest product table, ties by topological position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinSize;

/// Greedy min-fill: fewest new interaction edges, ties by product size then
/// topological position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinFill;

/// Deterministic fallback: latest variable in topological order first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseTopological;

impl EliminationHeuristic for MinSize {
    fn name(&self) -> &'static str {
        "min_size"
    }

    fn next_variable(
        &self,
        candidates: &BTreeSet<VarId>,
        scopes: &[BTreeSet<VarId>],
        network: &Network,
    ) -> Option<VarId> {
        pick_min(candidates, network, |v| product_size(v, scopes, network))
    }
}

impl EliminationHeuristic for MinFill {
    fn name(&self) -> &'static str {
        "min_fill"
    }

    fn next_variable(
        &self,
        candidates: &BTreeSet<VarId>,
        scopes: &[BTreeSet<VarId>],
        network: &Network,
    ) -> Option<VarId> {
        pick_min(candidates, network, |v| {
            (fill_in(v, scopes), product_size(v, scopes, network))
        })
    }
}

impl EliminationHeuristic for ReverseTopological {
    fn name(&self) -> &'static str {
        "reverse_topological"
    }

    fn next_variable(
        &self,
        candidates: &BTreeSet<VarId>,
        _scopes: &[BTreeSet<VarId>],
        network: &Network,
    ) -> Option<VarId> {
        pick_min(candidates, network, |v| {
            std::cmp::Reverse(network.topological_position(v))
        })
    }
}

/// How the engine orders eliminations for a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum EliminationOrdering {
    #[default]
    MinSize,
    MinFill,
    ReverseTopological,
    /// Explicit order by variable name. Must name every variable that the
    /// query eliminates; names of variables pruned away are skipped.
    Custom(Vec<String>),
}

static MIN_SIZE: MinSize = MinSize;
static MIN_FILL: MinFill = MinFill;
static REVERSE_TOPOLOGICAL: ReverseTopological = ReverseTopological;

impl EliminationOrdering {
    /// The heuristic behind this ordering; `None` for explicit orders.
    pub fn heuristic(&self) -> Option<&'static dyn EliminationHeuristic> {
        match self {
            EliminationOrdering::MinSize => Some(&MIN_SIZE),
            EliminationOrdering::MinFill => Some(&MIN_FILL),
            EliminationOrdering::ReverseTopological => Some(&REVERSE_TOPOLOGICAL),
            EliminationOrdering::Custom(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.heuristic() {
            Some(h) => h.name(),
            None => "custom",
        }
    }
}

impl From<OrderingName> for EliminationOrdering {
    fn from(name: OrderingName) -> Self {
        match name {
            OrderingName::MinSize => EliminationOrdering::MinSize,
            OrderingName::MinFill => EliminationOrdering::MinFill,
            OrderingName::ReverseTopological => EliminationOrdering::ReverseTopological,
        }
    }
}

impl fmt::Display for EliminationOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EliminationOrdering::Custom(order) => write!(f, "custom[{}]", order.join(",")),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Simulate elimination of `candidates` over `scopes` and return the order.
pub fn plan_order(
    heuristic: &dyn EliminationHeuristic,
    candidates: &BTreeSet<VarId>,
    mut scopes: Vec<BTreeSet<VarId>>,
    network: &Network,
) -> Vec<VarId> {
    let mut remaining = candidates.clone();
    let mut order = Vec::with_capacity(remaining.len());
    while let Some(next) = heuristic.next_variable(&remaining, &scopes, network) {
        let (touching, rest): (Vec<_>, Vec<_>) =
            scopes.into_iter().partition(|s| s.contains(&next));
        let mut merged: BTreeSet<VarId> = touching.into_iter().flatten().collect();
        merged.remove(&next);
        scopes = rest;
        scopes.push(merged);
        remaining.remove(&next);
        order.push(next);
    }
    order
}

/// Check an explicit order against the set of variables to eliminate.
pub fn resolve_custom_order(
    names: &[String],
    to_eliminate: &BTreeSet<VarId>,
    network: &Network,
) -> Result<Vec<VarId>, InferenceError> {
    let mut seen = BTreeSet::new();
    let mut order = Vec::with_capacity(to_eliminate.len());
    for name in names {
        let id = network
            .id_of(name)
            .map_err(|_| InferenceError::UnknownVariable { name: name.clone() })?;
        if !seen.insert(id) {
            return Err(InferenceError::InvalidEliminationOrder {
                message: format!("{name} appears twice"),
            });
        }
        if to_eliminate.contains(&id) {
            order.push(id);
        } else if !network.variable(id).is_chance() {
            return Err(InferenceError::InvalidEliminationOrder {
                message: format!("{name} is not a chance variable"),
            });
        }
    }
    if let Some(missing) = to_eliminate.iter().find(|v| !seen.contains(*v)) {
        return Err(InferenceError::InvalidEliminationOrder {
            message: format!("{} is never eliminated", network.variable(*missing).name()),
        });
    }
    Ok(order)
}

fn pick_min<K: Ord>(
    candidates: &BTreeSet<VarId>,
    network: &Network,
    cost: impl Fn(VarId) -> K,
) -> Option<VarId> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&v| (cost(v), network.topological_position(v)))
}

fn neighbourhood(v: VarId, scopes: &[BTreeSet<VarId>]) -> BTreeSet<VarId> {
    scopes
        .iter()
        .filter(|s| s.contains(&v))
        .flatten()
        .copied()
        .collect()
}

/// Table size of the product of every factor mentioning `v` (saturating).
fn product_size(v: VarId, scopes: &[BTreeSet<VarId>], network: &Network) -> usize {
    neighbourhood(v, scopes)
        .iter()
        .fold(1usize, |acc, u| acc.saturating_mul(network.variable(*u).cardinality()))
}

/// Pairs of `v`'s neighbours that do not yet share a factor.
fn fill_in(v: VarId, scopes: &[BTreeSet<VarId>]) -> usize {
    let neighbours: Vec<VarId> = neighbourhood(v, scopes)
        .into_iter()
        .filter(|u| *u != v)
        .collect();
    let mut fill = 0;
    for (i, a) in neighbours.iter().enumerate() {
        for b in &neighbours[i + 1..] {
            if !scopes.iter().any(|s| s.contains(a) && s.contains(b)) {
                fill += 1;
            }
        }
    }
    fill
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkBuilder;

    const TF: &[&str] = &["f", "t"];
    const NONE: &[&str] = &[];

    /// Hub H with leaves L1..Ln, all binary.
    fn star(leaves: usize) -> Network {
        let mut b = NetworkBuilder::new();
        b.add_variable("H", TF, NONE).unwrap();
        b.set_cpt("H", &[0.5, 0.5]).unwrap();
        for i in 1..=leaves {
            let name = format!("L{i}");
            b.add_variable(&name, TF, &["H"]).unwrap();
            b.set_cpt(&name, &[0.9, 0.1, 0.2, 0.8]).unwrap();
        }
        b.build().unwrap()
    }

    fn cpt_scopes(net: &Network) -> Vec<BTreeSet<VarId>> {
        net.variables()
            .iter()
            .filter_map(|v| net.cpt(v.id()))
            .map(|f| f.scope().iter().copied().collect())
            .collect()
    }

    #[test]
    fn min_size_eliminates_leaves_before_hub() {
        let net = star(5);
        let query = net.id_of("L1").unwrap();
        let candidates: BTreeSet<VarId> = net
            .variables()
            .iter()
            .map(|v| v.id())
            .filter(|v| *v != query)
            .collect();
        let order = plan_order(&MinSize, &candidates, cpt_scopes(&net), &net);
        assert_eq!(order.last(), Some(&net.id_of("H").unwrap()));
    }

    #[test]
    fn min_fill_never_picks_hub_first() {
        let net = star(4);
        let candidates: BTreeSet<VarId> = net.variables().iter().map(|v| v.id()).collect();
        let first = MinFill.next_variable(&candidates, &cpt_scopes(&net), &net);
        assert_ne!(first, Some(net.id_of("H").unwrap()));
    }

    #[test]
    fn reverse_topological_starts_from_the_last_node() {
        let net = star(3);
        let candidates: BTreeSet<VarId> = net.variables().iter().map(|v| v.id()).collect();
        let order = plan_order(&ReverseTopological, &candidates, cpt_scopes(&net), &net);
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], net.id_of("L3").unwrap());
        assert_eq!(order[3], net.id_of("H").unwrap());
    }

    #[test]
    fn custom_order_must_cover_elimination_set() {
        let net = star(2);
        let to_eliminate: BTreeSet<VarId> =
            [net.id_of("H").unwrap(), net.id_of("L2").unwrap()].into();
        let ok = resolve_custom_order(&["L2".into(), "H".into()], &to_eliminate, &net).unwrap();
        assert_eq!(ok.len(), 2);
        assert!(matches!(
            resolve_custom_order(&["H".into()], &to_eliminate, &net),
            Err(InferenceError::InvalidEliminationOrder { .. })
        ));
        assert!(matches!(
            resolve_custom_order(&["H".into(), "H".into(), "L2".into()], &to_eliminate, &net),
            Err(InferenceError::InvalidEliminationOrder { .. })
        ));
    }

    #[test]
    fn ordering_names_round_trip() {
        for name in OrderingName::ALL {
            let ordering = EliminationOrdering::from(*name);
            assert_eq!(ordering.name(), name.as_str());
        }
        assert_eq!(EliminationOrdering::Custom(vec![]).name(), "custom");
    }
}
