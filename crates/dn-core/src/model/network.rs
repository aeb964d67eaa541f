//! Immutable, validated network.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::factor::{Factor, VarId};
use crate::model::variable::{Variable, VariableKind};
use crate::model::ModelError;

/// A validated decision network.
///
/// Produced only by [`NetworkBuilder::build`](crate::model::NetworkBuilder::build);
/// there is no way to mutate it afterwards, so it can be shared freely across
/// threads.
#[derive(Debug, Clone)]
pub struct Network {
    name: Option<String>,
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
    tables: Vec<Option<Factor>>,
    children: Vec<Vec<VarId>>,
    order: Vec<VarId>,
    position: Vec<usize>,
}

impl Network {
    pub(crate) fn from_parts(
        name: Option<String>,
        variables: Vec<Variable>,
        index: HashMap<String, VarId>,
        tables: Vec<Option<Factor>>,
        order: Vec<VarId>,
    ) -> Self {
        let mut children = vec![Vec::new(); variables.len()];
        for var in &variables {
            for p in &var.parents {
                children[p.index()].push(var.id);
            }
        }
        let mut position = vec![0; variables.len()];
        for (pos, id) in order.iter().enumerate() {
            position[id.index()] = pos;
        }
        Self {
            name,
            variables,
            index,
            tables,
            children,
            order,
            position,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All variables in insertion ([`VarId`]) order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// Look a variable up by name.
    pub fn lookup(&self, name: &str) -> Result<&Variable, ModelError> {
        self.id_of(name).map(|id| self.variable(id))
    }

    pub fn id_of(&self, name: &str) -> Result<VarId, ModelError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Index of `state` in the domain of `variable`.
    pub fn state_index(&self, variable: &str, state: &str) -> Result<usize, ModelError> {
        let var = self.lookup(variable)?;
        var.state_index(state)
            .ok_or_else(|| ModelError::UnknownState {
                variable: variable.to_string(),
                state: state.to_string(),
            })
    }

    /// CPT of a chance variable; `None` for decisions and utilities.
    pub fn cpt(&self, id: VarId) -> Option<&Factor> {
        match self.variable(id).kind {
            VariableKind::Chance => self.tables[id.index()].as_ref(),
            _ => None,
        }
    }

    /// Payoff table of a utility variable; `None` otherwise.
    pub fn utility(&self, id: VarId) -> Option<&Factor> {
        match self.variable(id).kind {
            VariableKind::Utility => self.tables[id.index()].as_ref(),
            _ => None,
        }
    }

    pub fn parents(&self, id: VarId) -> &[VarId] {
        &self.variables[id.index()].parents
    }

    pub fn children(&self, id: VarId) -> &[VarId] {
        &self.children[id.index()]
    }

    /// Every `(parent, child)` edge, grouped by child in insertion order.
    pub fn edges(&self) -> Vec<(VarId, VarId)> {
        self.variables
            .iter()
            .flat_map(|v| v.parents.iter().map(move |p| (*p, v.id)))
            .collect()
    }

    /// Deterministic topological order (parents first, ties by insertion).
    pub fn topological_order(&self) -> &[VarId] {
        &self.order
    }

    /// Position of `id` in [`Self::topological_order`].
    pub fn topological_position(&self, id: VarId) -> usize {
        self.position[id.index()]
    }

    /// The given variables together with all of their ancestors.
    pub fn ancestors(&self, of: impl IntoIterator<Item = VarId>) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<VarId> = of.into_iter().collect();
        while let Some(v) = stack.pop() {
            if out.insert(v) {
                stack.extend(self.parents(v).iter().copied());
            }
        }
        out
    }

    /// Whether there is a directed path from `from` to `to`.
    pub fn has_path(&self, from: VarId, to: VarId) -> bool {
        from != to && self.ancestors([to]).contains(&from)
    }

    pub fn ids_of_kind(&self, kind: VariableKind) -> Vec<VarId> {
        self.variables
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.id)
            .collect()
    }

    pub fn summary(&self) -> NetworkSummary {
        let nodes = self
            .order
            .iter()
            .map(|id| {
                let v = self.variable(*id);
                NodeSummary {
                    name: v.name.clone(),
                    kind: v.kind,
                    states: if v.kind == VariableKind::Utility {
                        Vec::new()
                    } else {
                        v.states.clone()
                    },
                    parents: v.parents.iter().map(|p| self.name_of(*p)).collect(),
                    children: self.children(*id).iter().map(|c| self.name_of(*c)).collect(),
                }
            })
            .collect();
        let edges = self
            .edges()
            .into_iter()
            .map(|(p, c)| (self.name_of(p), self.name_of(c)))
            .collect();
        NetworkSummary {
            name: self.name.clone(),
            nodes,
            edges,
            chance: self.ids_of_kind(VariableKind::Chance).len(),
            decisions: self.ids_of_kind(VariableKind::Decision).len(),
            utilities: self.ids_of_kind(VariableKind::Utility).len(),
        }
    }

    pub(crate) fn name_of(&self, id: VarId) -> String {
        self.variables[id.index()].name.clone()
    }
}

/// Serializable view of a network's structure.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub name: Option<String>,
    /// Nodes in topological order.
    pub nodes: Vec<NodeSummary>,
    pub edges: Vec<(String, String)>,
    pub chance: usize,
    pub decisions: usize,
    pub utilities: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub kind: VariableKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network: {} ({} chance, {} decision, {} utility)",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.chance,
            self.decisions,
            self.utilities
        )?;
        writeln!(f, "Nodes:")?;
        for node in &self.nodes {
            write!(f, "  {} [{}]", node.name, node.kind)?;
            if !node.states.is_empty() {
                write!(f, " {{{}}}", node.states.join(", "))?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Edges:")?;
        for (p, c) in &self.edges {
            writeln!(f, "  {p} -> {c}")?;
        }
        Ok(())
    }
}

/// Kahn's algorithm, always releasing the smallest ready [`VarId`] first.
pub(crate) fn topological_sort(variables: &[Variable]) -> Result<Vec<VarId>, ModelError> {
    let mut indegree: Vec<usize> = variables.iter().map(|v| v.parents.len()).collect();
    let mut children = vec![Vec::new(); variables.len()];
    for v in variables {
        for p in &v.parents {
            children[p.index()].push(v.id);
        }
    }
    let mut ready: BTreeSet<VarId> = variables
        .iter()
        .filter(|v| v.parents.is_empty())
        .map(|v| v.id)
        .collect();
    let mut order = Vec::with_capacity(variables.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for child in &children[next.index()] {
            indegree[child.index()] -= 1;
            if indegree[child.index()] == 0 {
                ready.insert(*child);
            }
        }
    }
    if order.len() != variables.len() {
        // Unreachable through the builder, which rejects cycles per edge.
        let stuck = variables
            .iter()
            .find(|v| indegree[v.id.index()] > 0)
            .map(|v| (v.parents[0], v.name.clone()));
        if let Some((parent, child)) = stuck {
            return Err(ModelError::CyclicGraph {
                parent: variables[parent.index()].name.clone(),
                child,
            });
        }
    }
    Ok(order)
}
