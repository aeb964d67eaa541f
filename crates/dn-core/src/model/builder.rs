//! Incremental, validating network construction.
//!
//! Every call checks its own invariant immediately: names are unique, parents
//! exist, no edge closes a cycle, tables have the right shape, and CPT rows
//! are locally normalized. [`NetworkBuilder::build`] then checks completeness
//! (every chance node has a CPT, every utility node a table) before handing
//! out an immutable [`Network`].

use std::collections::{BTreeSet, HashMap};

use crate::factor::{Factor, VarId};
use crate::model::network::{topological_sort, Network};
use crate::model::variable::{Variable, VariableKind, UTILITY_STATE};
use crate::model::ModelError;
use dn_math::stable_sum;

/// Default tolerance for CPT row sums.
pub const DEFAULT_NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Mutable network under construction.
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    name: Option<String>,
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
    tables: Vec<Option<Factor>>,
    normalization_tolerance: f64,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            variables: Vec::new(),
            index: HashMap::new(),
            tables: Vec::new(),
            normalization_tolerance: DEFAULT_NORMALIZATION_TOLERANCE,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_normalization_tolerance(mut self, tolerance: f64) -> Self {
        self.normalization_tolerance = tolerance;
        self
    }

    /// Add a chance variable. Parents must already exist.
    pub fn add_variable<S: AsRef<str>, P: AsRef<str>>(
        &mut self,
        name: &str,
        states: &[S],
        parents: &[P],
    ) -> Result<VarId, ModelError> {
        self.check_new_name(name)?;
        let states = check_domain(name, states)?;
        let parent_ids = self.resolve_parents(name, VariableKind::Chance, parents)?;
        Ok(self.push(name, VariableKind::Chance, states, parent_ids))
    }

    /// Add a decision variable. Decisions have no parents and no CPT.
    pub fn add_decision<S: AsRef<str>>(
        &mut self,
        name: &str,
        actions: &[S],
    ) -> Result<VarId, ModelError> {
        self.check_new_name(name)?;
        let states = check_domain(name, actions)?;
        Ok(self.push(name, VariableKind::Decision, states, Vec::new()))
    }

    /// Add a utility variable over existing parents.
    pub fn add_utility<P: AsRef<str>>(
        &mut self,
        name: &str,
        parents: &[P],
    ) -> Result<VarId, ModelError> {
        self.check_new_name(name)?;
        let parent_ids = self.resolve_parents(name, VariableKind::Utility, parents)?;
        Ok(self.push(
            name,
            VariableKind::Utility,
            vec![UTILITY_STATE.to_string()],
            parent_ids,
        ))
    }

    /// Add a parent to an existing chance or utility variable.
    ///
    /// Adding an edge changes the table shape, so any table already set on
    /// `child` is discarded and must be set again. Re-adding an existing edge
    /// is a no-op.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<(), ModelError> {
        let child_id = self.lookup(child)?;
        let parent_id = self.lookup(parent)?;
        let child_kind = self.variables[child_id.index()].kind;
        if child_kind == VariableKind::Decision {
            return Err(ModelError::InvalidParent {
                variable: child.to_string(),
                parent: parent.to_string(),
                reason: "decision variables have no parents",
            });
        }
        self.check_parent_kind(child, parent_id)?;
        if self.variables[child_id.index()].parents.contains(&parent_id) {
            return Ok(());
        }
        if parent_id == child_id || self.reaches(child_id, parent_id) {
            return Err(ModelError::CyclicGraph {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.variables[child_id.index()].parents.push(parent_id);
        self.tables[child_id.index()] = None;
        Ok(())
    }

    /// Set the CPT of a chance variable.
    ///
    /// Layout: one row per parent assignment (row-major over the parents in
    /// declaration order), each row a distribution over the variable's states.
    pub fn set_cpt(&mut self, variable: &str, table: &[f64]) -> Result<(), ModelError> {
        let id = self.lookup(variable)?;
        self.expect_kind(id, VariableKind::Chance)?;
        let var = &self.variables[id.index()];
        let card = var.cardinality();
        let parent_cards: Vec<usize> = var
            .parents
            .iter()
            .map(|p| self.variables[p.index()].cardinality())
            .collect();
        let expected = parent_cards.iter().product::<usize>() * card;
        if table.len() != expected {
            return Err(ModelError::Shape {
                variable: variable.to_string(),
                expected,
                actual: table.len(),
            });
        }
        if table.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite {
                variable: variable.to_string(),
            });
        }
        if let Some(&value) = table.iter().find(|v| **v < 0.0) {
            return Err(ModelError::NegativeProbability {
                variable: variable.to_string(),
                value,
            });
        }
        for (row_index, row) in table.chunks(card).enumerate() {
            let sum = stable_sum(row);
            if (sum - 1.0).abs() > self.normalization_tolerance {
                return Err(ModelError::Normalization {
                    variable: variable.to_string(),
                    row: self.describe_row(var, row_index),
                    sum,
                });
            }
        }

        let mut scope: Vec<(VarId, usize)> = var.parents.iter().copied().zip(parent_cards).collect();
        scope.push((id, card));
        let factor = Factor::new(scope, table.to_vec()).map_err(|_| ModelError::Shape {
            variable: variable.to_string(),
            expected,
            actual: table.len(),
        })?;
        self.tables[id.index()] = Some(factor);
        Ok(())
    }

    /// Set the payoff table of a utility variable.
    ///
    /// Layout: row-major over the parents in declaration order. Values are
    /// unconstrained reals.
    pub fn set_utility(&mut self, variable: &str, table: &[f64]) -> Result<(), ModelError> {
        let id = self.lookup(variable)?;
        self.expect_kind(id, VariableKind::Utility)?;
        let scope: Vec<(VarId, usize)> = self.variables[id.index()]
            .parents
            .iter()
            .map(|p| (*p, self.variables[p.index()].cardinality()))
            .collect();
        let expected: usize = scope.iter().map(|(_, c)| *c).product();
        if table.len() != expected {
            return Err(ModelError::Shape {
                variable: variable.to_string(),
                expected,
                actual: table.len(),
            });
        }
        if table.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite {
                variable: variable.to_string(),
            });
        }
        let factor = Factor::new(scope, table.to_vec()).map_err(|_| ModelError::Shape {
            variable: variable.to_string(),
            expected,
            actual: table.len(),
        })?;
        self.tables[id.index()] = Some(factor);
        Ok(())
    }

    /// Deterministic topological order of the variables added so far.
    pub fn topological_order(&self) -> Result<Vec<VarId>, ModelError> {
        topological_sort(&self.variables)
    }

    /// Final validation pass; produces an immutable network.
    pub fn build(self) -> Result<Network, ModelError> {
        for var in &self.variables {
            if self.tables[var.id.index()].is_some() {
                continue;
            }
            match var.kind {
                VariableKind::Chance => {
                    return Err(ModelError::MissingCpt {
                        variable: var.name.clone(),
                    })
                }
                VariableKind::Utility => {
                    return Err(ModelError::MissingUtility {
                        variable: var.name.clone(),
                    })
                }
                VariableKind::Decision => {}
            }
        }
        let order = topological_sort(&self.variables)?;
        tracing::debug!(
            target: "dn_core::model",
            variables = self.variables.len(),
            "network validated"
        );
        Ok(Network::from_parts(
            self.name,
            self.variables,
            self.index,
            self.tables,
            order,
        ))
    }

    fn push(
        &mut self,
        name: &str,
        kind: VariableKind,
        states: Vec<String>,
        parents: Vec<VarId>,
    ) -> VarId {
        let id = VarId::new(self.variables.len());
        self.variables.push(Variable {
            id,
            name: name.to_string(),
            kind,
            states,
            parents,
        });
        self.index.insert(name.to_string(), id);
        self.tables.push(None);
        id
    }

    fn lookup(&self, name: &str) -> Result<VarId, ModelError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                name: name.to_string(),
            })
    }

    fn check_new_name(&self, name: &str) -> Result<(), ModelError> {
        if name.trim().is_empty() {
            return Err(ModelError::InvalidDomain {
                variable: name.to_string(),
                message: "variable name must not be empty".to_string(),
            });
        }
        if self.index.contains_key(name) {
            return Err(ModelError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn resolve_parents<P: AsRef<str>>(
        &self,
        name: &str,
        kind: VariableKind,
        parents: &[P],
    ) -> Result<Vec<VarId>, ModelError> {
        let mut ids = Vec::with_capacity(parents.len());
        for parent in parents {
            let parent = parent.as_ref();
            if parent == name {
                return Err(ModelError::CyclicGraph {
                    parent: parent.to_string(),
                    child: name.to_string(),
                });
            }
            let id = self.lookup(parent)?;
            if kind == VariableKind::Utility || kind == VariableKind::Chance {
                self.check_parent_kind(name, id)?;
            }
            if ids.contains(&id) {
                return Err(ModelError::InvalidParent {
                    variable: name.to_string(),
                    parent: parent.to_string(),
                    reason: "listed twice",
                });
            }
            ids.push(id);
        }
        Ok(ids)
    }

    fn check_parent_kind(&self, child: &str, parent: VarId) -> Result<(), ModelError> {
        let p = &self.variables[parent.index()];
        if p.kind == VariableKind::Utility {
            return Err(ModelError::InvalidParent {
                variable: child.to_string(),
                parent: p.name.clone(),
                reason: "utility variables cannot have children",
            });
        }
        Ok(())
    }

    fn expect_kind(&self, id: VarId, expected: VariableKind) -> Result<(), ModelError> {
        let var = &self.variables[id.index()];
        if var.kind != expected {
            return Err(ModelError::WrongKind {
                variable: var.name.clone(),
                expected,
                actual: var.kind,
            });
        }
        Ok(())
    }

    /// Whether `to` is reachable from `from` along parent → child edges.
    fn reaches(&self, from: VarId, to: VarId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            if !seen.insert(v) {
                continue;
            }
            for child in &self.variables {
                if child.parents.contains(&v) {
                    stack.push(child.id);
                }
            }
        }
        false
    }

    fn describe_row(&self, var: &Variable, row_index: usize) -> String {
        if var.parents.is_empty() {
            return "the unconditional row".to_string();
        }
        let mut rest = row_index;
        let mut parts = Vec::with_capacity(var.parents.len());
        for p in var.parents.iter().rev() {
            let parent = &self.variables[p.index()];
            let card = parent.cardinality();
            parts.push(format!("{}={}", parent.name, parent.states[rest % card]));
            rest /= card;
        }
        parts.reverse();
        parts.join(", ")
    }
}

fn check_domain<S: AsRef<str>>(name: &str, states: &[S]) -> Result<Vec<String>, ModelError> {
    if states.len() < 2 {
        return Err(ModelError::InvalidDomain {
            variable: name.to_string(),
            message: format!("needs at least 2 states, got {}", states.len()),
        });
    }
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(states.len());
    for s in states {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(ModelError::InvalidDomain {
                variable: name.to_string(),
                message: "state labels must not be empty".to_string(),
            });
        }
        if !seen.insert(s) {
            return Err(ModelError::InvalidDomain {
                variable: name.to_string(),
                message: format!("state {s} listed twice"),
            });
        }
        out.push(s.to_string());
    }
    Ok(out)
}
