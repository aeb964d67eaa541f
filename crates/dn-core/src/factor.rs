//! Dense factor tables over discrete variables.
//!
//! A [`Factor`] maps every joint assignment of its scope to a real value. The
//! scope is kept in canonical order (ascending [`VarId`], i.e. the order in
//! which variables were added to the network) and the table is row-major over
//! that order with the last variable varying fastest. Every operation returns a
//! new factor; nothing here mutates its receiver.
//!
//! # Layout
//!
//! ```text
//! scope  = [A(2), B(3)]
//! index  = a * 3 + b
//! values = [φ(a0,b0), φ(a0,b1), φ(a0,b2), φ(a1,b0), φ(a1,b1), φ(a1,b2)]
//! ```

use dn_math::{normalize_in_place, stable_sum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a variable inside one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub const fn new(index: usize) -> Self {
        VarId(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A partial assignment: variable → state index.
pub type Assignment = BTreeMap<VarId, usize>;

/// Errors raised by factor operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FactorError {
    #[error("scope error: {message}")]
    Scope { message: String },

    #[error("table has {actual} entries but scope requires {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("state {state} out of range for variable {var} with {cardinality} states")]
    StateOutOfRange {
        var: VarId,
        state: usize,
        cardinality: usize,
    },

    #[error("factor table contains a non-finite value")]
    NonFinite,

    #[error("degenerate distribution: total mass is {total}")]
    Degenerate { total: f64 },
}

/// Immutable table factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    vars: Vec<VarId>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

impl Factor {
    /// Build a factor from a scope given in any order.
    ///
    /// `values` must be laid out row-major over `scope` exactly as given (last
    /// entry fastest); the result is re-indexed into canonical order.
    pub fn new(scope: Vec<(VarId, usize)>, values: Vec<f64>) -> Result<Self, FactorError> {
        let mut seen = std::collections::HashSet::new();
        for (var, card) in &scope {
            if !seen.insert(*var) {
                return Err(FactorError::Scope {
                    message: format!("variable {var} appears twice"),
                });
            }
            if *card == 0 {
                return Err(FactorError::Scope {
                    message: format!("variable {var} has an empty domain"),
                });
            }
        }
        let expected: usize = scope.iter().map(|(_, c)| *c).product();
        if values.len() != expected {
            return Err(FactorError::Shape {
                expected,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FactorError::NonFinite);
        }

        let given_cards: Vec<usize> = scope.iter().map(|(_, c)| *c).collect();
        let given_strides = strides(&given_cards);

        let mut order: Vec<usize> = (0..scope.len()).collect();
        order.sort_by_key(|&i| scope[i].0);
        if order.iter().enumerate().all(|(i, &o)| i == o) {
            return Ok(Self {
                vars: scope.iter().map(|(v, _)| *v).collect(),
                cards: given_cards,
                values,
            });
        }

        let vars: Vec<VarId> = order.iter().map(|&i| scope[i].0).collect();
        let cards: Vec<usize> = order.iter().map(|&i| scope[i].1).collect();
        let src_strides: Vec<usize> = order.iter().map(|&i| given_strides[i]).collect();
        let mut canonical = Vec::with_capacity(expected);
        for_each_index(&cards, &[src_strides.as_slice()], 0, |_, idx| {
            canonical.push(values[idx[0]])
        });

        Ok(Self {
            vars,
            cards,
            values: canonical,
        })
    }

    /// A factor with empty scope holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            vars: Vec::new(),
            cards: Vec::new(),
            values: vec![value],
        }
    }

    /// Scope in canonical order.
    pub fn scope(&self) -> &[VarId] {
        &self.vars
    }

    /// Cardinalities aligned with [`Factor::scope`].
    pub fn cardinalities(&self) -> &[usize] {
        &self.cards
    }

    /// Table values in canonical layout.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, var: VarId) -> bool {
        self.position(var).is_some()
    }

    pub fn cardinality(&self, var: VarId) -> Option<usize> {
        self.position(var).map(|p| self.cards[p])
    }

    pub fn is_scalar(&self) -> bool {
        self.vars.is_empty()
    }

    /// The single value of an empty-scope factor.
    pub fn scalar_value(&self) -> Option<f64> {
        if self.is_scalar() {
            self.values.first().copied()
        } else {
            None
        }
    }

    /// Value at an assignment covering (at least) the whole scope.
    pub fn value(&self, assignment: &Assignment) -> Option<f64> {
        let mut index = 0;
        for (pos, var) in self.vars.iter().enumerate() {
            let state = *assignment.get(var)?;
            if state >= self.cards[pos] {
                return None;
            }
            index = index * self.cards[pos] + state;
        }
        self.values.get(index).copied()
    }

    /// Sum of all table entries.
    pub fn total(&self) -> f64 {
        stable_sum(&self.values)
    }

    /// Every assignment of the scope, in table order.
    pub fn assignments(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::with_capacity(self.values.len());
        for_each_index(&self.cards, &[], 0, |states, _| out.push(states.to_vec()));
        out
    }

    /// Fix evidence variables and drop them from the scope.
    ///
    /// Evidence variables outside the scope are ignored: evidence is global
    /// while factor scopes are local.
    pub fn reduce(&self, evidence: &Assignment) -> Result<Factor, FactorError> {
        if !self.vars.iter().any(|v| evidence.contains_key(v)) {
            return Ok(self.clone());
        }
        let src_strides = strides(&self.cards);
        let mut base = 0;
        let mut vars = Vec::new();
        let mut cards = Vec::new();
        let mut kept_strides = Vec::new();
        for (pos, var) in self.vars.iter().enumerate() {
            match evidence.get(var) {
                Some(&state) => {
                    if state >= self.cards[pos] {
                        return Err(FactorError::StateOutOfRange {
                            var: *var,
                            state,
                            cardinality: self.cards[pos],
                        });
                    }
                    base += state * src_strides[pos];
                }
                None => {
                    vars.push(*var);
                    cards.push(self.cards[pos]);
                    kept_strides.push(src_strides[pos]);
                }
            }
        }
        let mut values = Vec::with_capacity(cards.iter().product());
        for_each_index(&cards, &[kept_strides.as_slice()], base, |_, idx| {
            values.push(self.values[idx[0]])
        });
        Ok(Factor {
            vars,
            cards,
            values,
        })
    }

    /// Pointwise product over the union of both scopes.
    pub fn multiply(&self, other: &Factor) -> Result<Factor, FactorError> {
        let mut vars = Vec::with_capacity(self.vars.len() + other.vars.len());
        let mut cards = Vec::with_capacity(vars.capacity());
        let (mut i, mut j) = (0, 0);
        while i < self.vars.len() || j < other.vars.len() {
            let take_left = j >= other.vars.len()
                || (i < self.vars.len() && self.vars[i] <= other.vars[j]);
            if take_left {
                if j < other.vars.len() && self.vars[i] == other.vars[j] {
                    if self.cards[i] != other.cards[j] {
                        return Err(FactorError::Scope {
                            message: format!(
                                "variable {} has {} states in one factor and {} in the other",
                                self.vars[i], self.cards[i], other.cards[j]
                            ),
                        });
                    }
                    j += 1;
                }
                vars.push(self.vars[i]);
                cards.push(self.cards[i]);
                i += 1;
            } else {
                vars.push(other.vars[j]);
                cards.push(other.cards[j]);
                j += 1;
            }
        }

        let left = self.strides_over(&vars);
        let right = other.strides_over(&vars);
        let mut values = Vec::with_capacity(cards.iter().product());
        for_each_index(&cards, &[left.as_slice(), right.as_slice()], 0, |_, idx| {
            values.push(self.values[idx[0]] * other.values[idx[1]])
        });
        Ok(Factor {
            vars,
            cards,
            values,
        })
    }

    /// Sum a variable out of the scope.
    pub fn marginalize(&self, var: VarId) -> Result<Factor, FactorError> {
        let pos = self.position(var).ok_or_else(|| FactorError::Scope {
            message: format!("cannot marginalize {var}: not in scope"),
        })?;
        let card = self.cards[pos];
        let inner: usize = self.cards[pos + 1..].iter().product();
        let outer: usize = self.cards[..pos].iter().product();

        let mut values = Vec::with_capacity(outer * inner);
        let mut terms = Vec::with_capacity(card);
        for o in 0..outer {
            for k in 0..inner {
                terms.clear();
                for s in 0..card {
                    terms.push(self.values[(o * card + s) * inner + k]);
                }
                values.push(stable_sum(&terms));
            }
        }

        let mut vars = self.vars.clone();
        let mut cards = self.cards.clone();
        vars.remove(pos);
        cards.remove(pos);
        Ok(Factor {
            vars,
            cards,
            values,
        })
    }

    /// Sum out every variable, leaving a scalar factor.
    pub fn marginalize_all(&self) -> Factor {
        Factor::scalar(self.total())
    }

    /// Scale so the table sums to one.
    ///
    /// Rounding noise below zero is clamped first; a zero, negative, or
    /// non-finite total is a degenerate distribution.
    pub fn normalize(&self) -> Result<Factor, FactorError> {
        let mut values = self.values.clone();
        match normalize_in_place(&mut values) {
            Some(_) => Ok(Factor {
                vars: self.vars.clone(),
                cards: self.cards.clone(),
                values,
            }),
            None => Err(FactorError::Degenerate {
                total: self.total(),
            }),
        }
    }

    fn position(&self, var: VarId) -> Option<usize> {
        self.vars.binary_search(&var).ok()
    }

    /// This factor's strides laid over a superset scope (0 where absent).
    fn strides_over(&self, union: &[VarId]) -> Vec<usize> {
        let own = strides(&self.cards);
        union
            .iter()
            .map(|v| self.position(*v).map_or(0, |p| own[p]))
            .collect()
    }
}

/// Row-major strides (last dimension fastest).
fn strides(cards: &[usize]) -> Vec<usize> {
    let mut out = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * cards[i + 1];
    }
    out
}

/// Odometer over `cards`, tracking one linear index per stride set.
///
/// Calls `visit(states, indexes)` once per assignment in row-major order.
fn for_each_index<F>(cards: &[usize], stride_sets: &[&[usize]], base: usize, mut visit: F)
where
    F: FnMut(&[usize], &[usize]),
{
    let total: usize = cards.iter().product();
    let mut states = vec![0usize; cards.len()];
    let mut idx = vec![base; stride_sets.len()];
    for _ in 0..total {
        visit(&states, &idx);
        for l in (0..cards.len()).rev() {
            states[l] += 1;
            for (k, s) in stride_sets.iter().enumerate() {
                idx[k] += s[l];
            }
            if states[l] < cards[l] {
                break;
            }
            for (k, s) in stride_sets.iter().enumerate() {
                idx[k] -= s[l] * cards[l];
            }
            states[l] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: VarId = VarId::new(0);
    const B: VarId = VarId::new(1);
    const C: VarId = VarId::new(2);

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    fn assign(pairs: &[(VarId, usize)]) -> Assignment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn new_rejects_shape_mismatch() {
        let err = Factor::new(vec![(A, 2), (B, 2)], vec![0.1, 0.2, 0.3]).unwrap_err();
        assert_eq!(err, FactorError::Shape { expected: 4, actual: 3 });
    }

    #[test]
    fn new_rejects_duplicate_scope() {
        assert!(matches!(
            Factor::new(vec![(A, 2), (A, 2)], vec![0.0; 4]),
            Err(FactorError::Scope { .. })
        ));
    }

    #[test]
    fn new_rejects_nan() {
        assert_eq!(
            Factor::new(vec![(A, 2)], vec![0.5, f64::NAN]),
            Err(FactorError::NonFinite)
        );
    }

    #[test]
    fn new_canonicalizes_scope_order() {
        // Given as (B, A): values[b * 2 + a]
        let f = Factor::new(vec![(B, 3), (A, 2)], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(f.scope(), &[A, B]);
        assert_eq!(f.value(&assign(&[(A, 0), (B, 0)])), Some(1.0));
        assert_eq!(f.value(&assign(&[(A, 1), (B, 0)])), Some(2.0));
        assert_eq!(f.value(&assign(&[(A, 0), (B, 2)])), Some(5.0));
        assert!(approx(f.values(), &[1.0, 3.0, 5.0, 2.0, 4.0, 6.0]));
    }

    #[test]
    fn multiply_matches_hand_computation() {
        let fa = Factor::new(vec![(A, 2), (B, 2)], vec![0.5, 0.8, 0.1, 0.0]).unwrap();
        let fb = Factor::new(vec![(B, 2), (C, 2)], vec![0.5, 0.7, 0.1, 0.2]).unwrap();
        let product = fa.multiply(&fb).unwrap();
        assert_eq!(product.scope(), &[A, B, C]);
        let expected = [
            0.5 * 0.5,
            0.5 * 0.7,
            0.8 * 0.1,
            0.8 * 0.2,
            0.1 * 0.5,
            0.1 * 0.7,
            0.0,
            0.0,
        ];
        assert!(approx(product.values(), &expected));
    }

    #[test]
    fn multiply_disjoint_is_outer_product() {
        let fa = Factor::new(vec![(A, 2)], vec![0.25, 0.75]).unwrap();
        let fc = Factor::new(vec![(C, 2)], vec![0.1, 0.9]).unwrap();
        let product = fc.multiply(&fa).unwrap();
        assert_eq!(product.scope(), &[A, C]);
        assert!(approx(product.values(), &[0.025, 0.225, 0.075, 0.675]));
    }

    #[test]
    fn multiply_by_scalar_scales() {
        let fa = Factor::new(vec![(A, 2)], vec![0.25, 0.75]).unwrap();
        let scaled = fa.multiply(&Factor::scalar(2.0)).unwrap();
        assert!(approx(scaled.values(), &[0.5, 1.5]));
    }

    #[test]
    fn multiply_rejects_cardinality_conflict() {
        let fa = Factor::new(vec![(A, 2)], vec![0.5, 0.5]).unwrap();
        let fa3 = Factor::new(vec![(A, 3)], vec![0.2, 0.3, 0.5]).unwrap();
        assert!(matches!(fa.multiply(&fa3), Err(FactorError::Scope { .. })));
    }

    #[test]
    fn marginalize_middle_variable() {
        let f = Factor::new(
            vec![(A, 2), (B, 2), (C, 2)],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )
        .unwrap();
        let m = f.marginalize(B).unwrap();
        assert_eq!(m.scope(), &[A, C]);
        assert!(approx(m.values(), &[4.0, 6.0, 12.0, 14.0]));
    }

    #[test]
    fn marginalize_absent_variable_is_scope_error() {
        let f = Factor::new(vec![(A, 2)], vec![0.5, 0.5]).unwrap();
        assert!(matches!(f.marginalize(B), Err(FactorError::Scope { .. })));
    }

    #[test]
    fn marginalize_last_variable_gives_scalar() {
        let f = Factor::new(vec![(A, 2)], vec![0.3, 0.7]).unwrap();
        let m = f.marginalize(A).unwrap();
        assert!(m.is_scalar());
        assert!((m.scalar_value().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reduce_slices_and_ignores_foreign_evidence() {
        let f = Factor::new(
            vec![(A, 2), (B, 3)],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let r = f.reduce(&assign(&[(A, 1), (C, 0)])).unwrap();
        assert_eq!(r.scope(), &[B]);
        assert!(approx(r.values(), &[4.0, 5.0, 6.0]));

        let r2 = f.reduce(&assign(&[(B, 2)])).unwrap();
        assert_eq!(r2.scope(), &[A]);
        assert!(approx(r2.values(), &[3.0, 6.0]));

        let untouched = f.reduce(&assign(&[(C, 1)])).unwrap();
        assert_eq!(untouched, f);
    }

    #[test]
    fn reduce_rejects_out_of_range_state() {
        let f = Factor::new(vec![(A, 2)], vec![0.5, 0.5]).unwrap();
        assert!(matches!(
            f.reduce(&assign(&[(A, 2)])),
            Err(FactorError::StateOutOfRange { state: 2, .. })
        ));
    }

    #[test]
    fn normalize_and_degenerate() {
        let f = Factor::new(vec![(A, 2)], vec![1.0, 3.0]).unwrap();
        assert!(approx(f.normalize().unwrap().values(), &[0.25, 0.75]));

        let zero = Factor::new(vec![(A, 2)], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            zero.normalize(),
            Err(FactorError::Degenerate { .. })
        ));
    }

    #[test]
    fn normalize_clamps_rounding_noise() {
        let f = Factor::new(vec![(A, 2)], vec![-1e-18, 1.0]).unwrap();
        let n = f.normalize().unwrap();
        assert_eq!(n.values()[0], 0.0);
        assert_eq!(n.values()[1], 1.0);
    }

    #[test]
    fn assignments_follow_table_order() {
        let f = Factor::new(vec![(A, 2), (B, 2)], vec![0.0; 4]).unwrap();
        assert_eq!(
            f.assignments(),
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
    }
}
