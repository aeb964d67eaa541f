//! Elimination-order cache.
//!
//! Orders depend only on the network structure, the heuristic, and which
//! variables are queried or observed (never on the observed *states*), so they
//! can be shared between queries. The cache is purely an optimization: a miss
//! recomputes the same order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::factor::VarId;

/// Cache key: heuristic name plus sorted query and evidence variable sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub strategy: &'static str,
    pub query: Vec<VarId>,
    pub evidence: Vec<VarId>,
    pub pruned: bool,
}

impl OrderKey {
    pub fn new(
        strategy: &'static str,
        query: impl IntoIterator<Item = VarId>,
        evidence: impl IntoIterator<Item = VarId>,
        pruned: bool,
    ) -> Self {
        let mut query: Vec<VarId> = query.into_iter().collect();
        let mut evidence: Vec<VarId> = evidence.into_iter().collect();
        query.sort();
        query.dedup();
        evidence.sort();
        evidence.dedup();
        Self {
            strategy,
            query,
            evidence,
            pruned,
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Read-mostly order cache shared by concurrent queries.
#[derive(Debug, Default)]
pub struct OrderCache {
    entries: RwLock<HashMap<OrderKey, Arc<Vec<VarId>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached order for `key`, computing and storing it on a miss.
    ///
    /// Two threads missing on the same key may both compute; the orders are
    /// identical, so whichever insert lands last is kept.
    pub fn get_or_insert_with(
        &self,
        key: OrderKey,
        compute: impl FnOnce() -> Vec<VarId>,
    ) -> (Arc<Vec<VarId>>, bool) {
        if let Some(order) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target: "dn_core::cache", strategy = key.strategy, "order cache hit");
            return (order, true);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "dn_core::cache", strategy = key.strategy, "order cache miss");
        let order = Arc::new(compute());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&order));
        (order, false)
    }

    pub fn get(&self, key: &OrderKey) -> Option<Arc<Vec<VarId>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<VarId> {
        raw.iter().map(|i| VarId::new(*i)).collect()
    }

    #[test]
    fn key_ignores_input_order() {
        let a = OrderKey::new("min_size", ids(&[2, 1]), ids(&[5, 3]), true);
        let b = OrderKey::new("min_size", ids(&[1, 2]), ids(&[3, 5]), true);
        assert_eq!(a, b);
        let c = OrderKey::new("min_fill", ids(&[1, 2]), ids(&[3, 5]), true);
        assert_ne!(a, c);
    }

    #[test]
    fn second_lookup_hits() {
        let cache = OrderCache::new();
        let key = OrderKey::new("min_size", ids(&[0]), ids(&[]), true);
        let (first, hit) = cache.get_or_insert_with(key.clone(), || ids(&[1, 2]));
        assert!(!hit);
        let (second, hit) = cache.get_or_insert_with(key, || panic!("must not recompute"));
        assert!(hit);
        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn survives_poisoned_lock() {
        let cache = Arc::new(OrderCache::new());
        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        let key = OrderKey::new("min_size", ids(&[0]), ids(&[]), false);
        let (order, _) = cache.get_or_insert_with(key, || ids(&[3]));
        assert_eq!(*order, ids(&[3]));
    }

    #[test]
    fn clear_drops_entries() {
        let cache = OrderCache::new();
        cache.get_or_insert_with(OrderKey::new("x", ids(&[0]), ids(&[]), true), Vec::new);
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
