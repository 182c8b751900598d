//! # Prefetched Relations
//!
//! Entities loaded together with related data keep that data in a
//! [`PrefetchCache`]. After a transition the cache is stale and must be
//! cleared before the entity is serialized again.

use std::collections::BTreeMap;

/// Related data loaded alongside an entity, keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefetchCache {
    relations: BTreeMap<String, serde_json::Value>,
}

impl PrefetchCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store prefetched data for a relation, replacing any previous value.
    pub fn insert(&mut self, relation: impl Into<String>, value: serde_json::Value) {
        self.relations.insert(relation.into(), value);
    }

    /// Prefetched data for a relation.
    pub fn get(&self, relation: &str) -> Option<&serde_json::Value> {
        self.relations.get(relation)
    }

    /// Number of cached relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Drop all cached relations.
    pub fn clear(&mut self) {
        self.relations.clear();
    }
}
