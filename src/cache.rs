//! Result cache and its serializable snapshot.
//!
//! A [`Cache`] maps cache keys (see [`Operation::cache_key`]) to result data.
//! [`Cache::extract`] produces a [`CacheSnapshot`] that can travel inside the
//! rendered page, and [`Cache::restore`] loads one into a fresh cache on the
//! receiving side.
//!
//! [`Operation::cache_key`]: crate::operation::Operation::cache_key

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time copy of a cache's contents.
///
/// Serializes as a plain JSON object keyed by cache key:
///
/// ```
/// use serde_json::json;
/// use universal_query::cache::CacheSnapshot;
///
/// let snapshot: CacheSnapshot =
///     serde_json::from_value(json!({"Query1": {"data": "X"}})).unwrap();
/// assert_eq!(snapshot.get("Query1"), Some(&json!({"data": "X"})));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot(BTreeMap<String, Value>);

impl CacheSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: String, data: Value) {
        self.0.insert(key, data);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for CacheSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CacheSnapshot {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Storage for query results, shared by every request on one client.
///
/// Implementations use interior mutability; descendants read and write
/// concurrently through `&self`.
pub trait Cache: Send + Sync + fmt::Debug {
    fn read(&self, key: &str) -> Option<Value>;

    fn write(&self, key: String, data: Value);

    /// Copies the current contents.
    fn extract(&self) -> CacheSnapshot;

    /// Replaces the current contents with `snapshot`.
    fn restore(&self, snapshot: CacheSnapshot);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default [`Cache`], backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Value>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-filled from `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let cache = Self::new();
        cache.restore(snapshot);
        cache
    }
}

impl Cache for InMemoryCache {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn write(&self, key: String, data: Value) {
        self.entries.insert(key, data);
    }

    fn extract(&self) -> CacheSnapshot {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn restore(&self, snapshot: CacheSnapshot) {
        self.entries.clear();
        for (key, data) in snapshot {
            self.entries.insert(key, data);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
