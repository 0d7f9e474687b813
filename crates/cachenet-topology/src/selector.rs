//! Per-selector staged state.
//!
//! Each selector value (for example an application name) owns its own
//! staged state. Switching selectors never discards another selector's
//! edits; an unseen selector starts from `V::default()`.

use std::collections::HashMap;
use std::hash::Hash;

/// Explicit map of selector → staged state.
#[derive(Debug, Clone)]
pub struct SelectorCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for SelectorCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> SelectorCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `key`, seeding an empty one on first sight.
    pub fn get(&mut self, key: &K) -> &V {
        self.entries.entry(key.clone()).or_default()
    }

    /// State for `key` without seeding.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Put `key` back to an empty state.
    pub fn reset(&mut self, key: &K) {
        self.entries.insert(key.clone(), V::default());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}
