// ambari-state/src/sync/cache.rs

use crate::config::fingerprint::Fingerprint;
use crate::sync::changes::{ChangeSet, Keyed};
use std::collections::HashMap;

/// id -> fingerprint of every record of one type as of the last applied poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintCache {
    entries: HashMap<String, Fingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Fingerprint> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, fingerprint: Fingerprint) {
        self.entries.insert(id.into(), fingerprint);
    }

    pub fn remove(&mut self, id: &str) -> Option<Fingerprint> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sorted ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn entries(&self) -> &HashMap<String, Fingerprint> {
        &self.entries
    }

    /// Bring the cache in line with a change set that was written to the store.
    pub fn apply<K: Keyed>(&mut self, changes: &ChangeSet<K>) {
        for change in changes.added.iter().chain(changes.updated.iter()) {
            self.entries
                .insert(change.key().to_string(), change.fingerprint());
        }
        for id in &changes.removed {
            self.entries.remove(id);
        }
    }
}

impl FromIterator<(String, Fingerprint)> for FingerprintCache {
    fn from_iter<I: IntoIterator<Item = (String, Fingerprint)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
