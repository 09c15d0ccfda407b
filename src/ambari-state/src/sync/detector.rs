// ambari-state/src/sync/detector.rs

use crate::store::RecordType;
use crate::sync::cache::FingerprintCache;
use crate::sync::changes::{ChangeSet, Keyed, Rejection, SkippedItem};
use log::{trace, warn};
use std::collections::HashSet;

/// Classifies a snapshot against the previous fingerprint cache
pub struct ChangeDetector {}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {}
    }

    /// Diff `items` against `previous`.
    ///
    /// One pass over the snapshot with O(1) lookups into a working copy of
    /// the cache; every id seen is taken out of the copy, and whatever is
    /// left at the end was removed. Items that `identify` rejects, and later
    /// occurrences of an id already seen, are skipped. A rejected item that
    /// still names a known id keeps that record as it was.
    pub fn detect_changes<T, K, E, F, I>(
        &self,
        record_type: RecordType,
        previous: &FingerprintCache,
        items: I,
        mut identify: F,
    ) -> ChangeSet<K>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Result<K, E>,
        K: Keyed,
        E: Rejection,
    {
        let mut changes = ChangeSet::new(record_type);
        let mut remaining = previous.entries().clone();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let keyed = match identify(item) {
                Ok(keyed) => keyed,
                Err(reason) => {
                    warn!("Skipping {} item #{}: {}", record_type, index, reason);
                    if let Some(id) = reason.record_id() {
                        if remaining.remove(id).is_some() {
                            changes.kept.push(id.to_string());
                        }
                    }
                    changes.skipped.push(SkippedItem {
                        index,
                        reason: reason.to_string(),
                    });
                    continue;
                }
            };

            if !seen.insert(keyed.key().to_string()) {
                warn!(
                    "Skipping {} item #{}: duplicate id {}",
                    record_type,
                    index,
                    keyed.key()
                );
                changes.skipped.push(SkippedItem {
                    index,
                    reason: format!("duplicate id {}", keyed.key()),
                });
                continue;
            }

            changes.stats.lookups += 1;
            match remaining.remove(keyed.key()) {
                None => changes.added.push(keyed),
                Some(cached) => {
                    changes.stats.comparisons += 1;
                    if cached == keyed.fingerprint() {
                        changes.unchanged += 1;
                    } else {
                        changes.updated.push(keyed);
                    }
                }
            }
        }

        let mut removed: Vec<String> = remaining.into_keys().collect();
        removed.sort();
        changes.removed = removed;

        trace!(
            "{} diff: +{} ~{} -{} ={} ({} lookups, {} comparisons)",
            record_type,
            changes.added.len(),
            changes.updated.len(),
            changes.removed.len(),
            changes.unchanged,
            changes.stats.lookups,
            changes.stats.comparisons
        );

        changes
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}
