// ambari-state/src/sync/changes.rs

use crate::config::fingerprint::Fingerprint;
use crate::config::schema::Identified;
use crate::error::MissingField;
use crate::store::RecordType;
use std::fmt::Display;

/// Anything the diff can classify: it has an id and a fingerprint.
pub trait Keyed {
    fn key(&self) -> &str;
    fn fingerprint(&self) -> Fingerprint;
}

impl Keyed for Identified {
    fn key(&self) -> &str {
        &self.id
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

/// Why an item was left out of a diff.
pub trait Rejection: Display {
    /// Id of the record the rejected item describes, when it is still known.
    fn record_id(&self) -> Option<&str> {
        None
    }
}

impl Rejection for MissingField {
    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Rejection for String {}

impl Rejection for &str {}

/// An item that could not take part in the diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position in the snapshot
    pub index: usize,
    pub reason: String,
}

/// Work done by one diff, for verifying it stays linear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Hash lookups into the previous cache
    pub lookups: usize,
    /// Fingerprint equality checks
    pub comparisons: usize,
}

/// Result of diffing one snapshot of one record type against its cache
#[derive(Debug, Clone)]
pub struct ChangeSet<K> {
    pub record_type: RecordType,

    /// New ids, with the item needed to populate the record
    pub added: Vec<K>,

    /// Known ids whose fingerprint changed
    pub updated: Vec<K>,

    /// Known ids missing from the snapshot, sorted
    pub removed: Vec<String>,

    /// Known ids with an identical fingerprint
    pub unchanged: usize,

    pub skipped: Vec<SkippedItem>,

    /// Known ids whose item was skipped; record and fingerprint stay as they are
    pub kept: Vec<String>,

    pub stats: DiffStats,
}

impl<K: Keyed> ChangeSet<K> {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            unchanged: 0,
            skipped: Vec::new(),
            kept: Vec::new(),
            stats: DiffStats::default(),
        }
    }

    /// Check if the store needs to be touched at all
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    pub fn added_ids(&self) -> Vec<&str> {
        self.added.iter().map(Keyed::key).collect()
    }

    pub fn updated_ids(&self) -> Vec<&str> {
        self.updated.iter().map(Keyed::key).collect()
    }

    /// Get a summary of changes for display
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if !self.added.is_empty() {
            lines.push(format!("Added: {}", self.added.len()));
            for change in &self.added {
                lines.push(format!("  + {}", change.key()));
            }
        }

        if !self.updated.is_empty() {
            lines.push(format!("Updated: {}", self.updated.len()));
            for change in &self.updated {
                lines.push(format!("  ~ {}", change.key()));
            }
        }

        if !self.removed.is_empty() {
            lines.push(format!("Removed: {}", self.removed.len()));
            for id in &self.removed {
                lines.push(format!("  - {}", id));
            }
        }

        if !self.skipped.is_empty() {
            lines.push(format!("Skipped items: {}", self.skipped.len()));
            for skipped in &self.skipped {
                lines.push(format!("  ! #{}: {}", skipped.index, skipped.reason));
            }
        }

        if !self.kept.is_empty() {
            lines.push(format!("Kept from previous poll: {}", self.kept.len()));
            for id in &self.kept {
                lines.push(format!("  = {}", id));
            }
        }

        if lines.is_empty() {
            format!("{}: no changes detected.", self.record_type)
        } else {
            format!("{}:\n{}", self.record_type, lines.join("\n"))
        }
    }
}
