// ambari-state/src/store/events.rs

use crate::store::record::RecordType;
use serde::Serialize;

/// Per-type notification published once per committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub record_type: RecordType,
    /// Monotonic id of the transaction that produced this event.
    pub batch: u64,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Relation links added or dropped on sets owned by this type.
    pub relations_changed: usize,
}

impl ChangeEvent {
    pub(crate) fn new(record_type: RecordType, batch: u64) -> Self {
        Self {
            record_type,
            batch,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            relations_changed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.relations_changed == 0
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "{}: +{} ~{} -{} ({} relation links)",
            self.record_type,
            self.added.len(),
            self.updated.len(),
            self.removed.len(),
            self.relations_changed
        )
    }
}
