// ambari-state/src/store/record.rs

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Flat attribute bag of a record: store field name -> scalar or array value.
pub type Fields = BTreeMap<String, Value>;

/// Shared handle to a stored record.
///
/// The store hands out clones of the same `Arc` for the lifetime of a record,
/// so a consumer holding a handle observes in-place updates from later polls.
pub type RecordRef = Arc<RwLock<Record>>;

/// The closed set of entity kinds kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Service,
    Host,
    HostComponent,
    ConfigVersion,
    ConfigGroup,
    StackVersion,
    OperatingSystem,
    Repository,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Service => "service",
            RecordType::Host => "host",
            RecordType::HostComponent => "host_component",
            RecordType::ConfigVersion => "config_version",
            RecordType::ConfigGroup => "config_group",
            RecordType::StackVersion => "stack_version",
            RecordType::OperatingSystem => "operating_system",
            RecordType::Repository => "repository",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, id-keyed entity. Relations live in the store's relation index,
/// never inside the record itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    record_type: RecordType,
    fields: Fields,
    revision: u64,
}

impl Record {
    pub(crate) fn new(record_type: RecordType, id: String, fields: Fields) -> Self {
        Self {
            id,
            record_type,
            fields,
            revision: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Number of in-place updates applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    /// String elements of an array field; non-string elements are ignored.
    pub fn get_str_list(&self, field: &str) -> Vec<String> {
        self.fields
            .get(field)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge `fields` into the record. Returns true if anything changed.
    ///
    /// Fields absent from `fields` keep their previous value, which lets a
    /// cheaper update-only query refresh a subset of attributes.
    pub(crate) fn merge(&mut self, fields: Fields) -> bool {
        let mut changed = false;
        for (name, value) in fields {
            if self.fields.get(&name) != Some(&value) {
                self.fields.insert(name, value);
                changed = true;
            }
        }
        if changed {
            self.revision += 1;
        }
        changed
    }
}
