// ambari-state/src/mappers/snapshot.rs

use crate::error::MapError;
use serde_json::Value;
use std::str::FromStr;

/// Envelope key of the item collection in Ambari responses.
pub const DEFAULT_COLLECTION_KEY: &str = "items";

/// A decoded response body, before any mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    body: Value,
}

impl RawSnapshot {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Items under `key`.
    ///
    /// `Ok(None)` when the key is absent (or `null`): the poll carried no
    /// information and must not delete anything. `Ok(Some(&[]))` is an
    /// authoritative empty collection.
    pub fn collection(&self, key: &str) -> Result<Option<&[Value]>, MapError> {
        let Value::Object(map) = &self.body else {
            return Err(MapError::NotAnObject);
        };
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(_) => Err(MapError::CollectionNotAnArray(key.to_string())),
        }
    }

    pub fn items(&self) -> Result<Option<&[Value]>, MapError> {
        self.collection(DEFAULT_COLLECTION_KEY)
    }

    /// The server-reported total, when present.
    pub fn item_total(&self) -> Option<u64> {
        let total = self.body.get("itemTotal")?;
        total
            .as_u64()
            .or_else(|| total.as_str().and_then(|s| s.parse().ok()))
    }
}

impl From<Value> for RawSnapshot {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

impl FromStr for RawSnapshot {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map(Self::new)
    }
}
