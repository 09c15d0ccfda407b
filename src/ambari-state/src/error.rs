// ambari-state/src/error.rs

//! Error types shared across the fetch, store and mapping layers.

use crate::store::RecordType;
use crate::sync::Resource;
use thiserror::Error;

/// Transport-level failures. None of these ever reach the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Unavailable { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} is not valid JSON: {message}")]
    Decode { url: String, message: String },

    #[error("url template {template} has no value for {{{placeholder}}}")]
    Placeholder { template: String, placeholder: String },

    #[error("no descriptor registered for resource {0}")]
    UnknownResource(Resource),
}

/// Problems found while validating a declarative field map at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldMapError {
    #[error("field `{0}` has an empty source path")]
    EmptyPath(String),

    #[error("field `{0}` is mapped more than once")]
    DuplicateField(String),

    #[error("the id template has no fields")]
    EmptyIdTemplate,

    #[error("id field `{0}` must be a required mapped field")]
    IdFieldNotRequired(String),

    #[error("no field is marked as part of the fingerprint")]
    NoFingerprintFields,

    #[error("{record_type} records need `{field}` as a required mapped field")]
    MissingRequiredField {
        record_type: RecordType,
        field: String,
    },
}

/// An item lacked a required field; the item is skipped, the poll continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required field `{field}` (source path `{path}`)")]
pub struct MissingField {
    pub field: String,
    pub path: String,
    /// Id of the record the item describes, if the id fields were present.
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("relation `{relation}` is not declared on {record_type}")]
    UnknownRelation {
        record_type: RecordType,
        relation: String,
    },

    #[error("relation `{relation}` on {record_type} is already declared with a different shape")]
    ConflictingRelation {
        record_type: RecordType,
        relation: String,
    },

    #[error("the record store has been torn down")]
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("snapshot body is not a JSON object")]
    NotAnObject,

    #[error("`{0}` in the snapshot body is not an array")]
    CollectionNotAnArray(String),

    #[error("invalid field map: {0}")]
    Schema(#[from] FieldMapError),

    #[error("mapper {mapper} does not consume resource {resource}")]
    UnexpectedResource {
        mapper: &'static str,
        resource: Resource,
    },

    #[error("mapper {mapper} does not write {record_type} records")]
    UnexpectedRecordType {
        mapper: &'static str,
        record_type: RecordType,
    },

    #[error("the item collection key must not be empty")]
    EmptyCollectionKey,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a single resource within a poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("no mapper registered for resource {0}")]
    NoMapper(Resource),
}
