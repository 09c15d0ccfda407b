// ambari-state/src/mappers/mod.rs

//! Translation of polled REST snapshots into record store mutations.
//!
//! A mapper owns the record types it writes, the fingerprint caches for
//! them and the relation declarations it needs. Each call to
//! [`Mapper::map`] diffs the snapshot against those caches and applies the
//! result inside a single store transaction.

pub mod config_versions;
pub mod snapshot;
pub mod stack;
pub mod status;

pub use config_versions::ConfigVersionsMapper;
pub use snapshot::RawSnapshot;
pub use stack::StackMapper;
pub use status::StatusMapper;

use crate::config::schema::{Identified, RecordSchema};
use crate::error::{FieldMapError, MapError, StoreError};
use crate::store::{ChangeEvent, RecordStore, RecordType, RelationDef, Transaction};
use crate::sync::{ChangeSet, Resource};
use serde::Serialize;

/// What a `map` call did with its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapOutcome {
    /// The snapshot was diffed and written (possibly with zero changes).
    Applied,
    /// The item collection was absent; nothing was touched.
    NoOp,
    /// Waiting for the other half of a joined query.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapReport {
    pub mapper: &'static str,
    pub resource: Resource,
    pub outcome: MapOutcome,
    pub events: Vec<ChangeEvent>,
    /// Items that were skipped, one line each.
    pub warnings: Vec<String>,
}

impl MapReport {
    pub fn new(mapper: &'static str, resource: Resource, outcome: MapOutcome) -> Self {
        Self {
            mapper,
            resource,
            outcome,
            events: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} <- {}: {:?}",
            self.mapper, self.resource, self.outcome
        )];
        for event in &self.events {
            lines.push(format!("  {}", event.summary()));
        }
        for warning in &self.warnings {
            lines.push(format!("  warning: {}", warning));
        }
        lines.join("\n")
    }
}

pub trait Mapper: Send {
    fn name(&self) -> &'static str;

    /// Resources whose snapshots this mapper consumes.
    fn resources(&self) -> &[Resource];

    /// Relations this mapper writes to.
    fn relations(&self) -> Vec<RelationDef>;

    /// Declare the mapper's relations on `store`.
    fn register(&self, store: &mut RecordStore) -> Result<(), StoreError> {
        for def in self.relations() {
            store.declare_relation(def)?;
        }
        Ok(())
    }

    fn map(
        &mut self,
        store: &mut RecordStore,
        resource: Resource,
        snapshot: &RawSnapshot,
    ) -> Result<MapReport, MapError>;
}

/// The mapper that consumes `resource`.
pub fn mapper_for(resource: Resource) -> Result<Box<dyn Mapper>, MapError> {
    Ok(match resource {
        Resource::HostComponents => Box::new(StatusMapper::new()?),
        Resource::ConfigVersions | Resource::ClusterHosts => {
            Box::new(ConfigVersionsMapper::new()?)
        }
        Resource::StackVersions => Box::new(StackMapper::new()?),
    })
}

/// Reject snapshots of resources the mapper does not consume.
pub(crate) fn expect_resource<M: Mapper + ?Sized>(
    mapper: &M,
    resource: Resource,
) -> Result<(), MapError> {
    if mapper.resources().contains(&resource) {
        Ok(())
    } else {
        Err(MapError::UnexpectedResource {
            mapper: mapper.name(),
            resource,
        })
    }
}

/// Fail before any store mutation if a relation the mapper writes is not
/// declared on `store` with the same shape.
pub(crate) fn check_relations<M: Mapper + ?Sized>(
    mapper: &M,
    store: &RecordStore,
) -> Result<(), MapError> {
    for def in mapper.relations() {
        if store.relations().definition(def.parent, def.name)? != def {
            return Err(StoreError::ConflictingRelation {
                record_type: def.parent,
                relation: def.name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// A replacement schema must describe `record_type` and map every field in
/// `needed` as required.
pub(crate) fn check_schema(
    mapper: &'static str,
    schema: &RecordSchema,
    record_type: RecordType,
    needed: &[&str],
) -> Result<(), MapError> {
    if schema.record_type() != record_type {
        return Err(MapError::UnexpectedRecordType {
            mapper,
            record_type: schema.record_type(),
        });
    }
    for field in needed {
        match schema.field_map().spec(field) {
            Some(spec) if spec.required => {}
            _ => {
                return Err(FieldMapError::MissingRequiredField {
                    record_type,
                    field: field.to_string(),
                }
                .into())
            }
        }
    }
    Ok(())
}

pub(crate) fn collection_key(key: &str) -> Result<String, MapError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(MapError::EmptyCollectionKey);
    }
    Ok(key.to_string())
}

/// Write the record part of a change set: upsert added and updated, delete
/// removed (which also purges their relation links).
pub(crate) fn apply_records(tx: &mut Transaction<'_>, changes: &ChangeSet<Identified>) {
    for change in changes.added.iter().chain(changes.updated.iter()) {
        tx.upsert(changes.record_type, &change.id, change.fields.clone());
    }
    for id in &changes.removed {
        tx.remove(changes.record_type, id);
    }
}

pub(crate) fn skipped_warnings<K>(changes: &ChangeSet<K>) -> Vec<String> {
    changes
        .skipped
        .iter()
        .map(|skipped| {
            format!(
                "{} item #{} skipped: {}",
                changes.record_type, skipped.index, skipped.reason
            )
        })
        .collect()
}
