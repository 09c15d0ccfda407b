// ambari-state/src/mappers/stack.rs

use crate::config::schema::{FieldMap, FieldSpec, IdTemplate, Identified, RecordSchema};
use crate::error::MapError;
use crate::mappers::snapshot::DEFAULT_COLLECTION_KEY;
use crate::mappers::{
    apply_records, check_relations, check_schema, collection_key, expect_resource,
    skipped_warnings, MapOutcome, MapReport, Mapper, RawSnapshot,
};
use crate::store::{RecordStore, RecordType, RelationDef, Transaction};
use crate::sync::{ChangeDetector, ChangeSet, FingerprintCache, Resource};
use log::{debug, info};
use serde_json::{Map, Value};

pub const STACK_OPERATING_SYSTEMS: &str = "operating_systems";
pub const OS_REPOSITORIES: &str = "repositories";

/// Flattened views of one stack-versions payload.
#[derive(Default)]
struct StackItems {
    versions: Vec<Value>,
    operating_systems: Vec<Value>,
    repositories: Vec<Value>,
}

/// Maps stack versions with their operating systems and repositories.
pub struct StackMapper {
    stacks: RecordSchema,
    operating_systems: RecordSchema,
    repositories: RecordSchema,
    collection: String,
    stack_cache: FingerprintCache,
    os_cache: FingerprintCache,
    repo_cache: FingerprintCache,
    detector: ChangeDetector,
}

impl StackMapper {
    pub fn new() -> Result<Self, MapError> {
        let stack_fields = || {
            vec![
                FieldSpec::required("stack_name", "Versions.stack_name"),
                FieldSpec::required("stack_version", "Versions.stack_version"),
            ]
        };

        let mut stack = stack_fields();
        stack.extend([
            FieldSpec::optional("active", "Versions.active").fingerprinted(),
            FieldSpec::optional("parent_stack_version", "Versions.parent_stack_version")
                .fingerprinted(),
            FieldSpec::optional("min_upgrade_version", "Versions.min_upgrade_version"),
        ]);
        let stacks = RecordSchema::new(
            RecordType::StackVersion,
            FieldMap::new(stack)?,
            IdTemplate::new(&["stack_name", "stack_version"], "-"),
        )?;

        let mut os = stack_fields();
        os.push(FieldSpec::required("os_type", "OperatingSystems.os_type").fingerprinted());
        let operating_systems = RecordSchema::new(
            RecordType::OperatingSystem,
            FieldMap::new(os)?,
            IdTemplate::new(&["stack_name", "stack_version", "os_type"], "-"),
        )?;

        let mut repo = stack_fields();
        repo.extend([
            FieldSpec::required("os_type", "OperatingSystems.os_type"),
            FieldSpec::required("repo_id", "Repositories.repo_id"),
            FieldSpec::optional("repo_name", "Repositories.repo_name").fingerprinted(),
            FieldSpec::optional("base_url", "Repositories.base_url").fingerprinted(),
            FieldSpec::optional("latest_base_url", "Repositories.latest_base_url")
                .fingerprinted(),
            FieldSpec::optional("mirrors_list", "Repositories.mirrors_list"),
        ]);
        let repositories = RecordSchema::new(
            RecordType::Repository,
            FieldMap::new(repo)?,
            IdTemplate::new(&["stack_name", "stack_version", "os_type", "repo_id"], "-"),
        )?;

        Ok(Self {
            stacks,
            operating_systems,
            repositories,
            collection: DEFAULT_COLLECTION_KEY.to_string(),
            stack_cache: FingerprintCache::new(),
            os_cache: FingerprintCache::new(),
            repo_cache: FingerprintCache::new(),
            detector: ChangeDetector::new(),
        })
    }

    /// Replace the schema of the record type `schema` describes.
    ///
    /// Each child schema must still carry its parent's id fields, since
    /// children are linked by rendering the parent id from their own fields.
    pub fn with_schema(mut self, schema: RecordSchema) -> Result<Self, MapError> {
        let slot = match schema.record_type() {
            RecordType::StackVersion => &mut self.stacks,
            RecordType::OperatingSystem => &mut self.operating_systems,
            RecordType::Repository => &mut self.repositories,
            record_type => {
                return Err(MapError::UnexpectedRecordType {
                    mapper: self.name(),
                    record_type,
                })
            }
        };
        *slot = schema;
        check_parent_fields(self.name(), &self.stacks, &self.operating_systems)?;
        check_parent_fields(self.name(), &self.operating_systems, &self.repositories)?;
        Ok(self)
    }

    /// Read stack versions from `key` instead of `items`.
    pub fn with_collection(mut self, key: &str) -> Result<Self, MapError> {
        self.collection = collection_key(key)?;
        Ok(self)
    }

    /// Split the nested payload into one item list per record type. Child
    /// items carry their parents' envelopes so the id templates resolve.
    fn flatten(items: &[Value]) -> StackItems {
        let mut flat = StackItems::default();
        for item in items {
            let versions = item.get("Versions").cloned().unwrap_or(Value::Null);
            flat.versions.push(item.clone());

            let operating_systems = item
                .get("operating_systems")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for os in operating_systems {
                let os_info = os.get("OperatingSystems").cloned().unwrap_or(Value::Null);
                let mut os_item = Map::new();
                os_item.insert("Versions".to_string(), versions.clone());
                os_item.insert("OperatingSystems".to_string(), os_info);

                let repositories = os
                    .get("repositories")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for repo in repositories {
                    let mut repo_item = os_item.clone();
                    repo_item.insert(
                        "Repositories".to_string(),
                        repo.get("Repositories").cloned().unwrap_or(Value::Null),
                    );
                    flat.repositories.push(Value::Object(repo_item));
                }
                flat.operating_systems.push(Value::Object(os_item));
            }
        }
        flat
    }

    fn diff(
        &self,
        schema: &RecordSchema,
        cache: &FingerprintCache,
        items: &[Value],
    ) -> ChangeSet<Identified> {
        self.detector
            .detect_changes(schema.record_type(), cache, items.iter(), |item| {
                schema.identify(item)
            })
    }
}

fn check_parent_fields(
    mapper: &'static str,
    parent: &RecordSchema,
    child: &RecordSchema,
) -> Result<(), MapError> {
    let needed: Vec<&str> = parent
        .id_template()
        .fields()
        .iter()
        .map(String::as_str)
        .collect();
    check_schema(mapper, child, child.record_type(), &needed)
}

/// Link freshly added children under the parent id rendered from their own
/// fields.
fn link_children(
    tx: &mut Transaction<'_>,
    changes: &ChangeSet<Identified>,
    parent: &RecordSchema,
    relation: &str,
) -> Result<(), MapError> {
    for change in &changes.added {
        if let Some(parent_id) = parent.id_template().render(&change.fields) {
            tx.add_to_relation(parent.record_type(), &parent_id, relation, &change.id)?;
        }
    }
    Ok(())
}

impl Mapper for StackMapper {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn resources(&self) -> &[Resource] {
        &[Resource::StackVersions]
    }

    fn relations(&self) -> Vec<RelationDef> {
        vec![
            RelationDef::has_many(
                RecordType::StackVersion,
                STACK_OPERATING_SYSTEMS,
                RecordType::OperatingSystem,
            ),
            RelationDef::has_many(
                RecordType::OperatingSystem,
                OS_REPOSITORIES,
                RecordType::Repository,
            ),
        ]
    }

    fn map(
        &mut self,
        store: &mut RecordStore,
        resource: Resource,
        snapshot: &RawSnapshot,
    ) -> Result<MapReport, MapError> {
        expect_resource(self, resource)?;
        check_relations(self, store)?;
        let Some(items) = snapshot.collection(&self.collection)? else {
            debug!("{}: no `{}` in snapshot, nothing to do", self.name(), self.collection);
            return Ok(MapReport::new(self.name(), resource, MapOutcome::NoOp));
        };

        let flat = Self::flatten(items);
        let stacks = self.diff(&self.stacks, &self.stack_cache, &flat.versions);
        let operating_systems =
            self.diff(&self.operating_systems, &self.os_cache, &flat.operating_systems);
        let repositories = self.diff(&self.repositories, &self.repo_cache, &flat.repositories);

        let mut report = MapReport::new(self.name(), resource, MapOutcome::Applied);
        for changes in [&stacks, &operating_systems, &repositories] {
            report.warnings.extend(skipped_warnings(changes));
        }
        if !(stacks.has_changes() || operating_systems.has_changes() || repositories.has_changes())
        {
            return Ok(report);
        }

        let mut tx = store.transaction()?;
        apply_records(&mut tx, &stacks);
        apply_records(&mut tx, &operating_systems);
        apply_records(&mut tx, &repositories);
        link_children(&mut tx, &operating_systems, &self.stacks, STACK_OPERATING_SYSTEMS)?;
        link_children(&mut tx, &repositories, &self.operating_systems, OS_REPOSITORIES)?;
        report.events = tx.commit();

        self.stack_cache.apply(&stacks);
        self.os_cache.apply(&operating_systems);
        self.repo_cache.apply(&repositories);

        info!(
            "{}: {} stack versions, {} operating systems, {} repositories changed",
            self.name(),
            stacks.added.len() + stacks.updated.len() + stacks.removed.len(),
            operating_systems.added.len()
                + operating_systems.updated.len()
                + operating_systems.removed.len(),
            repositories.added.len() + repositories.updated.len() + repositories.removed.len()
        );
        Ok(report)
    }
}
