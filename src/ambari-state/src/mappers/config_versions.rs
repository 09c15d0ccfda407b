// ambari-state/src/mappers/config_versions.rs

use crate::config::fingerprint::{fingerprint_values, Fingerprint};
use crate::config::schema::{FieldMap, FieldSpec, IdTemplate, Identified, RecordSchema};
use crate::constants::{DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME};
use crate::error::MapError;
use crate::mappers::snapshot::DEFAULT_COLLECTION_KEY;
use crate::mappers::{
    apply_records, check_relations, check_schema, collection_key, expect_resource,
    skipped_warnings, MapOutcome, MapReport, Mapper, RawSnapshot,
};
use crate::store::{Fields, RecordStore, RecordType, RelationDef, Transaction};
use crate::sync::{ChangeDetector, ChangeSet, FingerprintCache, Resource};
use log::{debug, info};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const SERVICE_CONFIG_VERSIONS: &str = "config_versions";
pub const GROUP_HOSTS: &str = "hosts";
pub const HOST_CONFIG_GROUPS: &str = "config_groups";

const GROUP_FINGERPRINT_FIELDS: [&str; 2] = ["group_name", "hosts"];

/// Version fields the groups are derived from.
const NEEDED_FIELDS: [&str; 2] = ["service_name", "is_current"];

/// A config group as derived from the current versions of one service.
struct DerivedGroup {
    id: String,
    fields: Fields,
    hosts: BTreeSet<String>,
}

/// Maps service config versions and derives config groups.
///
/// Groups need the cluster host list to compute the default group, so the
/// versions query and the hosts query are joined: each arriving half is
/// parked in its slot and nothing is mapped until both are present. A newer
/// copy of a half replaces the parked one.
pub struct ConfigVersionsMapper {
    versions: RecordSchema,
    hosts: FieldMap,
    collection: String,
    versions_slot: Option<RawSnapshot>,
    topology_slot: Option<RawSnapshot>,
    versions_cache: FingerprintCache,
    groups_cache: FingerprintCache,
    groups_by_service: HashMap<String, BTreeSet<String>>,
    cluster_hosts: BTreeSet<String>,
    detector: ChangeDetector,
}

impl ConfigVersionsMapper {
    pub fn new() -> Result<Self, MapError> {
        let hosts = FieldMap::new(vec![
            FieldSpec::required("host_name", "Hosts.host_name").fingerprinted()
        ])?;

        Ok(Self {
            versions: Self::default_schema()?,
            hosts,
            collection: DEFAULT_COLLECTION_KEY.to_string(),
            versions_slot: None,
            topology_slot: None,
            versions_cache: FingerprintCache::new(),
            groups_cache: FingerprintCache::new(),
            groups_by_service: HashMap::new(),
            cluster_hosts: BTreeSet::new(),
            detector: ChangeDetector::new(),
        })
    }

    pub fn default_schema() -> Result<RecordSchema, MapError> {
        let fields = FieldMap::new(vec![
            FieldSpec::required("service_name", "service_name"),
            FieldSpec::required("version", "service_config_version"),
            FieldSpec::required("is_current", "is_current").fingerprinted(),
            FieldSpec::optional("group_id", "group_id"),
            FieldSpec::optional("group_name", "group_name").fingerprinted(),
            FieldSpec::optional("hosts", "hosts").fingerprinted(),
            FieldSpec::optional("note", "service_config_version_note").fingerprinted(),
            FieldSpec::optional("author", "user"),
            FieldSpec::optional("create_time", "createtime"),
        ])?;
        Ok(RecordSchema::new(
            RecordType::ConfigVersion,
            fields,
            IdTemplate::new(&["service_name", "version"], "_"),
        )?)
    }

    /// Map config versions with `schema` instead of the default one.
    pub fn with_schema(mut self, schema: RecordSchema) -> Result<Self, MapError> {
        check_schema(self.name(), &schema, RecordType::ConfigVersion, &NEEDED_FIELDS)?;
        self.versions = schema;
        Ok(self)
    }

    /// Read both halves' items from `key` instead of `items`.
    pub fn with_collection(mut self, key: &str) -> Result<Self, MapError> {
        self.collection = collection_key(key)?;
        Ok(self)
    }

    /// The half the barrier is still waiting for, if one half has arrived.
    pub fn pending(&self) -> Option<Resource> {
        match (&self.versions_slot, &self.topology_slot) {
            (Some(_), None) => Some(Resource::ClusterHosts),
            (None, Some(_)) => Some(Resource::ConfigVersions),
            _ => None,
        }
    }

    pub fn versions_cache(&self) -> &FingerprintCache {
        &self.versions_cache
    }

    pub fn groups_cache(&self) -> &FingerprintCache {
        &self.groups_cache
    }

    pub fn cluster_hosts(&self) -> &BTreeSet<String> {
        &self.cluster_hosts
    }

    fn flush(
        &mut self,
        store: &mut RecordStore,
        resource: Resource,
        versions: &RawSnapshot,
        topology: &RawSnapshot,
    ) -> Result<MapReport, MapError> {
        let version_items = versions.collection(&self.collection)?;
        let host_items = topology.collection(&self.collection)?;
        if version_items.is_none() && host_items.is_none() {
            return Ok(MapReport::new(self.name(), resource, MapOutcome::NoOp));
        }
        let mut report = MapReport::new(self.name(), resource, MapOutcome::Applied);

        let mut topology_changed = false;
        let mut next_hosts = None;
        if let Some(items) = host_items {
            let mut hosts = BTreeSet::new();
            for (index, item) in items.iter().enumerate() {
                match self.hosts.extract(item) {
                    Ok(fields) => {
                        if let Some(name) = fields.get("host_name").and_then(Value::as_str) {
                            hosts.insert(name.to_string());
                        }
                    }
                    Err(err) => report
                        .warnings
                        .push(format!("host item #{} skipped: {}", index, err)),
                }
            }
            topology_changed = hosts != self.cluster_hosts;
            next_hosts = Some(hosts);
        }
        let cluster_hosts = next_hosts.as_ref().unwrap_or(&self.cluster_hosts);

        let changes = version_items.map(|items| {
            self.detector.detect_changes(
                RecordType::ConfigVersion,
                &self.versions_cache,
                items.iter(),
                |item| self.versions.identify(item),
            )
        });
        if let Some(changes) = &changes {
            report.warnings.extend(skipped_warnings(changes));
        }

        let mut tx = store.transaction()?;
        let mut dirty: BTreeSet<String> = BTreeSet::new();

        if let Some(changes) = &changes {
            for change in changes.added.iter().chain(changes.updated.iter()) {
                if let Some(service) = change.fields.get("service_name").and_then(Value::as_str) {
                    dirty.insert(service.to_string());
                }
            }
            for id in &changes.removed {
                if let Some(record) = tx.find(RecordType::ConfigVersion, id) {
                    if let Some(service) = record.read().get_str("service_name") {
                        dirty.insert(service.to_string());
                    }
                }
            }
            apply_records(&mut tx, changes);
            for change in &changes.added {
                if let Some(service) = change.fields.get("service_name").and_then(Value::as_str) {
                    tx.add_to_relation(
                        RecordType::Service,
                        service,
                        SERVICE_CONFIG_VERSIONS,
                        &change.id,
                    )?;
                }
            }
        }

        let services: BTreeSet<String> = if topology_changed {
            let mut all: BTreeSet<String> = self.groups_by_service.keys().cloned().collect();
            all.extend(dirty);
            for record in tx.find_where(RecordType::ConfigVersion, |_| true) {
                if let Some(service) = record.read().get_str("service_name") {
                    all.insert(service.to_string());
                }
            }
            all
        } else {
            dirty
        };

        let mut group_updates: Vec<(String, Fingerprint)> = Vec::new();
        let mut group_removals: Vec<String> = Vec::new();
        let mut group_index: Vec<(String, BTreeSet<String>)> = Vec::new();

        if !services.is_empty() {
            let derived = derive_groups(&tx, &services, cluster_hosts);
            for service in &services {
                let desired = derived.get(service.as_str());
                let desired_ids: BTreeSet<String> = desired
                    .map(|groups| groups.iter().map(|g| g.id.clone()).collect())
                    .unwrap_or_default();

                if let Some(existing) = self.groups_by_service.get(service) {
                    for stale in existing.difference(&desired_ids) {
                        tx.remove(RecordType::ConfigGroup, stale);
                        group_removals.push(stale.clone());
                    }
                }

                for group in desired.into_iter().flatten() {
                    let fingerprint = fingerprint_values(
                        GROUP_FINGERPRINT_FIELDS
                            .iter()
                            .map(|name| group.fields.get(*name)),
                    );
                    if self.groups_cache.get(&group.id) == Some(fingerprint) {
                        continue;
                    }
                    tx.upsert(RecordType::ConfigGroup, &group.id, group.fields.clone());
                    tx.replace_relation(
                        RecordType::ConfigGroup,
                        &group.id,
                        GROUP_HOSTS,
                        group.hosts.iter().cloned(),
                    )?;
                    group_updates.push((group.id.clone(), fingerprint));
                }
                group_index.push((service.clone(), desired_ids));
            }
        }

        report.events = tx.commit();

        if let Some(changes) = &changes {
            self.versions_cache.apply(changes);
            log_changes(changes);
        }
        for id in &group_removals {
            self.groups_cache.remove(id);
        }
        for (id, fingerprint) in group_updates {
            self.groups_cache.insert(id, fingerprint);
        }
        for (service, ids) in group_index {
            if ids.is_empty() {
                self.groups_by_service.remove(&service);
            } else {
                self.groups_by_service.insert(service, ids);
            }
        }
        if let Some(hosts) = next_hosts {
            self.cluster_hosts = hosts;
        }

        Ok(report)
    }
}

fn log_changes(changes: &ChangeSet<Identified>) {
    if changes.has_changes() {
        info!(
            "config versions: {} added, {} updated, {} removed",
            changes.added.len(),
            changes.updated.len(),
            changes.removed.len()
        );
    }
}

/// Groups of `services` derived from their current versions in one pass
/// over the stored versions.
///
/// A non-default group holds the hosts of its current version; the default
/// group holds the cluster hosts that are in no non-default group.
fn derive_groups<'a>(
    tx: &Transaction<'_>,
    services: &'a BTreeSet<String>,
    cluster_hosts: &BTreeSet<String>,
) -> HashMap<&'a str, Vec<DerivedGroup>> {
    let mut with_versions: BTreeSet<&'a str> = BTreeSet::new();
    let mut current: BTreeMap<(&'a str, i64), (String, BTreeSet<String>)> = BTreeMap::new();

    for record in tx.find_where(RecordType::ConfigVersion, |_| true) {
        let record = record.read();
        let Some(version) = record.as_config_version() else {
            continue;
        };
        let Some(service) = version.service_name().and_then(|name| services.get(name)) else {
            continue;
        };
        with_versions.insert(service.as_str());

        if version.is_default_group() || !version.is_current() {
            continue;
        }
        let group_id = version.group_id();
        let name = version
            .group_name()
            .map(str::to_string)
            .unwrap_or_else(|| group_id.to_string());
        let hosts = version.hosts().into_iter().collect();
        current.insert((service.as_str(), group_id), (name, hosts));
    }

    let mut derived: HashMap<&'a str, Vec<DerivedGroup>> = HashMap::new();
    for service in with_versions {
        let mut grouped: BTreeSet<String> = BTreeSet::new();
        let mut groups = Vec::new();

        let range = (service, i64::MIN)..=(service, i64::MAX);
        for ((_, group_id), (name, hosts)) in current.range(range) {
            grouped.extend(hosts.iter().cloned());
            groups.push(group(service, *group_id, name, false, hosts.clone()));
        }

        let default_hosts: BTreeSet<String> =
            cluster_hosts.difference(&grouped).cloned().collect();
        groups.push(group(
            service,
            DEFAULT_GROUP_ID,
            DEFAULT_GROUP_NAME,
            true,
            default_hosts,
        ));
        derived.insert(service, groups);
    }
    derived
}

fn group(
    service: &str,
    group_id: i64,
    name: &str,
    is_default: bool,
    hosts: BTreeSet<String>,
) -> DerivedGroup {
    let id = if is_default {
        format!("{}_default", service)
    } else {
        format!("{}_{}", service, group_id)
    };
    let fields: Fields = [
        ("service_name", json!(service)),
        ("group_id", json!(group_id)),
        ("group_name", json!(name)),
        ("is_default", json!(is_default)),
        ("hosts", json!(hosts.iter().collect::<Vec<_>>())),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    DerivedGroup { id, fields, hosts }
}

impl Mapper for ConfigVersionsMapper {
    fn name(&self) -> &'static str {
        "config_versions"
    }

    fn resources(&self) -> &[Resource] {
        &[Resource::ConfigVersions, Resource::ClusterHosts]
    }

    fn relations(&self) -> Vec<RelationDef> {
        vec![
            RelationDef::keyed(
                RecordType::Service,
                SERVICE_CONFIG_VERSIONS,
                RecordType::ConfigVersion,
            ),
            RelationDef::bidirectional(
                RecordType::ConfigGroup,
                GROUP_HOSTS,
                RecordType::Host,
                HOST_CONFIG_GROUPS,
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
        let slot = match resource {
            Resource::ConfigVersions => &mut self.versions_slot,
            _ => &mut self.topology_slot,
        };
        if slot.replace(snapshot.clone()).is_some() {
            debug!("{}: newer {} snapshot replaces the parked one", self.name(), resource);
        }

        match (self.versions_slot.take(), self.topology_slot.take()) {
            (Some(versions), Some(topology)) => self.flush(store, resource, &versions, &topology),
            (versions, topology) => {
                self.versions_slot = versions;
                self.topology_slot = topology;
                debug!(
                    "{}: waiting for {:?} before mapping",
                    self.name(),
                    self.pending()
                );
                Ok(MapReport::new(self.name(), resource, MapOutcome::Deferred))
            }
        }
    }
}
