// ambari-state/src/mappers/status.rs

use crate::config::schema::{FieldMap, FieldSpec, IdTemplate, Identified, RecordSchema};
use crate::error::{MapError, MissingField};
use crate::mappers::snapshot::DEFAULT_COLLECTION_KEY;
use crate::mappers::{
    apply_records, check_relations, check_schema, collection_key, expect_resource,
    skipped_warnings, MapOutcome, MapReport, Mapper, RawSnapshot,
};
use crate::store::{Fields, RecordStore, RecordType, RelationDef, Transaction};
use crate::sync::{ChangeDetector, FingerprintCache, Resource};
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

pub const SERVICE_HOST_COMPONENTS: &str = "host_components";
pub const HOST_HOST_COMPONENTS: &str = "host_components";

const DISPLAY_NAME: &str = "display_name_advanced";

const ACTIVE_NAMENODE: &str = "Active NameNode";
const STANDBY_NAMENODE: &str = "Standby NameNode";
const ACTIVE_HBASE_MASTER: &str = "Active HBase Master";
const STANDBY_HBASE_MASTER: &str = "Standby HBase Master";
const ACTIVE_RESOURCEMANAGER: &str = "Active ResourceManager";
const STANDBY_RESOURCEMANAGER: &str = "Standby ResourceManager";

/// Store fields the summaries and HA labels are computed from.
const NEEDED_FIELDS: [&str; 4] = ["component_name", "host_name", "service_name", "state"];

const NAME_NODE_FIELDS: [&str; 3] = [
    "active_name_node_id",
    "standby_name_node_id",
    "standby_name_node2_id",
];
const RESOURCE_MANAGER_FIELDS: [&str; 2] =
    ["active_resource_manager_id", "standby_resource_manager_id"];

/// Maps the per-component status query onto `HostComponent` records and
/// keeps a `Service` summary record per service.
pub struct StatusMapper {
    schema: RecordSchema,
    collection: String,
    cache: FingerprintCache,
    detector: ChangeDetector,
}

impl StatusMapper {
    pub fn new() -> Result<Self, MapError> {
        Ok(Self {
            schema: Self::default_schema()?,
            collection: DEFAULT_COLLECTION_KEY.to_string(),
            cache: FingerprintCache::new(),
            detector: ChangeDetector::new(),
        })
    }

    pub fn default_schema() -> Result<RecordSchema, MapError> {
        let fields = FieldMap::new(vec![
            FieldSpec::required("component_name", "HostRoles.component_name"),
            FieldSpec::required("host_name", "HostRoles.host_name"),
            FieldSpec::required("service_name", "ServiceComponentInfo.service_name"),
            FieldSpec::required("state", "HostRoles.state").fingerprinted(),
            FieldSpec::optional("maintenance_state", "HostRoles.maintenance_state")
                .fingerprinted(),
            FieldSpec::optional("desired_state", "HostRoles.desired_state"),
            FieldSpec::optional("stale_configs", "HostRoles.stale_configs"),
            FieldSpec::optional("ha_state", "HostRoles.ha_state"),
            FieldSpec::optional("category", "ServiceComponentInfo.category"),
            FieldSpec::optional("is_active_master", "metrics.hbase.master.IsActiveMaster"),
        ])?;
        Ok(RecordSchema::new(
            RecordType::HostComponent,
            fields,
            IdTemplate::new(&["component_name", "host_name"], "_"),
        )?)
    }

    /// Map host components with `schema` instead of the default one.
    pub fn with_schema(mut self, schema: RecordSchema) -> Result<Self, MapError> {
        check_schema(self.name(), &schema, RecordType::HostComponent, &NEEDED_FIELDS)?;
        self.schema = schema;
        Ok(self)
    }

    /// Read components from `key` instead of `items`.
    pub fn with_collection(mut self, key: &str) -> Result<Self, MapError> {
        self.collection = collection_key(key)?;
        Ok(self)
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    /// One synthetic item per host component, carrying its component's info.
    fn flatten(components: &[Value]) -> Vec<Value> {
        let mut flat = Vec::new();
        for component in components {
            let info = component
                .get("ServiceComponentInfo")
                .cloned()
                .unwrap_or(Value::Null);
            let Some(host_components) = component.get("host_components").and_then(Value::as_array)
            else {
                continue;
            };
            for host_component in host_components {
                let mut item = Map::new();
                item.insert("ServiceComponentInfo".to_string(), info.clone());
                if let Some(roles) = host_component.get("HostRoles") {
                    item.insert("HostRoles".to_string(), roles.clone());
                }
                if let Some(metrics) = host_component.get("metrics") {
                    item.insert("metrics".to_string(), metrics.clone());
                }
                flat.push(Value::Object(item));
            }
        }
        flat
    }

    fn identify(&self, item: &Value, layout: HaLayout) -> Result<Identified, MissingField> {
        let mut identified = self.schema.identify(item)?;
        let display = display_name_advanced(&identified.fields, layout)
            .map(Value::from)
            .unwrap_or(Value::Null);
        identified.fields.insert(DISPLAY_NAME.to_string(), display);
        identified.fingerprint = self
            .schema
            .field_map()
            .fingerprint_with(&identified.fields, &[DISPLAY_NAME]);
        Ok(identified)
    }
}

/// Cluster-wide facts that decide how HA masters are labelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HaLayout {
    /// More than one ResourceManager is deployed.
    rm_ha: bool,
    /// A SecondaryNameNode is deployed, so NameNodes are not an HA pair.
    secondary_namenode: bool,
}

impl HaLayout {
    fn of(items: &[Value], schema: &RecordSchema) -> Self {
        let Some(spec) = schema.field_map().spec("component_name") else {
            return Self::default();
        };
        let mut resource_managers = 0;
        let mut layout = Self::default();
        for item in items {
            match spec.resolve(item).and_then(Value::as_str) {
                Some("RESOURCEMANAGER") => resource_managers += 1,
                Some("SECONDARY_NAMENODE") => layout.secondary_namenode = true,
                _ => {}
            }
        }
        layout.rm_ha = resource_managers > 1;
        layout
    }
}

/// HA role label shown instead of the plain component name.
fn display_name_advanced(fields: &Fields, layout: HaLayout) -> Option<&'static str> {
    let component = fields.get("component_name").and_then(Value::as_str)?;
    let state = fields.get("state").and_then(Value::as_str);
    let ha_state = fields.get("ha_state").and_then(Value::as_str);

    match component {
        "NAMENODE" if !layout.secondary_namenode => match ha_state {
            Some("ACTIVE") => Some(ACTIVE_NAMENODE),
            Some("STANDBY") => Some(STANDBY_NAMENODE),
            _ => None,
        },
        "HBASE_MASTER" if state == Some("STARTED") => {
            let active = match fields.get("is_active_master") {
                Some(Value::Bool(active)) => *active,
                Some(Value::String(active)) => active == "true",
                _ => false,
            };
            Some(if active {
                ACTIVE_HBASE_MASTER
            } else {
                STANDBY_HBASE_MASTER
            })
        }
        "RESOURCEMANAGER" if layout.rm_ha && state == Some("STARTED") => match ha_state {
            Some("ACTIVE") => Some(ACTIVE_RESOURCEMANAGER),
            Some("STANDBY") => Some(STANDBY_RESOURCEMANAGER),
            _ => None,
        },
        _ => None,
    }
}

/// Ids of the labelled HA masters among a service's host components.
#[derive(Debug, Default)]
struct Masters {
    has_namenode: bool,
    has_resource_manager: bool,
    active_namenode: Option<String>,
    standby_namenodes: Vec<String>,
    active_resource_manager: Option<String>,
    standby_resource_manager: Option<String>,
}

impl Masters {
    /// Write the id fields of each master kind the service has, or had.
    /// Absent ids are written as `null` so a failover clears the old value.
    fn write(self, fields: &mut Fields, previous: Option<&Fields>) {
        let had = |field: &str| previous.is_some_and(|prev| prev.contains_key(field));

        if self.has_namenode || NAME_NODE_FIELDS.iter().any(|&field| had(field)) {
            let mut standby = self.standby_namenodes.into_iter();
            let values = [self.active_namenode, standby.next(), standby.next()];
            for (field, value) in NAME_NODE_FIELDS.iter().zip(values) {
                fields.insert(field.to_string(), json!(value));
            }
        }
        if self.has_resource_manager || RESOURCE_MANAGER_FIELDS.iter().any(|&field| had(field)) {
            let values = [self.active_resource_manager, self.standby_resource_manager];
            for (field, value) in RESOURCE_MANAGER_FIELDS.iter().zip(values) {
                fields.insert(field.to_string(), json!(value));
            }
        }
    }
}

/// Recompute the summary record of one service from its host components.
fn refresh_service(tx: &mut Transaction<'_>, service: &str) -> Result<(), MapError> {
    let members = tx.related_records(RecordType::Service, service, SERVICE_HOST_COMPONENTS)?;
    if members.is_empty() {
        if tx.find(RecordType::Service, service).is_some() {
            debug!("Service {} has no host components left", service);
            tx.remove(RecordType::Service, service);
        }
        return Ok(());
    }

    let (mut started, mut installed, mut maintenance) = (0usize, 0usize, 0usize);
    let mut all_masters_started = true;
    let mut masters = Masters::default();
    for member in &members {
        let record = member.read();
        let Some(component) = record.as_host_component() else {
            continue;
        };
        if component.is_started() {
            started += 1;
        } else if component.is_installed() {
            installed += 1;
        }
        if component.in_maintenance() {
            maintenance += 1;
        }
        if !component.is_client() && !component.is_started() {
            all_masters_started = false;
        }

        match component.component_name() {
            Some("NAMENODE") => masters.has_namenode = true,
            Some("RESOURCEMANAGER") => masters.has_resource_manager = true,
            _ => {}
        }
        let id = component.id().to_string();
        match component.display_name_advanced() {
            Some(ACTIVE_NAMENODE) => masters.active_namenode = Some(id),
            Some(STANDBY_NAMENODE) => masters.standby_namenodes.push(id),
            Some(ACTIVE_RESOURCEMANAGER) => masters.active_resource_manager = Some(id),
            Some(STANDBY_RESOURCEMANAGER) => masters.standby_resource_manager = Some(id),
            _ => {}
        }
    }

    let work_status = if all_masters_started { "STARTED" } else { "INSTALLED" };
    let mut fields: Fields = [
        ("service_name", json!(service)),
        ("total_count", json!(members.len())),
        ("started_count", json!(started)),
        ("installed_count", json!(installed)),
        ("maintenance_count", json!(maintenance)),
        ("work_status", json!(work_status)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let previous = tx.find(RecordType::Service, service).map(|record| {
        let record = record.read();
        record.fields().clone()
    });
    masters.write(&mut fields, previous.as_ref());
    tx.upsert(RecordType::Service, service, fields);
    Ok(())
}

impl Mapper for StatusMapper {
    fn name(&self) -> &'static str {
        "status"
    }

    fn resources(&self) -> &[Resource] {
        &[Resource::HostComponents]
    }

    fn relations(&self) -> Vec<RelationDef> {
        vec![
            RelationDef::keyed(
                RecordType::Service,
                SERVICE_HOST_COMPONENTS,
                RecordType::HostComponent,
            ),
            RelationDef::keyed(
                RecordType::Host,
                HOST_HOST_COMPONENTS,
                RecordType::HostComponent,
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
        let Some(components) = snapshot.collection(&self.collection)? else {
            debug!("{}: no `{}` in snapshot, nothing to do", self.name(), self.collection);
            return Ok(MapReport::new(self.name(), resource, MapOutcome::NoOp));
        };

        let flat = Self::flatten(components);
        let layout = HaLayout::of(&flat, &self.schema);

        let changes = self.detector.detect_changes(
            RecordType::HostComponent,
            &self.cache,
            flat.iter(),
            |item| self.identify(item, layout),
        );

        let mut report = MapReport::new(self.name(), resource, MapOutcome::Applied);
        report.warnings = skipped_warnings(&changes);
        if !changes.has_changes() {
            return Ok(report);
        }

        let mut tx = store.transaction()?;
        let mut dirty: BTreeSet<String> = BTreeSet::new();

        for change in changes.added.iter().chain(changes.updated.iter()) {
            if let Some(service) = change.fields.get("service_name").and_then(Value::as_str) {
                dirty.insert(service.to_string());
            }
        }
        for id in &changes.removed {
            if let Some(record) = tx.find(RecordType::HostComponent, id) {
                let record = record.read();
                if let Some(service) = record.as_host_component().and_then(|c| c.service_name()) {
                    dirty.insert(service.to_string());
                }
            }
        }

        apply_records(&mut tx, &changes);

        for change in &changes.added {
            let service = change.fields.get("service_name").and_then(Value::as_str);
            let host = change.fields.get("host_name").and_then(Value::as_str);
            if let (Some(service), Some(host)) = (service, host) {
                tx.add_to_relation(
                    RecordType::Service,
                    service,
                    SERVICE_HOST_COMPONENTS,
                    &change.id,
                )?;
                tx.add_to_relation(RecordType::Host, host, HOST_HOST_COMPONENTS, &change.id)?;
            }
        }

        for service in &dirty {
            refresh_service(&mut tx, service)?;
        }

        report.events = tx.commit();
        self.cache.apply(&changes);

        info!(
            "{}: {} host components added, {} updated, {} removed",
            self.name(),
            changes.added.len(),
            changes.updated.len(),
            changes.removed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldMapError;
    use std::sync::Arc;

    fn host_role(component: &str, host: &str, state: &str) -> Value {
        json!({"HostRoles": {
            "component_name": component,
            "host_name": host,
            "state": state,
            "maintenance_state": "OFF"
        }})
    }

    fn snapshot(components: Vec<(&str, &str, Vec<Value>)>) -> RawSnapshot {
        let items: Vec<Value> = components
            .into_iter()
            .map(|(service, category, host_components)| {
                json!({
                    "ServiceComponentInfo": {"service_name": service, "category": category},
                    "host_components": host_components
                })
            })
            .collect();
        RawSnapshot::from(json!({ "items": items }))
    }

    fn setup() -> (StatusMapper, RecordStore) {
        let mapper = StatusMapper::new().unwrap();
        let mut store = RecordStore::new();
        mapper.register(&mut store).unwrap();
        (mapper, store)
    }

    fn hdfs(datanode_state: &str) -> RawSnapshot {
        snapshot(vec![
            ("HDFS", "MASTER", vec![host_role("NAMENODE", "h1", "STARTED")]),
            (
                "HDFS",
                "SLAVE",
                vec![
                    host_role("DATANODE", "h1", datanode_state),
                    host_role("DATANODE", "h2", "STARTED"),
                ],
            ),
            ("HDFS", "CLIENT", vec![host_role("HDFS_CLIENT", "h2", "INSTALLED")]),
        ])
    }

    #[test]
    fn test_first_poll_creates_records_and_relations() {
        let (mut mapper, mut store) = setup();
        let report = mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();

        assert_eq!(report.outcome, MapOutcome::Applied);
        assert_eq!(store.len(RecordType::HostComponent), 4);
        assert_eq!(
            store.related(RecordType::Service, "HDFS", SERVICE_HOST_COMPONENTS),
            vec!["DATANODE_h1", "DATANODE_h2", "HDFS_CLIENT_h2", "NAMENODE_h1"]
        );
        assert_eq!(
            store.related(RecordType::Host, "h1", HOST_HOST_COMPONENTS),
            vec!["DATANODE_h1", "NAMENODE_h1"]
        );

        let service = store.find(RecordType::Service, "HDFS").unwrap();
        let service = service.read();
        assert_eq!(service.get_i64("total_count"), Some(4));
        assert_eq!(service.get_i64("started_count"), Some(3));
        assert_eq!(service.get_i64("installed_count"), Some(1));
        assert_eq!(service.get_str("work_status"), Some("STARTED"));
    }

    #[test]
    fn test_same_snapshot_twice_is_idempotent() {
        let (mut mapper, mut store) = setup();
        let mut rx = store.subscribe();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();
        while rx.try_recv().is_ok() {}

        let before = store.find(RecordType::HostComponent, "DATANODE_h1").unwrap();
        let report = mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();
        let after = store.find(RecordType::HostComponent, "DATANODE_h1").unwrap();

        assert!(report.events.is_empty());
        assert!(rx.try_recv().is_err());
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.read().revision(), 0);
    }

    #[test]
    fn test_state_change_updates_in_place_and_refreshes_service() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();
        let held = store.find(RecordType::HostComponent, "DATANODE_h1").unwrap();

        let report = mapper
            .map(&mut store, Resource::HostComponents, &hdfs("INSTALLED"))
            .unwrap();

        assert_eq!(held.read().get_str("state"), Some("INSTALLED"));
        let types: Vec<RecordType> = report.events.iter().map(|e| e.record_type).collect();
        assert_eq!(types, vec![RecordType::Service, RecordType::HostComponent]);
        assert_eq!(report.events[1].updated, vec!["DATANODE_h1"]);

        let service = store.find(RecordType::Service, "HDFS").unwrap();
        assert_eq!(service.read().get_str("work_status"), Some("INSTALLED"));
    }

    #[test]
    fn test_irrelevant_field_change_is_ignored() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();

        let mut stale = host_role("DATANODE", "h1", "STARTED");
        stale["HostRoles"]["stale_configs"] = json!(true);
        let changed = snapshot(vec![
            ("HDFS", "MASTER", vec![host_role("NAMENODE", "h1", "STARTED")]),
            (
                "HDFS",
                "SLAVE",
                vec![stale, host_role("DATANODE", "h2", "STARTED")],
            ),
            ("HDFS", "CLIENT", vec![host_role("HDFS_CLIENT", "h2", "INSTALLED")]),
        ]);
        let report = mapper
            .map(&mut store, Resource::HostComponents, &changed)
            .unwrap();

        assert!(report.events.is_empty());
    }

    #[test]
    fn test_removed_component_is_purged_everywhere() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();

        let smaller = snapshot(vec![
            ("HDFS", "MASTER", vec![host_role("NAMENODE", "h1", "STARTED")]),
            ("HDFS", "SLAVE", vec![host_role("DATANODE", "h1", "STARTED")]),
            ("HDFS", "CLIENT", vec![host_role("HDFS_CLIENT", "h2", "INSTALLED")]),
        ]);
        mapper
            .map(&mut store, Resource::HostComponents, &smaller)
            .unwrap();

        assert!(store.find(RecordType::HostComponent, "DATANODE_h2").is_none());
        assert!(!store
            .relations()
            .references(RecordType::HostComponent, "DATANODE_h2"));
        assert_eq!(mapper.cache().ids(), store.ids(RecordType::HostComponent));
        let service = store.find(RecordType::Service, "HDFS").unwrap();
        assert_eq!(service.read().get_i64("total_count"), Some(3));
    }

    #[test]
    fn test_missing_items_is_noop_and_empty_items_clears() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();

        let report = mapper
            .map(&mut store, Resource::HostComponents, &RawSnapshot::from(json!({})))
            .unwrap();
        assert_eq!(report.outcome, MapOutcome::NoOp);
        assert_eq!(store.len(RecordType::HostComponent), 4);

        mapper
            .map(
                &mut store,
                Resource::HostComponents,
                &RawSnapshot::from(json!({"items": []})),
            )
            .unwrap();
        assert_eq!(store.len(RecordType::HostComponent), 0);
        assert_eq!(store.len(RecordType::Service), 0);
        assert_eq!(store.relations().link_count(), 0);
        assert!(mapper.cache().is_empty());
    }

    #[test]
    fn test_malformed_item_is_skipped() {
        let (mut mapper, mut store) = setup();
        let broken = snapshot(vec![(
            "HDFS",
            "SLAVE",
            vec![
                host_role("DATANODE", "h1", "STARTED"),
                json!({"HostRoles": {"component_name": "DATANODE", "state": "STARTED"}}),
            ],
        )]);

        let report = mapper
            .map(&mut store, Resource::HostComponents, &broken)
            .unwrap();

        assert_eq!(store.ids(RecordType::HostComponent), vec!["DATANODE_h1"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("host_name"));
    }

    #[test]
    fn test_ha_display_names() {
        let (mut mapper, mut store) = setup();
        let mut nn1 = host_role("NAMENODE", "h1", "STARTED");
        nn1["HostRoles"]["ha_state"] = json!("ACTIVE");
        let mut nn2 = host_role("NAMENODE", "h2", "STARTED");
        nn2["HostRoles"]["ha_state"] = json!("STANDBY");
        let mut master = host_role("HBASE_MASTER", "h3", "STARTED");
        master["metrics"] = json!({"hbase": {"master": {"IsActiveMaster": "true"}}});
        let mut rm = host_role("RESOURCEMANAGER", "h1", "STARTED");
        rm["HostRoles"]["ha_state"] = json!("ACTIVE");

        let payload = snapshot(vec![
            ("HDFS", "MASTER", vec![nn1, nn2]),
            ("HBASE", "MASTER", vec![master]),
            ("YARN", "MASTER", vec![rm]),
        ]);
        mapper
            .map(&mut store, Resource::HostComponents, &payload)
            .unwrap();

        let display = |id: &str| {
            let record = store.find(RecordType::HostComponent, id)?;
            let record = record.read();
            record.get_str(DISPLAY_NAME).map(str::to_string)
        };
        assert_eq!(display("NAMENODE_h1").as_deref(), Some("Active NameNode"));
        assert_eq!(display("NAMENODE_h2").as_deref(), Some("Standby NameNode"));
        assert_eq!(display("HBASE_MASTER_h3").as_deref(), Some("Active HBase Master"));
        // A single ResourceManager is not an HA pair.
        assert_eq!(display("RESOURCEMANAGER_h1"), None);
    }

    #[test]
    fn test_ha_failover_is_an_update() {
        let (mut mapper, mut store) = setup();
        let pair = |first: &str, second: &str| {
            let mut a = host_role("NAMENODE", "h1", "STARTED");
            a["HostRoles"]["ha_state"] = json!(first);
            let mut b = host_role("NAMENODE", "h2", "STARTED");
            b["HostRoles"]["ha_state"] = json!(second);
            snapshot(vec![("HDFS", "MASTER", vec![a, b])])
        };

        mapper
            .map(&mut store, Resource::HostComponents, &pair("ACTIVE", "STANDBY"))
            .unwrap();
        let report = mapper
            .map(&mut store, Resource::HostComponents, &pair("STANDBY", "ACTIVE"))
            .unwrap();

        let updated = &report
            .events
            .iter()
            .find(|e| e.record_type == RecordType::HostComponent)
            .unwrap()
            .updated;
        assert_eq!(updated, &vec!["NAMENODE_h1", "NAMENODE_h2"]);
    }

    #[test]
    fn test_wrong_resource_is_rejected() {
        let (mut mapper, mut store) = setup();
        let result = mapper.map(&mut store, Resource::StackVersions, &hdfs("STARTED"));
        assert!(matches!(result, Err(MapError::UnexpectedResource { .. })));
    }

    fn ha_pair(component: &str, first: &str, second: &str) -> Vec<Value> {
        let mut a = host_role(component, "h1", "STARTED");
        a["HostRoles"]["ha_state"] = json!(first);
        let mut b = host_role(component, "h2", "STARTED");
        b["HostRoles"]["ha_state"] = json!(second);
        vec![a, b]
    }

    #[test]
    fn test_secondary_namenode_disables_namenode_labels() {
        let (mut mapper, mut store) = setup();
        let payload = snapshot(vec![
            ("HDFS", "MASTER", ha_pair("NAMENODE", "ACTIVE", "STANDBY")),
            (
                "HDFS",
                "MASTER",
                vec![host_role("SECONDARY_NAMENODE", "h3", "STARTED")],
            ),
        ]);
        mapper
            .map(&mut store, Resource::HostComponents, &payload)
            .unwrap();

        let namenode = store.find(RecordType::HostComponent, "NAMENODE_h1").unwrap();
        assert_eq!(namenode.read().get_str(DISPLAY_NAME), None);

        let service = store.find(RecordType::Service, "HDFS").unwrap();
        let service = service.read();
        let view = service.as_service().unwrap();
        assert_eq!(view.active_name_node_id(), None);
        assert!(view.standby_name_node_ids().is_empty());
    }

    #[test]
    fn test_service_summary_names_ha_masters() {
        let (mut mapper, mut store) = setup();
        let payload = snapshot(vec![
            ("HDFS", "MASTER", ha_pair("NAMENODE", "STANDBY", "ACTIVE")),
            ("YARN", "MASTER", ha_pair("RESOURCEMANAGER", "ACTIVE", "STANDBY")),
        ]);
        mapper
            .map(&mut store, Resource::HostComponents, &payload)
            .unwrap();

        let hdfs = store.find(RecordType::Service, "HDFS").unwrap();
        let hdfs = hdfs.read();
        let hdfs = hdfs.as_service().unwrap();
        assert_eq!(hdfs.active_name_node_id(), Some("NAMENODE_h2"));
        assert_eq!(hdfs.standby_name_node_ids(), vec!["NAMENODE_h1"]);
        assert_eq!(hdfs.active_resource_manager_id(), None);

        let yarn = store.find(RecordType::Service, "YARN").unwrap();
        let yarn = yarn.read();
        assert_eq!(yarn.get_str("active_resource_manager_id"), Some("RESOURCEMANAGER_h1"));
        assert_eq!(yarn.get_str("standby_resource_manager_id"), Some("RESOURCEMANAGER_h2"));
        assert!(!yarn.fields().contains_key("active_name_node_id"));
    }

    #[test]
    fn test_stopped_master_clears_its_id() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(
                &mut store,
                Resource::HostComponents,
                &snapshot(vec![("YARN", "MASTER", ha_pair("RESOURCEMANAGER", "ACTIVE", "STANDBY"))]),
            )
            .unwrap();

        let mut stopped = ha_pair("RESOURCEMANAGER", "ACTIVE", "STANDBY");
        stopped[1]["HostRoles"]["state"] = json!("INSTALLED");
        mapper
            .map(
                &mut store,
                Resource::HostComponents,
                &snapshot(vec![("YARN", "MASTER", stopped)]),
            )
            .unwrap();

        let yarn = store.find(RecordType::Service, "YARN").unwrap();
        let yarn = yarn.read();
        assert_eq!(yarn.get_str("active_resource_manager_id"), Some("RESOURCEMANAGER_h1"));
        assert_eq!(yarn.get("standby_resource_manager_id"), Some(&Value::Null));
    }

    #[test]
    fn test_null_state_keeps_known_component() {
        let (mut mapper, mut store) = setup();
        mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();

        let mut unknown = host_role("DATANODE", "h1", "STARTED");
        unknown["HostRoles"]["state"] = Value::Null;
        let payload = snapshot(vec![
            ("HDFS", "MASTER", vec![host_role("NAMENODE", "h1", "STARTED")]),
            (
                "HDFS",
                "SLAVE",
                vec![unknown, host_role("DATANODE", "h2", "STARTED")],
            ),
            ("HDFS", "CLIENT", vec![host_role("HDFS_CLIENT", "h2", "INSTALLED")]),
        ]);
        let report = mapper
            .map(&mut store, Resource::HostComponents, &payload)
            .unwrap();

        assert!(report.events.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(store.find(RecordType::HostComponent, "DATANODE_h1").is_some());
        assert_eq!(mapper.cache().ids(), store.ids(RecordType::HostComponent));
    }

    #[test]
    fn test_renamed_collection_key() {
        let mut mapper = StatusMapper::new()
            .unwrap()
            .with_collection("host_components_v2")
            .unwrap();
        let mut store = RecordStore::new();
        mapper.register(&mut store).unwrap();

        let items = hdfs("STARTED").body()["items"].clone();
        let renamed = RawSnapshot::from(json!({ "host_components_v2": items }));
        mapper
            .map(&mut store, Resource::HostComponents, &renamed)
            .unwrap();
        assert_eq!(store.len(RecordType::HostComponent), 4);

        let report = mapper
            .map(&mut store, Resource::HostComponents, &hdfs("STARTED"))
            .unwrap();
        assert_eq!(report.outcome, MapOutcome::NoOp);
        assert_eq!(store.len(RecordType::HostComponent), 4);
    }

    #[test]
    fn test_blank_collection_key_is_rejected() {
        let result = StatusMapper::new().unwrap().with_collection("");
        assert!(matches!(result, Err(MapError::EmptyCollectionKey)));
    }

    #[test]
    fn test_renamed_field_path() {
        let fields = FieldMap::new(vec![
            FieldSpec::required("component_name", "HostRoles.component_name"),
            FieldSpec::required("host_name", "HostRoles.public_host_name"),
            FieldSpec::required("service_name", "ServiceComponentInfo.service_name"),
            FieldSpec::required("state", "HostRoles.state").fingerprinted(),
        ])
        .unwrap();
        let schema = RecordSchema::new(
            RecordType::HostComponent,
            fields,
            IdTemplate::new(&["component_name", "host_name"], "_"),
        )
        .unwrap();
        let mut mapper = StatusMapper::new().unwrap().with_schema(schema).unwrap();
        let mut store = RecordStore::new();
        mapper.register(&mut store).unwrap();

        let mut datanode = host_role("DATANODE", "ignored", "STARTED");
        datanode["HostRoles"]["public_host_name"] = json!("h9.example.com");
        mapper
            .map(
                &mut store,
                Resource::HostComponents,
                &snapshot(vec![("HDFS", "SLAVE", vec![datanode])]),
            )
            .unwrap();

        assert_eq!(
            store.ids(RecordType::HostComponent),
            vec!["DATANODE_h9.example.com"]
        );
    }

    #[test]
    fn test_schema_must_fit_host_components() {
        let wrong_type = RecordSchema::new(
            RecordType::Repository,
            FieldMap::new(vec![FieldSpec::required("repo_id", "Repositories.repo_id")]).unwrap(),
            IdTemplate::new(&["repo_id"], "_"),
        )
        .unwrap();
        let result = StatusMapper::new().unwrap().with_schema(wrong_type);
        assert!(matches!(
            result,
            Err(MapError::UnexpectedRecordType {
                record_type: RecordType::Repository,
                ..
            })
        ));

        let optional_state = RecordSchema::new(
            RecordType::HostComponent,
            FieldMap::new(vec![
                FieldSpec::required("component_name", "HostRoles.component_name"),
                FieldSpec::required("host_name", "HostRoles.host_name"),
                FieldSpec::required("service_name", "ServiceComponentInfo.service_name"),
                FieldSpec::optional("state", "HostRoles.state"),
            ])
            .unwrap(),
            IdTemplate::new(&["component_name", "host_name"], "_"),
        )
        .unwrap();
        let result = StatusMapper::new().unwrap().with_schema(optional_state);
        assert!(matches!(
            result,
            Err(MapError::Schema(FieldMapError::MissingRequiredField { .. }))
        ));
    }
}
