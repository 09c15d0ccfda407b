// ambari-state/tests/reconciliation.rs

//! Store-level guarantees of the mappers: repeated polls are quiet, records
//! keep their identity, removals leave nothing behind.

use ambari_state::mappers::config_versions::SERVICE_CONFIG_VERSIONS;
use ambari_state::mappers::status::{HOST_HOST_COMPONENTS, SERVICE_HOST_COMPONENTS};
use ambari_state::mappers::{
    ConfigVersionsMapper, MapOutcome, MapReport, Mapper, RawSnapshot, StackMapper, StatusMapper,
};
use ambari_state::store::{ChangeEvent, RecordStore, RecordType};
use ambari_state::sync::Resource;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn host_component(component: &str, host: &str, state: &str) -> Value {
    json!({"HostRoles": {
        "component_name": component,
        "host_name": host,
        "state": state,
        "maintenance_state": "OFF"
    }})
}

fn datanodes(hosts: &[(&str, &str)]) -> RawSnapshot {
    let host_components: Vec<Value> = hosts
        .iter()
        .map(|(host, state)| host_component("DATANODE", host, state))
        .collect();
    RawSnapshot::from(json!({"items": [{
        "ServiceComponentInfo": {"service_name": "HDFS", "category": "SLAVE"},
        "host_components": host_components
    }]}))
}

fn setup() -> (StatusMapper, RecordStore, Arc<AtomicUsize>) {
    let mapper = StatusMapper::new().unwrap();
    let mut store = RecordStore::new();
    mapper.register(&mut store).unwrap();

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = notifications.clone();
    store.subscribe_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (mapper, store, notifications)
}

fn map(mapper: &mut StatusMapper, store: &mut RecordStore, snapshot: &RawSnapshot) -> MapReport {
    mapper
        .map(store, Resource::HostComponents, snapshot)
        .unwrap()
}

fn event(report: &MapReport, record_type: RecordType) -> &ChangeEvent {
    report
        .events
        .iter()
        .find(|event| event.record_type == record_type)
        .unwrap()
}

#[test]
fn added_and_removed_ids_are_classified() {
    let (mut mapper, mut store, _) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "INSTALLED")]));

    let report = map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("c", "STARTED")]));

    let components = event(&report, RecordType::HostComponent);
    assert_eq!(components.added, vec!["DATANODE_c"]);
    assert!(components.updated.is_empty());
    assert_eq!(components.removed, vec!["DATANODE_b"]);
    assert_eq!(
        store.ids(RecordType::HostComponent),
        vec!["DATANODE_a", "DATANODE_c"]
    );
}

#[test]
fn unchanged_snapshot_is_silent() {
    let (mut mapper, mut store, notifications) = setup();
    let snapshot = datanodes(&[("a", "STARTED")]);
    map(&mut mapper, &mut store, &snapshot);
    let after_first = notifications.load(Ordering::SeqCst);
    assert!(after_first > 0);

    let report = map(&mut mapper, &mut store, &snapshot);

    assert_eq!(report.outcome, MapOutcome::Applied);
    assert!(report.events.is_empty());
    assert_eq!(notifications.load(Ordering::SeqCst), after_first);
}

#[test]
fn records_keep_their_identity() {
    let (mut mapper, mut store, _) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "STARTED")]));
    let a = store.find(RecordType::HostComponent, "DATANODE_a").unwrap();
    let b = store.find(RecordType::HostComponent, "DATANODE_b").unwrap();

    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "INSTALLED")]));

    let a_after = store.find(RecordType::HostComponent, "DATANODE_a").unwrap();
    let b_after = store.find(RecordType::HostComponent, "DATANODE_b").unwrap();
    assert!(Arc::ptr_eq(&a, &a_after));
    assert!(Arc::ptr_eq(&b, &b_after));
    assert_eq!(b.read().get_str("state"), Some("INSTALLED"));
}

#[test]
fn removed_records_leave_no_links() {
    let (mut mapper, mut store, _) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "STARTED")]));
    assert!(store
        .relations()
        .references(RecordType::HostComponent, "DATANODE_b"));

    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED")]));

    assert!(store.find(RecordType::HostComponent, "DATANODE_b").is_none());
    assert!(!store
        .relations()
        .references(RecordType::HostComponent, "DATANODE_b"));
    assert_eq!(
        store.related(RecordType::Service, "HDFS", SERVICE_HOST_COMPONENTS),
        vec!["DATANODE_a"]
    );
    assert!(store
        .related(RecordType::Host, "b", HOST_HOST_COMPONENTS)
        .is_empty());
    assert_eq!(mapper.cache().ids(), vec!["DATANODE_a"]);
}

#[test]
fn missing_collection_keeps_the_store() {
    let (mut mapper, mut store, notifications) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "STARTED")]));
    let before = notifications.load(Ordering::SeqCst);

    let report = map(&mut mapper, &mut store, &RawSnapshot::from(json!({})));

    assert_eq!(report.outcome, MapOutcome::NoOp);
    assert_eq!(store.len(RecordType::HostComponent), 2);
    assert_eq!(notifications.load(Ordering::SeqCst), before);
}

#[test]
fn empty_collection_removes_everything() {
    let (mut mapper, mut store, _) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "STARTED")]));

    let report = map(&mut mapper, &mut store, &RawSnapshot::from(json!({"items": []})));

    let components = event(&report, RecordType::HostComponent);
    assert_eq!(components.removed, vec!["DATANODE_a", "DATANODE_b"]);
    assert!(store.is_empty(RecordType::HostComponent));
    assert!(store.find(RecordType::Service, "HDFS").is_none());
    assert_eq!(store.relations().link_count(), 0);
    assert!(mapper.cache().is_empty());
}

#[tokio::test]
async fn one_event_per_type_per_poll() {
    let (mut mapper, mut store, _) = setup();
    let mut receiver = store.subscribe();

    map(&mut mapper, &mut store, &datanodes(&[("a", "STARTED"), ("b", "STARTED"), ("c", "STARTED")]));

    let mut types = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        types.push(event.record_type);
    }
    types.sort();
    assert_eq!(
        types,
        vec![RecordType::Service, RecordType::Host, RecordType::HostComponent]
    );
}

#[test]
fn stack_repositories_follow_their_parents() {
    let mut mapper = StackMapper::new().unwrap();
    let mut store = RecordStore::new();
    mapper.register(&mut store).unwrap();

    let stack = |os_types: &[&str]| {
        let operating_systems: Vec<Value> = os_types
            .iter()
            .map(|os| {
                json!({
                    "OperatingSystems": {"os_type": os},
                    "repositories": [{"Repositories": {
                        "repo_id": "HDP-2.3",
                        "repo_name": "HDP",
                        "base_url": format!("http://repo/{}", os)
                    }}]
                })
            })
            .collect();
        RawSnapshot::from(json!({"items": [{
            "Versions": {"stack_name": "HDP", "stack_version": "2.3", "active": true},
            "operating_systems": operating_systems
        }]}))
    };

    mapper
        .map(&mut store, Resource::StackVersions, &stack(&["redhat6", "ubuntu12"]))
        .unwrap();
    assert_eq!(store.len(RecordType::Repository), 2);

    mapper
        .map(&mut store, Resource::StackVersions, &stack(&["redhat6"]))
        .unwrap();
    assert_eq!(store.ids(RecordType::OperatingSystem), vec!["HDP-2.3-redhat6"]);
    assert_eq!(
        store.ids(RecordType::Repository),
        vec!["HDP-2.3-redhat6-HDP-2.3"]
    );
    assert!(!store
        .relations()
        .references(RecordType::Repository, "HDP-2.3-ubuntu12-HDP-2.3"));
}

#[test]
fn item_with_null_state_keeps_the_known_record() {
    let (mut mapper, mut store, _) = setup();
    map(&mut mapper, &mut store, &datanodes(&[("h1", "STARTED"), ("h2", "STARTED")]));
    let held = store.find(RecordType::HostComponent, "DATANODE_h1").unwrap();

    let mut broken = datanodes(&[("h2", "STARTED")]).body().clone();
    let mut unknown = host_component("DATANODE", "h1", "STARTED");
    unknown["HostRoles"]["state"] = Value::Null;
    broken["items"][0]["host_components"]
        .as_array_mut()
        .unwrap()
        .push(unknown);
    let report = map(&mut mapper, &mut store, &RawSnapshot::from(broken));

    assert!(report.events.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        store.ids(RecordType::HostComponent),
        vec!["DATANODE_h1", "DATANODE_h2"]
    );
    assert_eq!(held.read().get_str("state"), Some("STARTED"));
    assert_eq!(
        store.related(RecordType::Service, "HDFS", SERVICE_HOST_COMPONENTS),
        vec!["DATANODE_h1", "DATANODE_h2"]
    );
    assert_eq!(mapper.cache().ids(), store.ids(RecordType::HostComponent));
}

#[test]
fn dropping_a_service_summary_keeps_its_config_versions() {
    let (mut status, mut store, _) = setup();
    let mut configs = ConfigVersionsMapper::new().unwrap();
    configs.register(&mut store).unwrap();

    let versions = RawSnapshot::from(json!({"items": [
        {"service_name": "HDFS", "service_config_version": 1, "is_current": true,
         "group_id": -1, "group_name": "Default", "hosts": []}
    ]}));
    let hosts = RawSnapshot::from(json!({"items": [{"Hosts": {"host_name": "a"}}]}));

    map(&mut status, &mut store, &datanodes(&[("a", "STARTED")]));
    configs
        .map(&mut store, Resource::ConfigVersions, &versions)
        .unwrap();
    configs.map(&mut store, Resource::ClusterHosts, &hosts).unwrap();
    assert_eq!(
        store.related(RecordType::Service, "HDFS", SERVICE_CONFIG_VERSIONS),
        vec!["HDFS_1"]
    );

    map(&mut status, &mut store, &RawSnapshot::from(json!({"items": []})));

    assert!(store.find(RecordType::Service, "HDFS").is_none());
    assert_eq!(
        store.related(RecordType::Service, "HDFS", SERVICE_CONFIG_VERSIONS),
        vec!["HDFS_1"]
    );

    // Nothing to repair on the next config poll.
    configs
        .map(&mut store, Resource::ConfigVersions, &versions)
        .unwrap();
    let report = configs.map(&mut store, Resource::ClusterHosts, &hosts).unwrap();
    assert!(report.events.is_empty());
}
