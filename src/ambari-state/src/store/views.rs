// ambari-state/src/store/views.rs

//! Typed read access to records of one family.
//!
//! Records keep a flat field map so every mapper can share one arena, but
//! consumers should not have to know the field names. Each view borrows a
//! [`Record`] of the matching type and exposes its attributes by name.

use crate::constants::DEFAULT_GROUP_ID;
use crate::store::record::{Record, RecordType};

/// Component category whose members do not decide a service's state.
const CLIENT_CATEGORY: &str = "CLIENT";

pub struct HostComponentView<'a>(&'a Record);

impl<'a> HostComponentView<'a> {
    pub fn id(&self) -> &'a str {
        self.0.id()
    }

    pub fn component_name(&self) -> Option<&'a str> {
        self.0.get_str("component_name")
    }

    pub fn host_name(&self) -> Option<&'a str> {
        self.0.get_str("host_name")
    }

    pub fn service_name(&self) -> Option<&'a str> {
        self.0.get_str("service_name")
    }

    pub fn state(&self) -> Option<&'a str> {
        self.0.get_str("state")
    }

    pub fn is_started(&self) -> bool {
        self.state() == Some("STARTED")
    }

    pub fn is_installed(&self) -> bool {
        self.state() == Some("INSTALLED")
    }

    pub fn is_client(&self) -> bool {
        self.0.get_str("category") == Some(CLIENT_CATEGORY)
    }

    pub fn in_maintenance(&self) -> bool {
        self.0.get_str("maintenance_state") == Some("ON")
    }

    /// HA role label, e.g. "Active NameNode".
    pub fn display_name_advanced(&self) -> Option<&'a str> {
        self.0.get_str("display_name_advanced")
    }
}

/// Summary of one service, recomputed from its host components.
pub struct ServiceView<'a>(&'a Record);

impl<'a> ServiceView<'a> {
    pub fn service_name(&self) -> &'a str {
        self.0.id()
    }

    pub fn total_count(&self) -> u64 {
        self.count("total_count")
    }

    pub fn started_count(&self) -> u64 {
        self.count("started_count")
    }

    pub fn installed_count(&self) -> u64 {
        self.count("installed_count")
    }

    pub fn maintenance_count(&self) -> u64 {
        self.count("maintenance_count")
    }

    pub fn work_status(&self) -> Option<&'a str> {
        self.0.get_str("work_status")
    }

    pub fn active_name_node_id(&self) -> Option<&'a str> {
        self.0.get_str("active_name_node_id")
    }

    /// Up to two standby NameNodes, in id order.
    pub fn standby_name_node_ids(&self) -> Vec<&'a str> {
        ["standby_name_node_id", "standby_name_node2_id"]
            .iter()
            .filter_map(|field| self.0.get_str(field))
            .collect()
    }

    pub fn active_resource_manager_id(&self) -> Option<&'a str> {
        self.0.get_str("active_resource_manager_id")
    }

    pub fn standby_resource_manager_id(&self) -> Option<&'a str> {
        self.0.get_str("standby_resource_manager_id")
    }

    fn count(&self, field: &str) -> u64 {
        self.0
            .get(field)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

pub struct ConfigVersionView<'a>(&'a Record);

impl<'a> ConfigVersionView<'a> {
    pub fn service_name(&self) -> Option<&'a str> {
        self.0.get_str("service_name")
    }

    pub fn version(&self) -> Option<i64> {
        self.0.get_i64("version")
    }

    /// Missing group ids belong to the default group.
    pub fn group_id(&self) -> i64 {
        self.0.get_i64("group_id").unwrap_or(DEFAULT_GROUP_ID)
    }

    pub fn group_name(&self) -> Option<&'a str> {
        self.0.get_str("group_name")
    }

    pub fn is_default_group(&self) -> bool {
        self.group_id() == DEFAULT_GROUP_ID
    }

    pub fn is_current(&self) -> bool {
        self.0.get_bool("is_current") == Some(true)
    }

    pub fn hosts(&self) -> Vec<String> {
        self.0.get_str_list("hosts")
    }
}

pub struct ConfigGroupView<'a>(&'a Record);

impl<'a> ConfigGroupView<'a> {
    pub fn service_name(&self) -> Option<&'a str> {
        self.0.get_str("service_name")
    }

    pub fn group_id(&self) -> i64 {
        self.0.get_i64("group_id").unwrap_or(DEFAULT_GROUP_ID)
    }

    pub fn group_name(&self) -> Option<&'a str> {
        self.0.get_str("group_name")
    }

    pub fn is_default(&self) -> bool {
        self.0.get_bool("is_default") == Some(true)
    }

    pub fn hosts(&self) -> Vec<String> {
        self.0.get_str_list("hosts")
    }
}

pub struct RepositoryView<'a>(&'a Record);

impl<'a> RepositoryView<'a> {
    pub fn repo_id(&self) -> Option<&'a str> {
        self.0.get_str("repo_id")
    }

    pub fn os_type(&self) -> Option<&'a str> {
        self.0.get_str("os_type")
    }

    pub fn base_url(&self) -> Option<&'a str> {
        self.0.get_str("base_url")
    }

    pub fn latest_base_url(&self) -> Option<&'a str> {
        self.0.get_str("latest_base_url")
    }
}

impl Record {
    fn view<'a, V>(&'a self, record_type: RecordType, wrap: fn(&'a Record) -> V) -> Option<V> {
        (self.record_type() == record_type).then(|| wrap(self))
    }

    pub fn as_host_component(&self) -> Option<HostComponentView<'_>> {
        self.view(RecordType::HostComponent, HostComponentView)
    }

    pub fn as_service(&self) -> Option<ServiceView<'_>> {
        self.view(RecordType::Service, ServiceView)
    }

    pub fn as_config_version(&self) -> Option<ConfigVersionView<'_>> {
        self.view(RecordType::ConfigVersion, ConfigVersionView)
    }

    pub fn as_config_group(&self) -> Option<ConfigGroupView<'_>> {
        self.view(RecordType::ConfigGroup, ConfigGroupView)
    }

    pub fn as_repository(&self) -> Option<RepositoryView<'_>> {
        self.view(RecordType::Repository, RepositoryView)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Fields;
    use serde_json::{json, Value};

    fn record(record_type: RecordType, id: &str, pairs: &[(&str, Value)]) -> Record {
        let fields: Fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Record::new(record_type, id.to_string(), fields)
    }

    #[test]
    fn test_view_requires_matching_type() {
        let record = record(RecordType::Service, "HDFS", &[]);
        assert!(record.as_service().is_some());
        assert!(record.as_host_component().is_none());
        assert!(record.as_config_version().is_none());
    }

    #[test]
    fn test_host_component_view() {
        let record = record(
            RecordType::HostComponent,
            "HDFS_CLIENT_h2",
            &[
                ("component_name", json!("HDFS_CLIENT")),
                ("state", json!("INSTALLED")),
                ("category", json!("CLIENT")),
                ("maintenance_state", json!("ON")),
            ],
        );
        let view = record.as_host_component().unwrap();

        assert_eq!(view.id(), "HDFS_CLIENT_h2");
        assert!(view.is_client());
        assert!(view.is_installed());
        assert!(!view.is_started());
        assert!(view.in_maintenance());
        assert_eq!(view.host_name(), None);
    }

    #[test]
    fn test_service_view_defaults() {
        let record = record(
            RecordType::Service,
            "HDFS",
            &[
                ("total_count", json!(4)),
                ("standby_name_node_id", json!("NAMENODE_h2")),
                ("standby_name_node2_id", Value::Null),
            ],
        );
        let view = record.as_service().unwrap();

        assert_eq!(view.service_name(), "HDFS");
        assert_eq!(view.total_count(), 4);
        assert_eq!(view.started_count(), 0);
        assert_eq!(view.active_name_node_id(), None);
        assert_eq!(view.standby_name_node_ids(), vec!["NAMENODE_h2"]);
    }

    #[test]
    fn test_config_version_without_group_is_default() {
        let record = record(
            RecordType::ConfigVersion,
            "HDFS_2",
            &[("version", json!(2)), ("is_current", json!(true))],
        );
        let view = record.as_config_version().unwrap();

        assert!(view.is_default_group());
        assert!(view.is_current());
        assert_eq!(view.version(), Some(2));
        assert!(view.hosts().is_empty());
    }
}
