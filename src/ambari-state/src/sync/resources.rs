// ambari-state/src/sync/resources.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A REST collection polled on a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    HostComponents, // host-component status, grouped by component
    ConfigVersions, // service config versions
    ClusterHosts,   // cluster topology, joined with config versions
    StackVersions,  // stack versions with their OS repositories
}

impl Resource {
    pub fn all() -> [Resource; 4] {
        [
            Resource::HostComponents,
            Resource::ConfigVersions,
            Resource::ClusterHosts,
            Resource::StackVersions,
        ]
    }

    /// Identifier used in configuration files and on the command line
    pub fn state_key(&self) -> &'static str {
        match self {
            Resource::HostComponents => "host_components",
            Resource::ConfigVersions => "config_versions",
            Resource::ClusterHosts => "cluster_hosts",
            Resource::StackVersions => "stack_versions",
        }
    }

    /// Path below the API root, with `{placeholder}`s filled per cluster
    pub fn url_template(&self) -> &'static str {
        match self {
            Resource::HostComponents => "/clusters/{clusterName}/components",
            Resource::ConfigVersions => {
                "/clusters/{clusterName}/configurations/service_config_versions"
            }
            Resource::ClusterHosts => "/clusters/{clusterName}/hosts",
            Resource::StackVersions => "/stacks/{stackName}/versions",
        }
    }

    /// Field list of the first, complete query
    pub fn full_fields(&self) -> Vec<&'static str> {
        match self {
            Resource::HostComponents => vec![
                "ServiceComponentInfo/service_name",
                "ServiceComponentInfo/category",
                "host_components/HostRoles/state",
                "host_components/HostRoles/desired_state",
                "host_components/HostRoles/maintenance_state",
                "host_components/HostRoles/stale_configs",
                "host_components/HostRoles/ha_state",
                "host_components/metrics/hbase/master/IsActiveMaster",
            ],
            Resource::ConfigVersions => vec![
                "service_config_version",
                "user",
                "hosts",
                "group_id",
                "group_name",
                "is_current",
                "createtime",
                "service_name",
                "service_config_version_note",
            ],
            Resource::ClusterHosts => vec!["Hosts/host_name"],
            Resource::StackVersions => vec!["Versions", "operating_systems/repositories/Repositories"],
        }
    }

    /// Field list of later, cheaper queries
    ///
    /// Falls back to the full list where there is nothing to trim.
    pub fn update_fields(&self) -> Vec<&'static str> {
        match self {
            Resource::HostComponents => vec![
                "ServiceComponentInfo/service_name",
                "ServiceComponentInfo/category",
                "host_components/HostRoles/state",
                "host_components/HostRoles/maintenance_state",
                "host_components/HostRoles/ha_state",
                "host_components/metrics/hbase/master/IsActiveMaster",
            ],
            other => other.full_fields(),
        }
    }

    /// Whether the server should be asked for a minimal response envelope
    pub fn minimal_response(&self) -> bool {
        matches!(self, Resource::HostComponents | Resource::ClusterHosts)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_key())
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::all()
            .into_iter()
            .find(|resource| resource.state_key() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Resource::all().iter().map(Resource::state_key).collect();
                anyhow::anyhow!("Unknown resource {:?}, expected one of: {}", s, known.join(", "))
            })
    }
}
