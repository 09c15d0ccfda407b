// ambari-state/src/config/model.rs

use crate::config::interval::PollInterval;
use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::sync::Resource;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the Ambari REST API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)] // Allows both string and object syntax
pub enum ServerConfig {
    /// Simple syntax: `server: "http://ambari:8080/api/v1"`
    SimpleUrl(String),

    /// Extended syntax with credentials and a request timeout
    Extended {
        url: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<PollInterval>,
    },
}

impl ServerConfig {
    pub fn url(&self) -> &str {
        match self {
            ServerConfig::SimpleUrl(url) => url,
            ServerConfig::Extended { url, .. } => url,
        }
    }

    /// Basic-auth user and password, if configured
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        match self {
            ServerConfig::SimpleUrl(_) => None,
            ServerConfig::Extended { user, password, .. } => user
                .as_deref()
                .map(|user| (user, password.as_deref())),
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ServerConfig::Extended {
                timeout: Some(timeout),
                ..
            } => timeout.as_duration(),
            _ => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRef {
    pub name: String,
    pub version: String,
}

/// Resources polled together on one timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollGroupConfig {
    pub name: String,
    pub interval: PollInterval,
    pub resources: Vec<Resource>,
}

/// Main configuration structure parsed from ambari-state.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    server: ServerConfig,
    cluster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    stack: Option<StackRef>,

    groups: Vec<PollGroupConfig>,
}

impl SyncConfig {
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn stack(&self) -> Option<&StackRef> {
        self.stack.as_ref()
    }

    pub fn groups(&self) -> &[PollGroupConfig] {
        &self.groups
    }

    /// Every resource polled by any group
    pub fn resources(&self) -> Vec<Resource> {
        self.groups
            .iter()
            .flat_map(|group| group.resources.iter().copied())
            .collect()
    }

    /// Values for the `{placeholder}`s of resource url templates
    pub fn url_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("clusterName".to_string(), self.cluster.clone());
        if let Some(stack) = &self.stack {
            vars.insert("stackName".to_string(), stack.name.clone());
            vars.insert("stackVersion".to_string(), stack.version.clone());
        }
        vars
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.server.url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("Server url must start with http:// or https://, got {:?}", url);
        }
        if self.cluster.trim().is_empty() {
            anyhow::bail!("Cluster name must not be empty");
        }
        if self.groups.is_empty() {
            anyhow::bail!("At least one poll group is required");
        }

        let mut names = HashSet::new();
        let mut polled = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                anyhow::bail!("Poll group {:?} is defined more than once", group.name);
            }
            if group.resources.is_empty() {
                anyhow::bail!("Poll group {:?} has no resources", group.name);
            }
            for resource in &group.resources {
                if !polled.insert(*resource) {
                    anyhow::bail!(
                        "Resource {} is polled by more than one group (again in {:?})",
                        resource,
                        group.name
                    );
                }
            }
        }

        if polled.contains(&Resource::StackVersions) && self.stack.is_none() {
            anyhow::bail!("Polling {} requires a `stack` section", Resource::StackVersions);
        }
        let versions = polled.contains(&Resource::ConfigVersions);
        let hosts = polled.contains(&Resource::ClusterHosts);
        if versions != hosts {
            anyhow::bail!(
                "{} and {} are mapped together and must both be polled",
                Resource::ConfigVersions,
                Resource::ClusterHosts
            );
        }
        Ok(())
    }
}

impl TryFrom<&Path> for SyncConfig {
    type Error = anyhow::Error;

    fn try_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs_err::read_to_string(path)
            .context(format!("Error reading {} to string.", path.display()))?;

        let config = serde_saphyr::from_str::<SyncConfig>(&content)
            .context(format!("Error parsing YAML file: {}", path.display()))?;

        config
            .validate()
            .context(format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }
}

impl TryFrom<&PathBuf> for SyncConfig {
    type Error = anyhow::Error;

    fn try_from(path: &PathBuf) -> anyhow::Result<Self> {
        Self::try_from(path.as_path())
    }
}
