// ambari-state/src/fetch/fetcher.rs

use crate::error::FetchError;
use crate::fetch::descriptor::{FetchMode, ResourceDescriptor};
use crate::fetch::transport::Transport;
use crate::mappers::RawSnapshot;
use crate::sync::Resource;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A decoded response tagged with the poll generation that requested it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSnapshot {
    pub resource: Resource,
    pub generation: u64,
    pub mode: FetchMode,
    pub fetched_at: DateTime<Utc>,
    pub snapshot: RawSnapshot,
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: bool,
    issued: u64,
    accepted: u64,
}

/// Clears the in-flight flag when the request settles or is dropped.
struct InFlight<'a> {
    slots: &'a Mutex<HashMap<Resource, Slot>>,
    resource: Resource,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slots.lock().get_mut(&self.resource) {
            slot.in_flight = false;
        }
    }
}

/// Fetches resource snapshots, one request per resource at a time.
pub struct SnapshotFetcher {
    transport: Arc<dyn Transport>,
    vars: BTreeMap<String, String>,
    descriptors: HashMap<Resource, ResourceDescriptor>,
    slots: Mutex<HashMap<Resource, Slot>>,
}

impl SnapshotFetcher {
    /// `vars` fill the url template placeholders, see
    /// [`SyncConfig::url_vars`](crate::config::SyncConfig::url_vars).
    pub fn new(transport: Arc<dyn Transport>, vars: BTreeMap<String, String>) -> Self {
        let descriptors = Resource::all()
            .into_iter()
            .map(|resource| (resource, ResourceDescriptor::for_resource(resource)))
            .collect();
        Self {
            transport,
            vars,
            descriptors,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the descriptor used for `descriptor.resource`.
    pub fn with_descriptor(mut self, descriptor: ResourceDescriptor) -> Self {
        self.descriptors.insert(descriptor.resource, descriptor);
        self
    }

    pub fn descriptor(&self, resource: Resource) -> Option<&ResourceDescriptor> {
        self.descriptors.get(&resource)
    }

    pub fn is_in_flight(&self, resource: Resource) -> bool {
        self.slots
            .lock()
            .get(&resource)
            .map_or(false, |slot| slot.in_flight)
    }

    /// Generation of the most recently issued request for `resource`.
    pub fn latest_generation(&self, resource: Resource) -> u64 {
        self.slots.lock().get(&resource).map_or(0, |slot| slot.issued)
    }

    /// Request `resource` with the field list of `mode`.
    ///
    /// Returns `Ok(None)` without touching the transport when a request for
    /// the same resource is still outstanding.
    pub async fn fetch(
        &self,
        resource: Resource,
        mode: FetchMode,
    ) -> Result<Option<TaggedSnapshot>, FetchError> {
        let descriptor = self
            .descriptors
            .get(&resource)
            .ok_or(FetchError::UnknownResource(resource))?;
        let path = descriptor.render(&self.vars, mode)?;

        let (generation, _guard) = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(resource).or_default();
            if slot.in_flight {
                debug!("{} is still in flight, skipping this tick", resource);
                return Ok(None);
            }
            slot.in_flight = true;
            slot.issued += 1;
            let guard = InFlight {
                slots: &self.slots,
                resource,
            };
            (slot.issued, guard)
        };

        let body = self.transport.get_json(&path).await.map_err(|e| {
            warn!("Fetching {} failed: {}", resource, e);
            e
        })?;

        Ok(Some(TaggedSnapshot {
            resource,
            generation,
            mode,
            fetched_at: Utc::now(),
            snapshot: RawSnapshot::new(body),
        }))
    }

    /// Whether `snapshot` is still the newest result for its resource.
    ///
    /// Marks it accepted; older or repeated generations are rejected.
    pub fn accept(&self, snapshot: &TaggedSnapshot) -> bool {
        let mut slots = self.slots.lock();
        let slot = slots.entry(snapshot.resource).or_default();
        if snapshot.generation < slot.issued || snapshot.generation <= slot.accepted {
            debug!(
                "Discarding stale {} snapshot (generation {}, latest {})",
                snapshot.resource, snapshot.generation, slot.issued
            );
            return false;
        }
        slot.accepted = snapshot.generation;
        true
    }
}
