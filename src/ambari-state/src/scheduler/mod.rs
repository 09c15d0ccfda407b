// ambari-state/src/scheduler/mod.rs

//! Timer-driven poll groups.
//!
//! Each configured group runs on its own task: fetch every resource of the
//! group concurrently, map the results in declaration order, publish a
//! [`PollEvent`], then sleep for the group interval. The sleep starts only
//! after the whole cycle resolved, so cycles of one group never overlap.

use crate::config::PollGroupConfig;
use crate::constants::POLL_EVENT_CAPACITY;
use crate::error::{PollError, StoreError};
use crate::fetch::{FetchMode, SnapshotFetcher, TaggedSnapshot};
use crate::mappers::Mapper;
use crate::store::{Shared, SharedStore};
use crate::sync::Resource;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub type SharedMapper = Shared<Box<dyn Mapper>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    /// Resources that failed; the others of the cycle were still applied.
    Failure { errors: Vec<(Resource, PollError)> },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success)
    }
}

/// Published after every cycle: the data of `group` is as fresh as it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    pub group: String,
    pub generation: u64,
    pub mode: FetchMode,
    pub outcome: CycleOutcome,
    pub finished_at: DateTime<Utc>,
}

pub struct Scheduler {
    store: SharedStore,
    fetcher: SnapshotFetcher,
    groups: Vec<PollGroupConfig>,
    mappers: BTreeMap<Resource, SharedMapper>,
    events: broadcast::Sender<PollEvent>,
    states: HashMap<String, watch::Sender<PollState>>,
    generations: Mutex<HashMap<String, u64>>,
    stop: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(store: SharedStore, fetcher: SnapshotFetcher, groups: Vec<PollGroupConfig>) -> Self {
        let (events, _) = broadcast::channel(POLL_EVENT_CAPACITY);
        let (stop, _) = watch::channel(false);
        let states = groups
            .iter()
            .map(|group| (group.name.clone(), watch::channel(PollState::Idle).0))
            .collect();
        Self {
            store,
            fetcher,
            groups,
            mappers: BTreeMap::new(),
            events,
            states,
            generations: Mutex::new(HashMap::new()),
            stop,
        }
    }

    /// Declare the mapper's relations and route its resources to it.
    pub fn register(&mut self, mapper: Box<dyn Mapper>) -> Result<(), StoreError> {
        mapper.register(&mut self.store.lock())?;
        let resources = mapper.resources().to_vec();
        let shared: SharedMapper = Arc::new(Mutex::new(mapper));
        for resource in resources {
            debug!("Routing {} to {}", resource, shared.lock().name());
            self.mappers.insert(resource, shared.clone());
        }
        Ok(())
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn fetcher(&self) -> &SnapshotFetcher {
        &self.fetcher
    }

    pub fn groups(&self) -> &[PollGroupConfig] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&PollGroupConfig> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn mapper(&self, resource: Resource) -> Option<&SharedMapper> {
        self.mappers.get(&resource)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    /// Current state of a group, `None` for unknown names.
    pub fn state(&self, group: &str) -> Option<watch::Receiver<PollState>> {
        self.states.get(group).map(watch::Sender::subscribe)
    }

    /// Poll every resource of `group` once.
    pub async fn run_cycle(&self, group: &PollGroupConfig, mode: FetchMode) -> PollEvent {
        self.set_state(&group.name, PollState::Polling);
        let generation = {
            let mut generations = self.generations.lock();
            let counter = generations.entry(group.name.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        debug!("Poll group {:?} cycle {} ({})", group.name, generation, mode);

        let results = join_all(
            group
                .resources
                .iter()
                .map(|resource| self.fetcher.fetch(*resource, mode)),
        )
        .await;

        let mut errors = Vec::new();
        for (resource, result) in group.resources.iter().copied().zip(results) {
            let outcome = match result {
                Ok(Some(tagged)) => self.apply(&tagged),
                Ok(None) => Ok(()),
                Err(e) => Err(PollError::Fetch(e)),
            };
            if let Err(e) = outcome {
                warn!("Poll group {:?}: {} failed: {}", group.name, resource, e);
                errors.push((resource, e));
            }
        }

        let outcome = if errors.is_empty() {
            CycleOutcome::Success
        } else {
            CycleOutcome::Failure { errors }
        };
        let event = PollEvent {
            group: group.name.clone(),
            generation,
            mode,
            outcome,
            finished_at: Utc::now(),
        };

        self.set_state(&group.name, PollState::Idle);
        // No receivers is fine.
        let _ = self.events.send(event.clone());
        event
    }

    fn apply(&self, tagged: &TaggedSnapshot) -> Result<(), PollError> {
        if !self.fetcher.accept(tagged) {
            return Ok(());
        }
        let mapper = self
            .mappers
            .get(&tagged.resource)
            .ok_or(PollError::NoMapper(tagged.resource))?;

        let mut mapper = mapper.lock();
        let report = {
            let mut store = self.store.lock();
            mapper.map(&mut store, tagged.resource, &tagged.snapshot)?
        };

        for warning in &report.warnings {
            warn!("{}: {}", report.mapper, warning);
        }
        if report.has_changes() {
            info!("{}", report.summary());
        } else {
            debug!("{}", report.summary());
        }
        Ok(())
    }

    fn set_state(&self, group: &str, state: PollState) {
        if let Some(sender) = self.states.get(group) {
            sender.send_replace(state);
        }
    }

    /// Start one polling task per group.
    ///
    /// A group polls with full field lists until its first successful
    /// cycle and with update field lists afterwards.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.groups
            .iter()
            .cloned()
            .map(|group| {
                let scheduler = Arc::clone(self);
                let mut stop = self.stop.subscribe();
                tokio::spawn(async move {
                    info!(
                        "Polling {:?} every {} ({} resources)",
                        group.name,
                        group.interval,
                        group.resources.len()
                    );
                    let mut mode = FetchMode::Full;
                    loop {
                        if *stop.borrow() {
                            break;
                        }
                        let event = scheduler.run_cycle(&group, mode).await;
                        if event.outcome.is_success() {
                            mode = FetchMode::Update;
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(group.interval.as_duration()) => {}
                            _ = stop.changed() => break,
                        }
                    }
                    debug!("Poll group {:?} stopped", group.name);
                })
            })
            .collect()
    }

    /// Ask every spawned group task to stop after its current cycle.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }
}
