// ambari-state/src/store/record_store.rs

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::error::StoreError;
use crate::store::events::ChangeEvent;
use crate::store::record::{Fields, Record, RecordRef, RecordType};
use crate::store::relations::{RelationDef, RelationIndex};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::broadcast;

pub type Shared<T> = Arc<Mutex<T>>;

/// The store as handed to mappers, the scheduler and consumers.
pub type SharedStore = Shared<RecordStore>;

pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// In-memory arena of typed, id-keyed records plus their relation index.
///
/// All mutations go through a [`Transaction`]; reads are available directly.
/// Records are handed out as [`RecordRef`] and are never replaced for an
/// existing id, only mutated in place.
pub struct RecordStore {
    tables: HashMap<RecordType, HashMap<String, RecordRef>>,
    relations: RelationIndex,
    events: broadcast::Sender<ChangeEvent>,
    listeners: Vec<ChangeListener>,
    next_batch: u64,
    torn_down: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tables: HashMap::new(),
            relations: RelationIndex::new(),
            events,
            listeners: Vec::new(),
            next_batch: 0,
            torn_down: false,
        }
    }

    /// Construct a store ready to be shared between mappers and consumers.
    pub fn create() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Drop every record, link and listener. Later transactions fail.
    pub fn teardown(&mut self) {
        debug!(
            "Tearing down record store ({} records)",
            self.tables.values().map(HashMap::len).sum::<usize>()
        );
        self.tables.clear();
        self.relations.clear();
        self.listeners.clear();
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn declare_relation(&mut self, def: RelationDef) -> Result<(), StoreError> {
        self.relations.declare(def)
    }

    /// Open a batch of mutations. Change events are published when the
    /// transaction is committed (or dropped).
    pub fn transaction(&mut self) -> Result<Transaction<'_>, StoreError> {
        if self.torn_down {
            return Err(StoreError::TornDown);
        }
        self.next_batch += 1;
        let batch = self.next_batch;
        Ok(Transaction {
            store: self,
            batch,
            pending: BTreeMap::new(),
            committed: false,
        })
    }

    pub fn find(&self, record_type: RecordType, id: &str) -> Option<RecordRef> {
        self.tables
            .get(&record_type)
            .and_then(|table| table.get(id))
            .cloned()
    }

    /// Records of one type matching `predicate`, ordered by id.
    pub fn find_where<F>(&self, record_type: RecordType, predicate: F) -> Vec<RecordRef>
    where
        F: Fn(&Record) -> bool,
    {
        let Some(table) = self.tables.get(&record_type) else {
            return Vec::new();
        };
        let mut matches: Vec<(&String, &RecordRef)> = table
            .iter()
            .filter(|(_, record)| predicate(&record.read()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches
            .into_iter()
            .map(|(_, record)| Arc::clone(record))
            .collect()
    }

    /// Child ids of `record_type[key].relation`, sorted.
    pub fn related(&self, record_type: RecordType, key: &str, relation: &str) -> Vec<String> {
        self.relations.children(record_type, key, relation)
    }

    /// Child records of `record_type[key].relation`.
    pub fn related_records(
        &self,
        record_type: RecordType,
        key: &str,
        relation: &str,
    ) -> Result<Vec<RecordRef>, StoreError> {
        let def = self.relations.definition(record_type, relation)?;
        Ok(self
            .relations
            .children(record_type, key, relation)
            .iter()
            .filter_map(|id| self.find(def.child, id))
            .collect())
    }

    pub fn relations(&self) -> &RelationIndex {
        &self.relations
    }

    pub fn len(&self, record_type: RecordType) -> usize {
        self.tables.get(&record_type).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, record_type: RecordType) -> bool {
        self.len(record_type) == 0
    }

    /// Sorted ids of every record of one type.
    pub fn ids(&self, record_type: RecordType) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tables
            .get(&record_type)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Register a synchronous listener, called with the store lock held.
    pub fn subscribe_fn<F>(&mut self, listener: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn publish(&self, events: &[ChangeEvent]) {
        for event in events {
            debug!("batch {} {}", event.batch, event.summary());
            for listener in &self.listeners {
                listener(event);
            }
            // No receivers is not an error: nobody is listening yet.
            let _ = self.events.send(event.clone());
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A batch of store mutations that publishes one event per touched type.
pub struct Transaction<'a> {
    store: &'a mut RecordStore,
    batch: u64,
    pending: BTreeMap<RecordType, ChangeEvent>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn batch(&self) -> u64 {
        self.batch
    }

    fn event(&mut self, record_type: RecordType) -> &mut ChangeEvent {
        let batch = self.batch;
        self.pending
            .entry(record_type)
            .or_insert_with(|| ChangeEvent::new(record_type, batch))
    }

    /// Create the record, or merge `fields` into the existing one in place.
    ///
    /// The returned handle is the same `Arc` for the lifetime of the id.
    pub fn upsert(&mut self, record_type: RecordType, id: &str, fields: Fields) -> RecordRef {
        match self.store.find(record_type, id) {
            Some(record) => {
                let changed = record.write().merge(fields);
                if changed {
                    self.event(record_type).updated.push(id.to_string());
                }
                record
            }
            None => {
                let record = Arc::new(RwLock::new(Record::new(
                    record_type,
                    id.to_string(),
                    fields,
                )));
                self.store
                    .tables
                    .entry(record_type)
                    .or_default()
                    .insert(id.to_string(), Arc::clone(&record));
                self.event(record_type).added.push(id.to_string());
                record
            }
        }
    }

    /// Delete a record and every relation link that mentions it.
    pub fn remove(&mut self, record_type: RecordType, id: &str) -> bool {
        let removed = self
            .store
            .tables
            .get_mut(&record_type)
            .and_then(|table| table.remove(id))
            .is_some();
        let dropped = self.store.relations.purge(record_type, id);

        if removed || dropped > 0 {
            let event = self.event(record_type);
            if removed {
                event.removed.push(id.to_string());
            }
            event.relations_changed += dropped;
        }
        removed
    }

    pub fn add_to_relation(
        &mut self,
        record_type: RecordType,
        id: &str,
        relation: &str,
        child_id: &str,
    ) -> Result<bool, StoreError> {
        let added = self
            .store
            .relations
            .add(record_type, id, relation, child_id)?;
        if added {
            self.event(record_type).relations_changed += 1;
        }
        Ok(added)
    }

    pub fn remove_from_relation(
        &mut self,
        record_type: RecordType,
        id: &str,
        relation: &str,
        child_id: &str,
    ) -> Result<bool, StoreError> {
        let removed = self
            .store
            .relations
            .remove(record_type, id, relation, child_id)?;
        if removed {
            self.event(record_type).relations_changed += 1;
        }
        Ok(removed)
    }

    /// Make `record_type[id].relation` hold exactly `children`.
    pub fn replace_relation<I, S>(
        &mut self,
        record_type: RecordType,
        id: &str,
        relation: &str,
        children: I,
    ) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children = children.into_iter().map(Into::into).collect();
        let changes = self
            .store
            .relations
            .replace(record_type, id, relation, &children)?;
        if changes > 0 {
            self.event(record_type).relations_changed += changes;
        }
        Ok(changes)
    }

    /// Publish the batch and return the events that were emitted.
    pub fn commit(mut self) -> Vec<ChangeEvent> {
        self.committed = true;
        self.flush()
    }

    fn flush(&mut self) -> Vec<ChangeEvent> {
        let events: Vec<ChangeEvent> = std::mem::take(&mut self.pending)
            .into_values()
            .map(normalize)
            .filter(|event| !event.is_empty())
            .collect();
        self.store.publish(&events);
        events
    }
}

impl Deref for Transaction<'_> {
    type Target = RecordStore;

    fn deref(&self) -> &RecordStore {
        self.store
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let events = self.flush();
            if !events.is_empty() {
                warn!(
                    "Transaction {} dropped without commit; published {} events",
                    self.batch,
                    events.len()
                );
            }
        }
    }
}

/// A record created and then updated within one batch is only "added"; one
/// created and removed again is reported as neither.
fn normalize(mut event: ChangeEvent) -> ChangeEvent {
    let removed: HashSet<String> = event.removed.iter().cloned().collect();
    let added_then_removed: HashSet<String> = event
        .added
        .iter()
        .filter(|id| removed.contains(*id))
        .cloned()
        .collect();

    event.added.retain(|id| !added_then_removed.contains(id));
    event.removed.retain(|id| !added_then_removed.contains(id));

    let added: HashSet<&String> = event.added.iter().collect();
    let mut seen = HashSet::new();
    let updated = event
        .updated
        .iter()
        .filter(|id| !added.contains(id) && !removed.contains(*id) && seen.insert(*id))
        .cloned()
        .collect();
    event.updated = updated;
    event
}
