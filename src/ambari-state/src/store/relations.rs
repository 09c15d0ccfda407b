// ambari-state/src/store/relations.rs

use crate::error::StoreError;
use crate::store::record::RecordType;
use std::collections::{BTreeSet, HashMap, HashSet};

/// What the parent side of a relation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    /// A stored record. Its sets are purged when the record is removed.
    Record,
    /// A grouping key that need not exist as a record. Removing a record
    /// with the same key leaves the sets alone; a set goes away with its
    /// last child.
    Key,
}

/// Declaration of a has-many relation `parent.name -> [child ids]`.
///
/// When `inverse` is set the relation is bidirectional: every link is
/// mirrored as `child.inverse -> [parent ids]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub parent: RecordType,
    pub name: &'static str,
    pub child: RecordType,
    pub inverse: Option<&'static str>,
    pub parent_kind: ParentKind,
}

impl RelationDef {
    pub const fn has_many(parent: RecordType, name: &'static str, child: RecordType) -> Self {
        Self {
            parent,
            name,
            child,
            inverse: None,
            parent_kind: ParentKind::Record,
        }
    }

    /// Children grouped under a plain key, e.g. host components by service
    /// name. The sets outlive any record stored under the same key.
    pub const fn keyed(parent: RecordType, name: &'static str, child: RecordType) -> Self {
        Self {
            parent_kind: ParentKind::Key,
            ..Self::has_many(parent, name, child)
        }
    }

    pub const fn bidirectional(
        parent: RecordType,
        name: &'static str,
        child: RecordType,
        inverse: &'static str,
    ) -> Self {
        Self {
            inverse: Some(inverse),
            ..Self::has_many(parent, name, child)
        }
    }

    fn inverted(&self) -> Option<RelationDef> {
        self.inverse.map(|inverse| RelationDef {
            parent: self.child,
            name: inverse,
            child: self.parent,
            inverse: Some(self.name),
            parent_kind: ParentKind::Record,
        })
    }
}

/// Address of one has-many set in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    pub parent: RecordType,
    pub parent_id: String,
    pub name: &'static str,
}

type Node = (RecordType, String);

/// Id-based relationship index.
///
/// `forward` answers "which children belong to this parent", `reverse`
/// answers "which sets mention this child" so removing a record only touches
/// the sets that actually reference it. Parents are plain keys and need not
/// exist as records (a service name is enough to group host components).
#[derive(Debug, Default)]
pub struct RelationIndex {
    defs: HashMap<RecordType, Vec<RelationDef>>,
    forward: HashMap<RelationKey, BTreeSet<String>>,
    reverse: HashMap<Node, HashSet<RelationKey>>,
    owned: HashMap<Node, HashSet<&'static str>>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation (and its inverse, if bidirectional).
    ///
    /// Declaring the same relation twice is allowed; declaring a different
    /// shape under an existing name is not.
    pub fn declare(&mut self, def: RelationDef) -> Result<(), StoreError> {
        self.declare_one(def)?;
        if let Some(inverse) = def.inverted() {
            self.declare_one(inverse)?;
        }
        Ok(())
    }

    fn declare_one(&mut self, def: RelationDef) -> Result<(), StoreError> {
        let defs = self.defs.entry(def.parent).or_default();
        match defs.iter().find(|existing| existing.name == def.name) {
            Some(existing) if *existing == def => Ok(()),
            Some(_) => Err(StoreError::ConflictingRelation {
                record_type: def.parent,
                relation: def.name.to_string(),
            }),
            None => {
                defs.push(def);
                Ok(())
            }
        }
    }

    pub fn definition(&self, parent: RecordType, name: &str) -> Result<RelationDef, StoreError> {
        self.defs
            .get(&parent)
            .and_then(|defs| defs.iter().find(|def| def.name == name))
            .copied()
            .ok_or_else(|| StoreError::UnknownRelation {
                record_type: parent,
                relation: name.to_string(),
            })
    }

    /// Link `child_id` under `parent.name`. Returns true if the link is new.
    pub fn add(
        &mut self,
        parent: RecordType,
        parent_id: &str,
        name: &str,
        child_id: &str,
    ) -> Result<bool, StoreError> {
        let def = self.definition(parent, name)?;
        let added = self.link(&def, parent_id, child_id);
        if let Some(inverse) = def.inverted() {
            self.link(&inverse, child_id, parent_id);
        }
        Ok(added)
    }

    /// Unlink `child_id` from `parent.name`. Returns true if a link was removed.
    pub fn remove(
        &mut self,
        parent: RecordType,
        parent_id: &str,
        name: &str,
        child_id: &str,
    ) -> Result<bool, StoreError> {
        let def = self.definition(parent, name)?;
        let removed = self.unlink(&def, parent_id, child_id);
        if let Some(inverse) = def.inverted() {
            self.unlink(&inverse, child_id, parent_id);
        }
        Ok(removed)
    }

    /// Make `parent.name` contain exactly `children`. Returns the number of
    /// links added plus removed.
    pub fn replace(
        &mut self,
        parent: RecordType,
        parent_id: &str,
        name: &str,
        children: &BTreeSet<String>,
    ) -> Result<usize, StoreError> {
        let current: BTreeSet<String> = self
            .child_set(parent, parent_id, name)
            .cloned()
            .unwrap_or_default();

        let mut changes = 0;
        for stale in current.difference(children) {
            if self.remove(parent, parent_id, name, stale)? {
                changes += 1;
            }
        }
        for fresh in children.difference(&current) {
            if self.add(parent, parent_id, name, fresh)? {
                changes += 1;
            }
        }
        Ok(changes)
    }

    fn link(&mut self, def: &RelationDef, parent_id: &str, child_id: &str) -> bool {
        let key = RelationKey {
            parent: def.parent,
            parent_id: parent_id.to_string(),
            name: def.name,
        };
        let inserted = self
            .forward
            .entry(key.clone())
            .or_default()
            .insert(child_id.to_string());
        if inserted {
            self.reverse
                .entry((def.child, child_id.to_string()))
                .or_default()
                .insert(key);
            self.owned
                .entry((def.parent, parent_id.to_string()))
                .or_default()
                .insert(def.name);
        }
        inserted
    }

    fn unlink(&mut self, def: &RelationDef, parent_id: &str, child_id: &str) -> bool {
        let key = RelationKey {
            parent: def.parent,
            parent_id: parent_id.to_string(),
            name: def.name,
        };
        let Some(children) = self.forward.get_mut(&key) else {
            return false;
        };
        if !children.remove(child_id) {
            return false;
        }
        if children.is_empty() {
            self.drop_empty_set(&key);
        }

        let child_node = (def.child, child_id.to_string());
        if let Some(keys) = self.reverse.get_mut(&child_node) {
            keys.remove(&key);
            if keys.is_empty() {
                self.reverse.remove(&child_node);
            }
        }
        true
    }

    fn drop_empty_set(&mut self, key: &RelationKey) {
        self.forward.remove(key);
        let node = (key.parent, key.parent_id.clone());
        if let Some(names) = self.owned.get_mut(&node) {
            names.remove(key.name);
            if names.is_empty() {
                self.owned.remove(&node);
            }
        }
    }

    /// Drop every link that mentions `(record_type, id)` as a child, and the
    /// sets it owns as a parent record. Sets of [`ParentKind::Key`] relations
    /// stay. Returns the number of links removed.
    pub fn purge(&mut self, record_type: RecordType, id: &str) -> usize {
        let node = (record_type, id.to_string());
        let mut dropped = 0;

        if let Some(keys) = self.reverse.remove(&node) {
            for key in keys {
                if let Some(children) = self.forward.get_mut(&key) {
                    if children.remove(id) {
                        dropped += 1;
                    }
                    if children.is_empty() {
                        self.drop_empty_set(&key);
                    }
                }
            }
        }

        if let Some(names) = self.owned.remove(&node) {
            let mut keyed = HashSet::new();
            for name in names {
                let Ok(def) = self.definition(record_type, name) else {
                    continue;
                };
                if def.parent_kind == ParentKind::Key {
                    keyed.insert(name);
                    continue;
                }
                let key = RelationKey {
                    parent: record_type,
                    parent_id: id.to_string(),
                    name,
                };
                let Some(children) = self.forward.remove(&key) else {
                    continue;
                };
                for child in children {
                    dropped += 1;
                    let child_node = (def.child, child);
                    if let Some(keys) = self.reverse.get_mut(&child_node) {
                        keys.remove(&key);
                        if keys.is_empty() {
                            self.reverse.remove(&child_node);
                        }
                    }
                }
            }
            if !keyed.is_empty() {
                self.owned.insert(node, keyed);
            }
        }

        dropped
    }

    pub fn child_set(
        &self,
        parent: RecordType,
        parent_id: &str,
        name: &str,
    ) -> Option<&BTreeSet<String>> {
        let def = self.definition(parent, name).ok()?;
        self.forward.get(&RelationKey {
            parent,
            parent_id: parent_id.to_string(),
            name: def.name,
        })
    }

    /// Sorted child ids of `parent.name`.
    pub fn children(&self, parent: RecordType, parent_id: &str, name: &str) -> Vec<String> {
        self.child_set(parent, parent_id, name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every set that currently contains `(child, child_id)`.
    pub fn parents_of(&self, child: RecordType, child_id: &str) -> Vec<RelationKey> {
        let mut keys: Vec<RelationKey> = self
            .reverse
            .get(&(child, child_id.to_string()))
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Whether any set mentions `(record_type, id)` on either side.
    pub fn references(&self, record_type: RecordType, id: &str) -> bool {
        let node = (record_type, id.to_string());
        self.reverse.contains_key(&node) || self.owned.contains_key(&node)
    }

    pub fn link_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    /// Forget all links but keep the declarations.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.owned.clear();
    }
}
