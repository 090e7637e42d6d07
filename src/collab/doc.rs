//! Shared document — named key/value maps over a Loro CRDT.
//!
//! DESIGN
//! ======
//! Values are JSON, stored in the Loro map as JSON text so any shape fits
//! in a single last-writer-wins register. Merge semantics come entirely
//! from Loro: writes to different keys always survive, concurrent writes to
//! one key converge to the same winner on every peer.
//!
//! Every local write commits immediately. [`SharedDoc::take_update`] exports
//! the ops this peer has not yet handed to the transport. Importing a remote
//! update diffs each tracked map before and after, so observers see exactly
//! the keys that changed.
//!
//! Observers are channels: `observe` hands out a receiver, `unobserve` (or
//! dropping the receiver) ends the subscription.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{BTreeMap, BTreeSet};

use loro::{ExportMode, LoroDoc, ValueOrContainer, VersionVector};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::{CollabError, PeerId};

/// Where a map change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

/// One key of one map changed. `value` is `None` when the key was deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapChange {
    pub map: String,
    pub key: String,
    pub value: Option<Value>,
    pub origin: ChangeOrigin,
}

impl MapChange {
    fn new(map: &str, key: &str, value: Option<Value>, origin: ChangeOrigin) -> Self {
        Self { map: map.to_owned(), key: key.to_owned(), value, origin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

struct Observer {
    id: ObserverId,
    map: String,
    tx: mpsc::UnboundedSender<MapChange>,
}

pub struct SharedDoc {
    doc: LoroDoc,
    /// Version already handed out through `take_update`.
    synced: VersionVector,
    /// Maps whose keys are diffed on import.
    tracked: BTreeSet<String>,
    observers: Vec<Observer>,
    next_observer: u64,
}

impl std::fmt::Debug for SharedDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDoc")
            .field("peer_id", &self.doc.peer_id())
            .field("tracked", &self.tracked)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl SharedDoc {
    /// A fresh document writing as `peer_id`.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Doc` if Loro rejects the peer id.
    pub fn new(peer_id: PeerId) -> Result<Self, CollabError> {
        let doc = LoroDoc::new();
        doc.set_peer_id(peer_id).map_err(doc_err)?;
        let synced = doc.oplog_vv();
        Ok(Self { doc, synced, tracked: BTreeSet::new(), observers: Vec::new(), next_observer: 0 })
    }

    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.doc.peer_id()
    }

    /// Start diffing `map` on import without writing to it.
    pub fn track(&mut self, map: &str) {
        self.tracked.insert(map.to_owned());
    }

    // --- Values ---

    /// Write `value` under `key`. Returns `false` if the key already held it.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or Loro rejects the write.
    pub fn set_value(&mut self, map: &str, key: &str, value: &Value) -> Result<bool, CollabError> {
        self.tracked.insert(map.to_owned());
        if self.get_value(map, key).as_ref() == Some(value) {
            return Ok(false);
        }
        let text = serde_json::to_string(value)?;
        self.doc.get_map(map).insert(key, text.as_str()).map_err(doc_err)?;
        self.doc.commit();
        trace!(map, key, "shared value set");
        self.notify(&MapChange::new(map, key, Some(value.clone()), ChangeOrigin::Local));
        Ok(true)
    }

    #[must_use]
    pub fn get_value(&self, map: &str, key: &str) -> Option<Value> {
        self.doc.get_map(map).get(key).and_then(|voc| read_json(&voc))
    }

    /// Remove `key`. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Doc` if Loro rejects the delete.
    pub fn delete_value(&mut self, map: &str, key: &str) -> Result<bool, CollabError> {
        self.tracked.insert(map.to_owned());
        let handler = self.doc.get_map(map);
        if handler.get(key).is_none() {
            return Ok(false);
        }
        handler.delete(key).map_err(doc_err)?;
        self.doc.commit();
        trace!(map, key, "shared value deleted");
        self.notify(&MapChange::new(map, key, None, ChangeOrigin::Local));
        Ok(true)
    }

    /// Every readable entry of `map`, sorted by key.
    #[must_use]
    pub fn entries(&self, map: &str) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        self.doc.get_map(map).for_each(|key, voc| {
            if let Some(value) = read_json(&voc) {
                out.insert(key.to_owned(), value);
            }
        });
        out
    }

    // --- Sync ---

    /// Ops written locally since the last call, or `None` if there are none.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Doc` if the export fails.
    pub fn take_update(&mut self) -> Result<Option<Vec<u8>>, CollabError> {
        let current = self.doc.oplog_vv();
        if current == self.synced {
            return Ok(None);
        }
        let bytes = self.doc.export(ExportMode::updates(&self.synced)).map_err(doc_err)?;
        self.synced = current;
        Ok(Some(bytes))
    }

    /// Full document state for a peer that is catching up.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Doc` if the export fails.
    pub fn snapshot(&self) -> Result<Vec<u8>, CollabError> {
        self.doc.export(ExportMode::Snapshot).map_err(doc_err)
    }

    /// Merge a remote update or snapshot and report what changed in tracked maps.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Doc` if the bytes are not a valid Loro payload.
    pub fn import(&mut self, bytes: &[u8]) -> Result<Vec<MapChange>, CollabError> {
        let caught_up = self.doc.oplog_vv() == self.synced;
        let before: Vec<(String, BTreeMap<String, Value>)> =
            self.tracked.iter().map(|name| (name.clone(), self.entries(name))).collect();

        self.doc.import(bytes).map_err(doc_err)?;
        if caught_up {
            self.synced = self.doc.oplog_vv();
        }

        let mut changes = Vec::new();
        for (name, old) in before {
            let new = self.entries(&name);
            for (key, value) in &new {
                if old.get(key) != Some(value) {
                    changes.push(MapChange::new(&name, key, Some(value.clone()), ChangeOrigin::Remote));
                }
            }
            for key in old.keys().filter(|k| !new.contains_key(*k)) {
                changes.push(MapChange::new(&name, key, None, ChangeOrigin::Remote));
            }
        }
        debug!(bytes = bytes.len(), changes = changes.len(), "remote update imported");
        for change in &changes {
            self.notify(change);
        }
        Ok(changes)
    }

    // --- Observers ---

    /// Subscribe to local and remote changes of `map`.
    pub fn observe(&mut self, map: &str) -> (ObserverId, mpsc::UnboundedReceiver<MapChange>) {
        self.tracked.insert(map.to_owned());
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(Observer { id, map: map.to_owned(), tx });
        (id, rx)
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Drop every subscription (session teardown).
    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn notify(&mut self, change: &MapChange) {
        self.observers.retain(|o| o.map != change.map || o.tx.send(change.clone()).is_ok());
    }
}

fn read_json(voc: &ValueOrContainer) -> Option<Value> {
    let text = voc.as_value().and_then(|v| v.as_string()).map(|s| s.to_string())?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "ignoring non-JSON shared value");
            None
        }
    }
}

fn doc_err(e: impl std::fmt::Display) -> CollabError {
    CollabError::Doc(e.to_string())
}
