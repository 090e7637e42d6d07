//! Collaboration session — one shared document and awareness channel for
//! one dashboard, bound to a transport room.
//!
//! DESIGN
//! ======
//! Connecting joins the room named by the session id, then broadcasts a
//! sync request and the local awareness state. Every peer answers a sync
//! request with a full snapshot and its own awareness, so a newcomer
//! converges after one round trip.
//!
//! Writes through [`SharedMap`] commit to the local document and are
//! broadcast immediately. Incoming messages are applied by
//! [`CollabSession::pump`] (non-blocking) or [`CollabSession::recv`]
//! (waits for the next message).
//!
//! Teardown runs exactly once, on [`CollabSession::close`] or on drop:
//! announce departure, drop observers, leave the room.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use rand::Rng;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::awareness::{Awareness, AwarenessState, UserInfo};
use super::doc::{MapChange, ObserverId, SharedDoc};
use super::transport::{Envelope, SyncMessage, Transport};
use super::{CollabError, PeerId};
use crate::presence::{PresenceDirectory, Users};

pub struct CollabSession {
    session_id: String,
    peer_id: PeerId,
    doc: SharedDoc,
    awareness: Awareness,
    presence: PresenceDirectory,
    transport: Arc<dyn Transport>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    closed: bool,
}

impl std::fmt::Debug for CollabSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabSession")
            .field("session_id", &self.session_id)
            .field("peer_id", &self.peer_id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl CollabSession {
    /// Join `session_id` under a random peer id, announcing `user`.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Unavailable` if the transport cannot be joined.
    pub fn connect(session_id: &str, transport: Arc<dyn Transport>, user: UserInfo) -> Result<Self, CollabError> {
        let peer_id = rand::rng().random_range(1..u64::MAX);
        Self::connect_as(session_id, transport, user, peer_id)
    }

    /// Join `session_id` under a fixed peer id.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Unavailable` if the transport cannot be joined,
    /// or `CollabError::Doc` if the peer id is rejected.
    pub fn connect_as(
        session_id: &str,
        transport: Arc<dyn Transport>,
        user: UserInfo,
        peer_id: PeerId,
    ) -> Result<Self, CollabError> {
        let doc = SharedDoc::new(peer_id)?;
        let inbox = transport.join(session_id, peer_id)?;
        let awareness = Awareness::new(peer_id, AwarenessState::for_user(user));
        let presence = PresenceDirectory::new();
        presence.rebuild(&awareness);

        let session = Self {
            session_id: session_id.to_owned(),
            peer_id,
            doc,
            awareness,
            presence,
            transport,
            inbox,
            closed: false,
        };
        session.broadcast(SyncMessage::SyncRequest)?;
        session.broadcast(SyncMessage::Awareness { state: session.awareness.local_state().cloned() })?;
        info!(session_id, peer_id, "collaboration session joined");
        Ok(session)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn doc(&self) -> &SharedDoc {
        &self.doc
    }

    #[must_use]
    pub fn awareness(&self) -> &Awareness {
        &self.awareness
    }

    // --- Shared maps ---

    /// A named key/value region whose writes propagate to every peer.
    pub fn get_map(&mut self, name: &str) -> SharedMap<'_> {
        self.doc.track(name);
        SharedMap { session: self, name: name.to_owned() }
    }

    /// Report remote changes to `map` from `pump`/`recv` without writing to it.
    pub fn track(&mut self, map: &str) {
        self.doc.track(map);
    }

    /// Subscribe to local and remote changes of `map`.
    pub fn observe(&mut self, map: &str) -> (ObserverId, mpsc::UnboundedReceiver<MapChange>) {
        self.doc.observe(map)
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.doc.unobserve(id)
    }

    /// Broadcast any local ops not yet sent. Returns whether anything was sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the export fails or the transport is down.
    pub fn flush(&mut self) -> Result<bool, CollabError> {
        self.ensure_open()?;
        let Some(bytes) = self.doc.take_update()? else {
            return Ok(false);
        };
        self.broadcast(SyncMessage::Update { bytes })?;
        Ok(true)
    }

    // --- Presence ---

    /// Current `users` mapping, local user included.
    #[must_use]
    pub fn users(&self) -> Users {
        self.presence.users()
    }

    #[must_use]
    pub fn subscribe_users(&self) -> watch::Receiver<Users> {
        self.presence.subscribe()
    }

    /// Replace the local user's name/color and announce it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is down.
    pub fn set_local_user(&mut self, user: UserInfo) -> Result<(), CollabError> {
        self.ensure_open()?;
        if self.awareness.set_local_state(AwarenessState::for_user(user)) {
            self.presence.rebuild(&self.awareness);
            self.broadcast(SyncMessage::Awareness { state: self.awareness.local_state().cloned() })?;
        }
        Ok(())
    }

    // --- Inbound ---

    /// Apply every message already waiting, without blocking.
    ///
    /// Returns the shared-map changes caused by remote peers.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Closed` if the room dropped this peer, or a
    /// document error for an undecodable update.
    pub fn pump(&mut self) -> Result<Vec<MapChange>, CollabError> {
        self.ensure_open()?;
        let mut changes = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(envelope) => changes.extend(self.handle(envelope)?),
                Err(mpsc::error::TryRecvError::Empty) => return Ok(changes),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return Err(CollabError::Closed(self.session_id.clone()));
                }
            }
        }
    }

    /// Wait for the next message, then apply it and anything queued behind it.
    ///
    /// # Errors
    ///
    /// Same as [`CollabSession::pump`].
    pub async fn recv(&mut self) -> Result<Vec<MapChange>, CollabError> {
        self.ensure_open()?;
        let Some(envelope) = self.inbox.recv().await else {
            return Err(CollabError::Closed(self.session_id.clone()));
        };
        let mut changes = self.handle(envelope)?;
        changes.extend(self.pump()?);
        Ok(changes)
    }

    fn handle(&mut self, envelope: Envelope) -> Result<Vec<MapChange>, CollabError> {
        if envelope.from == self.peer_id {
            return Ok(Vec::new());
        }
        match envelope.message {
            SyncMessage::Update { bytes } => self.doc.import(&bytes),
            SyncMessage::SyncRequest => {
                debug!(peer = envelope.from, "answering sync request");
                let bytes = self.doc.snapshot()?;
                self.send_to(envelope.from, SyncMessage::Update { bytes })?;
                self.send_to(envelope.from, SyncMessage::Awareness { state: self.awareness.local_state().cloned() })?;
                Ok(Vec::new())
            }
            SyncMessage::Awareness { state } => {
                if self.awareness.apply(envelope.from, state) {
                    self.presence.rebuild(&self.awareness);
                }
                Ok(Vec::new())
            }
        }
    }

    // --- Teardown ---

    /// Leave the session, releasing the channel and every observer.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.broadcast(SyncMessage::Awareness { state: None }) {
            warn!(session_id = %self.session_id, error = %e, "could not announce departure");
        }
        self.doc.clear_observers();
        self.transport.leave(&self.session_id, self.peer_id);
        self.presence.clear();
        info!(session_id = %self.session_id, peer_id = self.peer_id, "collaboration session closed");
    }

    // --- Outbound ---

    fn ensure_open(&self) -> Result<(), CollabError> {
        if self.closed {
            return Err(CollabError::Closed(self.session_id.clone()));
        }
        Ok(())
    }

    fn broadcast(&self, message: SyncMessage) -> Result<(), CollabError> {
        self.transport.send(&self.session_id, Envelope { from: self.peer_id, to: None, message })
    }

    fn send_to(&self, peer: PeerId, message: SyncMessage) -> Result<(), CollabError> {
        self.transport.send(&self.session_id, Envelope { from: self.peer_id, to: Some(peer), message })
    }
}

impl Drop for CollabSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Handle to one named map of a session's shared document.
pub struct SharedMap<'a> {
    session: &'a mut CollabSession,
    name: String,
}

impl SharedMap<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `value` under `key` and broadcast it. Returns `false` if unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed, the value cannot be
    /// encoded, or the transport is down.
    pub fn set_value(&mut self, key: &str, value: &Value) -> Result<bool, CollabError> {
        self.session.ensure_open()?;
        let changed = self.session.doc.set_value(&self.name, key, value)?;
        if changed {
            self.session.flush()?;
        }
        Ok(changed)
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.session.doc.get_value(&self.name, key)
    }

    /// Remove `key` and broadcast the removal. Returns `false` if it was absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the transport is down.
    pub fn delete_value(&mut self, key: &str) -> Result<bool, CollabError> {
        self.session.ensure_open()?;
        let deleted = self.session.doc.delete_value(&self.name, key)?;
        if deleted {
            self.session.flush()?;
        }
        Ok(deleted)
    }

    #[must_use]
    pub fn entries(&self) -> std::collections::BTreeMap<String, Value> {
        self.session.doc.entries(&self.name)
    }

    pub fn observe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<MapChange>) {
        self.session.doc.observe(&self.name)
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.session.doc.unobserve(id)
    }
}
