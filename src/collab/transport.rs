//! Transport — how peers in a session exchange sync and awareness messages.
//!
//! DESIGN
//! ======
//! A room per session id, a channel per peer. `send` with `to: None`
//! broadcasts to every other peer in the room; `to: Some(peer)` is a direct
//! reply (used to answer a newcomer's sync request). Delivery is
//! best-effort: a peer whose receiver is gone is skipped.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, trace};

use super::awareness::AwarenessState;
use super::{CollabError, PeerId};

/// Payload exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Encoded CRDT ops (incremental update or full snapshot).
    Update { bytes: Vec<u8> },
    /// Newcomer asks every peer for its document and awareness state.
    SyncRequest,
    /// Sender's awareness state; `None` means the sender left.
    Awareness { state: Option<AwarenessState> },
}

/// A routed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: PeerId,
    /// Direct recipient, or `None` to broadcast to the room.
    pub to: Option<PeerId>,
    pub message: SyncMessage,
}

/// Peer channel binding a session to other peers.
pub trait Transport: Send + Sync {
    /// Enter `room` as `peer`, receiving everything routed to it.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Unavailable` if the channel cannot be established.
    fn join(&self, room: &str, peer: PeerId) -> Result<mpsc::UnboundedReceiver<Envelope>, CollabError>;

    /// Route `envelope` within `room`.
    ///
    /// # Errors
    ///
    /// Returns `CollabError::Unavailable` if the channel is down.
    fn send(&self, room: &str, envelope: Envelope) -> Result<(), CollabError>;

    /// Leave `room`. Leaving twice is harmless.
    fn leave(&self, room: &str, peer: PeerId);
}

/// In-process relay: every session in this process that joins the same
/// room id sees the others' messages.
#[derive(Debug)]
pub struct LocalRelay {
    rooms: Mutex<HashMap<String, HashMap<PeerId, mpsc::UnboundedSender<Envelope>>>>,
    online: AtomicBool,
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self { rooms: Mutex::new(HashMap::new()), online: AtomicBool::new(true) }
    }
}

impl LocalRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the relay going down or coming back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Peers currently in `room`.
    #[must_use]
    pub fn peer_count(&self, room: &str) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).map_or(0, HashMap::len)
    }

    fn ensure_online(&self) -> Result<(), CollabError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CollabError::Unavailable("local relay is offline".into()))
        }
    }
}

impl Transport for LocalRelay {
    fn join(&self, room: &str, peer: PeerId) -> Result<mpsc::UnboundedReceiver<Envelope>, CollabError> {
        self.ensure_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let members = rooms.entry(room.to_owned()).or_default();
        members.insert(peer, tx);
        info!(room, peer, peers = members.len(), "peer joined room");
        Ok(rx)
    }

    fn send(&self, room: &str, envelope: Envelope) -> Result<(), CollabError> {
        self.ensure_online()?;
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = rooms.get_mut(room) else {
            return Err(CollabError::Closed(room.to_owned()));
        };
        members.retain(|peer, tx| {
            let wanted = match envelope.to {
                Some(to) => *peer == to,
                None => *peer != envelope.from,
            };
            if !wanted {
                return true;
            }
            let delivered = tx.send(envelope.clone()).is_ok();
            if !delivered {
                trace!(peer, "dropping peer with closed channel");
            }
            delivered
        });
        Ok(())
    }

    fn leave(&self, room: &str, peer: PeerId) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = rooms.get_mut(room) else {
            return;
        };
        members.remove(&peer);
        info!(room, peer, remaining = members.len(), "peer left room");
        if members.is_empty() {
            rooms.remove(room);
        }
    }
}
