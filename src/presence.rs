//! Presence directory — the `users` view derived from awareness.
//!
//! The directory is rebuilt from scratch on every awareness change: each
//! known peer becomes a [`User`] keyed by its stringified peer id. Peers
//! absent from the latest enumeration simply disappear. Nothing here writes
//! back to awareness.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::collab::Awareness;
use crate::consts::DEFAULT_PRESENCE_COLOR;

/// One connected user as shown in the user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Peer id (as string) → user.
pub type Users = BTreeMap<String, User>;

/// Derive the full `users` mapping from awareness.
#[must_use]
pub fn project_users(awareness: &Awareness) -> Users {
    awareness
        .states()
        .iter()
        .map(|(peer, state)| {
            let user = state.user.as_ref();
            let id = peer.to_string();
            let entry = User {
                id: id.clone(),
                name: user.and_then(|u| u.name.clone()).unwrap_or_default(),
                color: user
                    .and_then(|u| u.color.clone())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_PRESENCE_COLOR.to_owned()),
            };
            (id, entry)
        })
        .collect()
}

/// Holds the latest `users` mapping and publishes it to watchers.
#[derive(Debug)]
pub struct PresenceDirectory {
    users: watch::Sender<Users>,
}

impl Default for PresenceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceDirectory {
    #[must_use]
    pub fn new() -> Self {
        let (users, _) = watch::channel(Users::new());
        Self { users }
    }

    /// Recompute from `awareness` and publish.
    pub fn rebuild(&self, awareness: &Awareness) {
        let users = project_users(awareness);
        debug!(users = users.len(), "presence rebuilt");
        self.users.send_replace(users);
    }

    /// Drop every entry (session ended).
    pub fn clear(&self) {
        self.users.send_replace(Users::new());
    }

    /// Current mapping.
    #[must_use]
    pub fn users(&self) -> Users {
        self.users.borrow().clone()
    }

    /// Watch the mapping; the receiver sees each rebuild.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Users> {
        self.users.subscribe()
    }
}
