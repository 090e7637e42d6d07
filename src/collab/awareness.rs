//! Awareness — ephemeral per-peer state (who is here, in which color).
//!
//! Unlike the shared document nothing here is persisted or merged: each
//! peer owns its own entry and the latest message from a peer replaces it.

#[cfg(test)]
#[path = "awareness_test.rs"]
mod awareness_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PeerId;

/// Display identity a peer publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl UserInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self { name: Some(name.into()), color: Some(color.into()) }
    }
}

/// A peer's awareness entry. Fields other than `user` are reserved for
/// future transient state (cursors, selections).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwarenessState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

impl AwarenessState {
    #[must_use]
    pub fn for_user(user: UserInfo) -> Self {
        Self { user: Some(user) }
    }
}

/// Known awareness states for one session, including the local peer's.
#[derive(Debug, Clone)]
pub struct Awareness {
    local_peer: PeerId,
    states: BTreeMap<PeerId, AwarenessState>,
}

impl Awareness {
    #[must_use]
    pub fn new(local_peer: PeerId, local: AwarenessState) -> Self {
        let mut states = BTreeMap::new();
        states.insert(local_peer, local);
        Self { local_peer, states }
    }

    #[must_use]
    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    #[must_use]
    pub fn local_state(&self) -> Option<&AwarenessState> {
        self.states.get(&self.local_peer)
    }

    /// Replace the local entry. Returns whether it changed.
    pub fn set_local_state(&mut self, state: AwarenessState) -> bool {
        self.apply(self.local_peer, Some(state))
    }

    /// Apply a peer's announced state; `None` removes the peer.
    ///
    /// Returns whether the table changed.
    pub fn apply(&mut self, peer: PeerId, state: Option<AwarenessState>) -> bool {
        match state {
            Some(state) => self.states.insert(peer, state.clone()).is_none_or(|old| old != state),
            None => self.states.remove(&peer).is_some(),
        }
    }

    /// All known states keyed by peer, local peer included.
    #[must_use]
    pub fn states(&self) -> &BTreeMap<PeerId, AwarenessState> {
        &self.states
    }
}
