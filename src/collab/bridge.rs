//! Layout bridge — mirrors widget layouts between the store and the shared
//! document.
//!
//! DESIGN
//! ======
//! Outbound, the bridge drains the store's event stream and writes each
//! affected layout to key `widget-<id>-layout` of the layout map (deleting
//! the key when a widget goes away). Gesture previews are written the same
//! way without ever touching the store.
//!
//! Inbound, remote changes to those keys are patched into the store with
//! `apply_remote_layout`, which bypasses history. The resulting
//! `RemoteLayoutApplied` event is not mirrored back, so remote values never
//! echo. Keys for widgets the local store does not know are ignored: the
//! shared document does not carry widget existence.
//!
//! A remote value may carry only some of `x`, `y`, `width`, `height`; the
//! missing fields keep the widget's current values.

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use super::CollabError;
use super::doc::MapChange;
use super::session::CollabSession;
use crate::consts::LAYOUT_MAP_NAME;
use crate::model::Layout;
use crate::store::{DashboardStore, StoreEvent};

/// Shared-map key holding a widget's layout.
#[must_use]
pub fn layout_key(widget_id: &str) -> String {
    format!("widget-{widget_id}-layout")
}

/// Widget id encoded in a layout key, if `key` is one.
#[must_use]
pub fn parse_layout_key(key: &str) -> Option<&str> {
    key.strip_prefix("widget-")?.strip_suffix("-layout").filter(|id| !id.is_empty())
}

/// Layout as stored in the shared map. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl LayoutPatch {
    /// Overlay present fields onto `base`.
    #[must_use]
    pub fn merge_into(self, base: Layout) -> Layout {
        Layout {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
        }
    }
}

impl From<Layout> for LayoutPatch {
    fn from(l: Layout) -> Self {
        Self { x: Some(l.x), y: Some(l.y), width: Some(l.width), height: Some(l.height) }
    }
}

/// Keeps the layout map and one store in step.
#[derive(Debug)]
pub struct LayoutBridge {
    events: broadcast::Receiver<StoreEvent>,
}

impl LayoutBridge {
    /// Start listening to `store` and watching the session's layout map.
    ///
    /// From here on, every remote write to the layout map shows up in the
    /// session's pumped changes, even if this peer never writes to it. Store
    /// events from before this call are not mirrored; call
    /// [`LayoutBridge::resync`] to publish the current state.
    #[must_use]
    pub fn attach(store: &DashboardStore, session: &mut CollabSession) -> Self {
        session.track(LAYOUT_MAP_NAME);
        Self { events: store.subscribe() }
    }

    // --- Outbound ---

    /// Write every widget layout of the active dashboard. Returns keys written.
    ///
    /// # Errors
    ///
    /// Returns an error if the session rejects a write.
    pub fn resync(store: &DashboardStore, session: &mut CollabSession) -> Result<usize, CollabError> {
        let Some(dashboard) = store.active_dashboard() else {
            return Ok(0);
        };
        let mut map = session.get_map(LAYOUT_MAP_NAME);
        let mut written = 0;
        for widget in dashboard.widgets() {
            written += usize::from(map.set_value(&layout_key(&widget.id), &layout_value(widget.layout)?)?);
        }
        debug!(dashboard_id = %dashboard.id, written, "layout map resynced");
        Ok(written)
    }

    /// Mirror store events received since the last call. Returns keys touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the session rejects a write.
    pub fn mirror_store_events(
        &mut self,
        store: &DashboardStore,
        session: &mut CollabSession,
    ) -> Result<usize, CollabError> {
        let mut touched = 0;
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(touched),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "store events lagged; resyncing layout map");
                    touched += Self::resync(store, session)?;
                    continue;
                }
            };
            touched += Self::mirror_event(&event, store, session)?;
        }
    }

    fn mirror_event(
        event: &StoreEvent,
        store: &DashboardStore,
        session: &mut CollabSession,
    ) -> Result<usize, CollabError> {
        if let StoreEvent::DashboardLoaded { .. } = event {
            return Self::resync(store, session);
        }
        let mut map = session.get_map(LAYOUT_MAP_NAME);
        let mut touched = 0;
        match event {
            StoreEvent::WidgetAdded { widget_id, layout }
            | StoreEvent::WidgetUpdated { widget_id, layout: Some(layout) } => {
                touched += usize::from(map.set_value(&layout_key(widget_id), &layout_value(*layout)?)?);
            }
            StoreEvent::WidgetRemoved { widget_id } => {
                touched += usize::from(map.delete_value(&layout_key(widget_id))?);
            }
            StoreEvent::HistoryRestored { layouts, removed, .. } => {
                for (widget_id, layout) in layouts {
                    touched += usize::from(map.set_value(&layout_key(widget_id), &layout_value(*layout)?)?);
                }
                for widget_id in removed {
                    touched += usize::from(map.delete_value(&layout_key(widget_id))?);
                }
            }
            StoreEvent::DashboardLoaded { .. }
            | StoreEvent::WidgetUpdated { layout: None, .. }
            | StoreEvent::RemoteLayoutApplied { .. }
            | StoreEvent::Saved { .. } => {}
        }
        Ok(touched)
    }

    /// Publish an uncommitted gesture layout to peers.
    ///
    /// # Errors
    ///
    /// Returns an error if the session rejects the write.
    pub fn mirror_preview(session: &mut CollabSession, widget_id: &str, layout: Layout) -> Result<bool, CollabError> {
        session.get_map(LAYOUT_MAP_NAME).set_value(&layout_key(widget_id), &layout_value(layout)?)
    }

    // --- Inbound ---

    /// Patch remote layout changes into `store`. Returns widgets updated.
    pub fn apply_remote(store: &mut DashboardStore, changes: &[MapChange]) -> usize {
        let mut applied = 0;
        for change in changes.iter().filter(|c| c.map == LAYOUT_MAP_NAME) {
            let Some(widget_id) = parse_layout_key(&change.key) else {
                continue;
            };
            let Some(value) = change.value.as_ref() else {
                continue;
            };
            let patch: LayoutPatch = match serde_json::from_value(value.clone()) {
                Ok(patch) => patch,
                Err(e) => {
                    warn!(key = %change.key, error = %e, "ignoring malformed remote layout");
                    continue;
                }
            };
            let Some(current) = store.active_dashboard().and_then(|d| d.get(widget_id)).map(|w| w.layout) else {
                continue;
            };
            if store.apply_remote_layout(widget_id, patch.merge_into(current)) {
                applied += 1;
            }
        }
        applied
    }
}

fn layout_value(layout: Layout) -> Result<serde_json::Value, CollabError> {
    Ok(serde_json::to_value(LayoutPatch::from(layout))?)
}
