//! Dashboard store — the canonical model and the only legal mutation path.
//!
//! DESIGN
//! ======
//! The store owns every loaded dashboard, the active dashboard id, and the
//! undo/redo [`History`]. The active dashboard in `dashboards` and
//! `history.present` are always equal: each command mutates the dashboard,
//! then records a clone as the new present (the previous present becomes
//! the undo snapshot).
//!
//! Subscribers (renderers, the collaboration bridge) receive [`StoreEvent`]s
//! over a broadcast channel. Remote layout patches go through
//! [`DashboardStore::apply_remote_layout`], which bypasses history.
//!
//! ERROR HANDLING
//! ==============
//! Commands issued without an active dashboard, or naming a widget that
//! does not exist, are silent no-ops: they return `false`/`None`, record no
//! history and emit no event. Only repository I/O surfaces as `StoreError`.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::consts::{DEFAULT_EVENT_CAPACITY, DEFAULT_HISTORY_LIMIT};
use crate::history::History;
use crate::model::{Dashboard, DashboardId, Layout, NewWidget, WidgetId, WidgetPatch, new_widget_id};
use crate::repo::{DashboardRepository, MemoryRepository, RepoError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to load dashboard {dashboard_id}: {source}")]
    Load {
        dashboard_id: DashboardId,
        #[source]
        source: RepoError,
    },
    #[error("failed to save dashboard {dashboard_id}: {source}")]
    Save {
        dashboard_id: DashboardId,
        #[source]
        source: RepoError,
    },
}

/// Which way a history step went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Undo,
    Redo,
}

/// Change notification broadcast after every successful store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A dashboard became active and its history was reset.
    DashboardLoaded { dashboard_id: DashboardId },
    WidgetAdded { widget_id: WidgetId, layout: Layout },
    /// `layout` is set when the update replaced the widget's layout.
    WidgetUpdated { widget_id: WidgetId, layout: Option<Layout> },
    WidgetRemoved { widget_id: WidgetId },
    /// Undo or redo swapped the active dashboard for a snapshot.
    HistoryRestored {
        step: HistoryStep,
        /// Widgets whose layout differs from before the step, including re-added ones.
        layouts: Vec<(WidgetId, Layout)>,
        /// Widgets that disappeared in the step.
        removed: Vec<WidgetId>,
    },
    /// A peer's layout was patched in without touching history.
    RemoteLayoutApplied { widget_id: WidgetId, layout: Layout },
    Saved { dashboard_id: DashboardId },
}

/// Store tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub history_limit: usize,
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT, event_capacity: DEFAULT_EVENT_CAPACITY }
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct DashboardStore {
    dashboards: HashMap<DashboardId, Dashboard>,
    active_id: Option<DashboardId>,
    history: History,
    events: broadcast::Sender<StoreEvent>,
    repo: Arc<dyn DashboardRepository>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new(StoreConfig::default(), Arc::new(MemoryRepository::new()))
    }
}

impl DashboardStore {
    #[must_use]
    pub fn new(config: StoreConfig, repo: Arc<dyn DashboardRepository>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            dashboards: HashMap::new(),
            active_id: None,
            history: History::with_limit(config.history_limit),
            events,
            repo,
        }
    }

    /// Register for change notifications. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // --- Queries ---

    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    #[must_use]
    pub fn active_dashboard(&self) -> Option<&Dashboard> {
        self.active_id.as_ref().and_then(|id| self.dashboards.get(id))
    }

    #[must_use]
    pub fn dashboard(&self, id: &str) -> Option<&Dashboard> {
        self.dashboards.get(id)
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    // --- Commands ---

    /// Make `id` the active dashboard and start a fresh history timeline.
    ///
    /// The dashboard comes from the repository if it has one, else from
    /// this session's memory, else a new empty grid dashboard is created.
    /// Loading is not an undoable edit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Load` if the repository read fails.
    pub fn load_dashboard(&mut self, id: &str) -> Result<&Dashboard, StoreError> {
        let stored =
            self.repo.load(id).map_err(|source| StoreError::Load { dashboard_id: id.to_owned(), source })?;
        let dashboard = stored
            .or_else(|| self.dashboards.get(id).cloned())
            .unwrap_or_else(|| Dashboard::new(id));

        info!(dashboard_id = %id, widgets = dashboard.len(), "dashboard loaded");
        self.history.reset(dashboard.clone());
        self.active_id = Some(id.to_owned());
        self.emit(StoreEvent::DashboardLoaded { dashboard_id: id.to_owned() });
        Ok(self.dashboards.entry(id.to_owned()).insert_entry(dashboard).into_mut())
    }

    /// Add a widget to the active dashboard under a fresh id.
    ///
    /// Returns `None` (and records nothing) when no dashboard is active.
    pub fn add_widget(&mut self, widget: NewWidget) -> Option<WidgetId> {
        let id = new_widget_id();
        let layout = widget.layout;
        let full = widget.into_widget(id.clone());
        self.mutate_active(|dashboard| dashboard.insert(full))?;
        debug!(widget_id = %id, kind = %self.kind_of(&id), "widget added");
        self.emit(StoreEvent::WidgetAdded { widget_id: id.clone(), layout });
        Some(id)
    }

    /// Shallow-merge `patch` onto an existing widget of the active dashboard.
    ///
    /// Returns `false` without recording history when there is no active
    /// dashboard, the widget does not exist, or the patch is empty.
    pub fn update_widget(&mut self, id: &str, patch: WidgetPatch) -> bool {
        if patch.is_empty() || !self.active_contains(id) {
            return false;
        }
        let recorded = self
            .mutate_active(|dashboard| {
                if let Some(widget) = dashboard.get_mut(id) {
                    patch.apply_to(widget);
                }
            })
            .is_some();
        if recorded {
            debug!(widget_id = %id, layout = patch.layout.is_some(), config = patch.config.is_some(), "widget updated");
            self.emit(StoreEvent::WidgetUpdated { widget_id: id.to_owned(), layout: patch.layout });
        }
        recorded
    }

    /// Delete a widget from the active dashboard.
    ///
    /// Returns `false` without recording history when there is no active
    /// dashboard or the widget does not exist.
    pub fn remove_widget(&mut self, id: &str) -> bool {
        if !self.active_contains(id) {
            return false;
        }
        let recorded = self
            .mutate_active(|dashboard| {
                dashboard.remove(id);
            })
            .is_some();
        if recorded {
            debug!(widget_id = %id, "widget removed");
            self.emit(StoreEvent::WidgetRemoved { widget_id: id.to_owned() });
        }
        recorded
    }

    /// Restore the previous snapshot. No-op when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.step(HistoryStep::Undo)
    }

    /// Re-apply the most recently undone snapshot. No-op when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.step(HistoryStep::Redo)
    }

    /// Hand the active dashboard to the repository. Does not touch state or history.
    ///
    /// Returns `Ok(false)` when no dashboard is active.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Save` if the repository write fails.
    pub fn save_dashboard(&self) -> Result<bool, StoreError> {
        let Some(dashboard) = self.active_dashboard() else {
            return Ok(false);
        };
        self.repo
            .save(dashboard)
            .map_err(|source| StoreError::Save { dashboard_id: dashboard.id.clone(), source })?;
        info!(dashboard_id = %dashboard.id, widgets = dashboard.len(), "dashboard saved");
        self.emit(StoreEvent::Saved { dashboard_id: dashboard.id.clone() });
        Ok(true)
    }

    /// Patch a widget's layout from a remote peer, bypassing history.
    ///
    /// Returns `false` if the widget is unknown or already has this layout.
    pub fn apply_remote_layout(&mut self, id: &str, layout: Layout) -> bool {
        let Some(active_id) = self.active_id.as_ref() else {
            return false;
        };
        let Some(dashboard) = self.dashboards.get_mut(active_id) else {
            return false;
        };
        let Some(widget) = dashboard.get_mut(id) else {
            return false;
        };
        if widget.layout == layout {
            return false;
        }
        widget.layout = layout;
        self.history.replace_present(dashboard.clone());
        trace!(widget_id = %id, "remote layout applied");
        self.emit(StoreEvent::RemoteLayoutApplied { widget_id: id.to_owned(), layout });
        true
    }

    // --- Internals ---

    fn active_contains(&self, id: &str) -> bool {
        self.active_dashboard().is_some_and(|d| d.contains(id))
    }

    fn kind_of(&self, id: &str) -> String {
        self.active_dashboard()
            .and_then(|d| d.get(id))
            .map(|w| w.kind().to_owned())
            .unwrap_or_default()
    }

    /// Apply `f` to the active dashboard and record the result in history.
    fn mutate_active<F>(&mut self, f: F) -> Option<()>
    where
        F: FnOnce(&mut Dashboard),
    {
        let id = self.active_id.as_ref()?;
        let dashboard = self.dashboards.get_mut(id)?;
        f(dashboard);
        self.history.record(dashboard.clone());
        Some(())
    }

    fn step(&mut self, step: HistoryStep) -> bool {
        let Some(active_id) = self.active_id.clone() else {
            return false;
        };
        let restored = match step {
            HistoryStep::Undo => self.history.undo(),
            HistoryStep::Redo => self.history.redo(),
        };
        let Some(restored) = restored.cloned() else {
            return false;
        };
        let previous = self.dashboards.insert(active_id, restored);
        let (layouts, removed) = match (previous.as_ref(), self.active_dashboard()) {
            (Some(before), Some(after)) => layout_diff(before, after),
            _ => (Vec::new(), Vec::new()),
        };
        debug!(?step, changed = layouts.len(), removed = removed.len(), "history step");
        self.emit(StoreEvent::HistoryRestored { step, layouts, removed });
        true
    }

    fn emit(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            trace!("store event dropped: no subscribers");
        }
    }
}

/// Layouts that changed (or appeared) and widgets that disappeared going from `before` to `after`.
fn layout_diff(before: &Dashboard, after: &Dashboard) -> (Vec<(WidgetId, Layout)>, Vec<WidgetId>) {
    let mut layouts: Vec<(WidgetId, Layout)> = after
        .widgets()
        .filter(|w| before.get(&w.id).is_none_or(|old| old.layout != w.layout))
        .map(|w| (w.id.clone(), w.layout))
        .collect();
    let mut removed: Vec<WidgetId> = before
        .widgets()
        .filter(|w| !after.contains(&w.id))
        .map(|w| w.id.clone())
        .collect();
    layouts.sort_by(|a, b| a.0.cmp(&b.0));
    removed.sort();
    (layouts, removed)
}
