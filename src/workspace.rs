//! Workspace — the application host. Owns the store, widget registry,
//! gesture controller, optional collaboration session, data handles and
//! preferences, and routes every user intent through them.
//!
//! DESIGN
//! ======
//! All mutation goes through the store; after each command the workspace
//! drains store events into the layout bridge so peers see the change.
//! Remote layout changes arrive through [`Workspace::pump_remote`].
//!
//! Pointer gestures never touch the store until they end: moves publish
//! previews to the shared document only, and the local render overlays the
//! preview on the committed layout. Pointer-up records one history entry.
//!
//! One collaboration session exists per loaded dashboard; switching
//! dashboards closes the old session before joining the new one.
//!
//! ERROR HANDLING
//! ==============
//! Collaboration failures are never fatal. A session that cannot be joined,
//! or that fails later, is dropped with a warning and editing continues in
//! single-user mode.

#[cfg(test)]
#[path = "workspace_test.rs"]
mod workspace_test;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::collab::{CollabError, CollabSession, LayoutBridge, Transport, UserInfo};
use crate::config::EngineConfig;
use crate::consts::DRAG_PAYLOAD_WIDGET_TYPE;
use crate::data::{DataError, DataProvider, DataRequest, WidgetData};
use crate::geometry::Point;
use crate::input::{Action, GestureController};
use crate::model::{Dashboard, NewWidget, WidgetId, WidgetPatch};
use crate::prefs::{PreferenceStore, PrefsError};
use crate::presence::Users;
use crate::render::{RenderProps, render_widget};
use crate::repo::DashboardRepository;
use crate::store::{DashboardStore, StoreError};
use crate::widget::{ConfigDraft, WidgetError, WidgetRegistry};

/// Shown on an empty canvas.
pub const EMPTY_CANVAS_HINT: &str = "Drag widgets here to build your dashboard";

/// Drag payload: format name → data, as carried by a platform drag event.
pub type DropPayload = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Prefs(#[from] PrefsError),
    #[error(transparent)]
    Data(#[from] DataError),
}

struct Collab {
    session: CollabSession,
    bridge: LayoutBridge,
}

pub struct Workspace {
    store: DashboardStore,
    registry: WidgetRegistry,
    gestures: GestureController,
    transport: Option<Arc<dyn Transport>>,
    user: UserInfo,
    collab: Option<Collab>,
    data: DataProvider,
    widget_data: HashMap<WidgetId, WidgetData>,
    prefs: PreferenceStore,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("active_id", &self.store.active_id())
            .field("collaborating", &self.is_collaborating())
            .field("data_handles", &self.widget_data.len())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Load the configured dashboard and, if enabled, join its session.
    ///
    /// A `transport` of `None` (or `COLLAB_ENABLED=false`) means single-user.
    ///
    /// # Errors
    ///
    /// Returns an error if the dashboard or preferences cannot be loaded, or
    /// the HTTP client cannot be built. Collaboration failures are not errors.
    pub fn open(
        config: &EngineConfig,
        repo: Arc<dyn DashboardRepository>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, WorkspaceError> {
        let mut store = DashboardStore::new(config.store, repo);
        store.load_dashboard(&config.dashboard_id)?;
        let mut workspace = Self {
            store,
            registry: WidgetRegistry::builtin(),
            gestures: GestureController::new(config.canvas, config.resize_mode),
            transport: transport.filter(|_| config.collab_enabled),
            user: config.user.clone(),
            collab: None,
            data: DataProvider::new(config.data_timeout)?,
            widget_data: HashMap::new(),
            prefs: PreferenceStore::open(&config.prefs_path)?,
        };
        workspace.connect();
        info!(
            dashboard_id = %config.dashboard_id,
            collaborating = workspace.is_collaborating(),
            theme = workspace.prefs.theme(),
            "workspace opened"
        );
        Ok(workspace)
    }

    // --- Queries ---

    #[must_use]
    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    #[must_use]
    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.store.active_dashboard()
    }

    #[must_use]
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Register additional widget kinds.
    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    #[must_use]
    pub fn is_collaborating(&self) -> bool {
        self.collab.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&CollabSession> {
        self.collab.as_ref().map(|c| &c.session)
    }

    /// Connected users; empty in single-user mode.
    #[must_use]
    pub fn users(&self) -> Users {
        self.collab.as_ref().map(|c| c.session.users()).unwrap_or_default()
    }

    // --- Dashboards ---

    /// Switch to dashboard `id`, starting a fresh history and session.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::Store` if the repository lookup fails. The
    /// previous dashboard stays active in that case.
    pub fn load_dashboard(&mut self, id: &str) -> Result<(), WorkspaceError> {
        self.store.load_dashboard(id)?;
        self.disconnect();
        self.widget_data.clear();
        self.gestures = GestureController::new(self.gestures.bounds, self.gestures.resize_mode);
        self.connect();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `WorkspaceError::Store` if the repository write fails.
    pub fn save(&mut self) -> Result<bool, WorkspaceError> {
        let saved = self.store.save_dashboard()?;
        self.sync();
        Ok(saved)
    }

    // --- Widget commands ---

    pub fn add_widget(&mut self, widget: NewWidget) -> Option<WidgetId> {
        let id = self.store.add_widget(widget);
        self.sync();
        id
    }

    /// Add a `kind` widget with its defaults at the canvas origin.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::UnknownKind` if `kind` is not registered.
    pub fn add_widget_of_kind(&mut self, kind: &str) -> Result<Option<WidgetId>, WidgetError> {
        let widget = self.registry.instantiate(kind, 0.0, 0.0)?;
        Ok(self.add_widget(widget))
    }

    /// Handle a drop on the canvas at `pt` (canvas coordinates).
    ///
    /// Payloads without a widget-type token, or naming an unregistered
    /// kind, are ignored.
    pub fn on_drop(&mut self, payload: &DropPayload, pt: Point) -> Option<WidgetId> {
        let kind = payload.get(DRAG_PAYLOAD_WIDGET_TYPE).filter(|k| !k.is_empty())?;
        let Some(definition) = self.registry.get(kind) else {
            debug!(kind = %kind, "drop of unregistered widget kind ignored");
            return None;
        };
        let widget = definition.instantiate(pt.x, pt.y);
        self.add_widget(widget)
    }

    pub fn update_widget(&mut self, id: &str, patch: WidgetPatch) -> bool {
        let updated = self.store.update_widget(id, patch);
        self.sync();
        updated
    }

    /// Remove a widget, abandoning any gesture on it and stopping its data.
    pub fn remove_widget(&mut self, id: &str) -> bool {
        if !self.store.remove_widget(id) {
            return false;
        }
        self.gestures.cancel_for(id);
        self.widget_data.remove(id);
        self.sync();
        true
    }

    pub fn undo(&mut self) -> bool {
        let restored = self.store.undo();
        self.sync();
        restored
    }

    pub fn redo(&mut self) -> bool {
        let restored = self.store.redo();
        self.sync();
        restored
    }

    /// Start editing a widget's config as JSON text. `None` if the widget is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the widget's config cannot be encoded.
    pub fn open_config(&self, id: &str) -> Result<Option<ConfigDraft>, WidgetError> {
        self.dashboard().and_then(|d| d.get(id)).map(ConfigDraft::open).transpose()
    }

    /// Apply a draft. Malformed text is rejected and the draft reverted.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the store is untouched in that case.
    pub fn commit_config(&mut self, draft: &mut ConfigDraft) -> Result<bool, WidgetError> {
        let committed = draft.commit(&mut self.store)?;
        self.sync();
        Ok(committed)
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, pt: Point) -> Vec<Action> {
        match self.store.active_dashboard() {
            Some(dashboard) => self.gestures.on_pointer_down(dashboard, pt),
            None => Vec::new(),
        }
    }

    /// Advance the gesture; previews are published to peers.
    pub fn on_pointer_move(&mut self, pt: Point) -> Vec<Action> {
        let actions = self.gestures.on_pointer_move(pt);
        for action in &actions {
            if let Action::Preview { id, layout } = action {
                let result = match self.collab.as_mut() {
                    Some(collab) => LayoutBridge::mirror_preview(&mut collab.session, id, *layout).map(|_| ()),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.degrade(&e);
                }
            }
        }
        actions
    }

    /// End the gesture, recording its final layout once.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        let actions = self.gestures.on_pointer_up();
        for action in &actions {
            if let Action::Commit { id, layout } = action {
                self.store.update_widget(id, WidgetPatch::layout(*layout));
            }
        }
        self.sync();
        actions
    }

    // --- Collaboration ---

    /// Apply everything peers sent since the last call. Returns widgets updated.
    pub fn pump_remote(&mut self) -> usize {
        let result = match self.collab.as_mut() {
            Some(collab) => collab.session.pump(),
            None => return 0,
        };
        match result {
            Ok(changes) => {
                let applied = LayoutBridge::apply_remote(&mut self.store, &changes);
                self.sync();
                applied
            }
            Err(e) => {
                self.degrade(&e);
                0
            }
        }
    }

    /// Change the local user's presence name/color.
    pub fn set_local_user(&mut self, user: UserInfo) {
        self.user = user.clone();
        let result = match self.collab.as_mut() {
            Some(collab) => collab.session.set_local_user(user),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.degrade(&e);
        }
    }

    fn connect(&mut self) {
        let (Some(transport), Some(dashboard_id)) = (self.transport.clone(), self.store.active_id()) else {
            return;
        };
        match CollabSession::connect(dashboard_id, transport, self.user.clone()) {
            Ok(mut session) => {
                let bridge = LayoutBridge::attach(&self.store, &mut session);
                self.collab = Some(Collab { session, bridge });
            }
            Err(e) => warn!(%dashboard_id, error = %e, "collaboration unavailable; continuing in single-user mode"),
        }
    }

    fn disconnect(&mut self) {
        if let Some(collab) = self.collab.take() {
            collab.session.close();
        }
    }

    /// Mirror pending store events to the shared document.
    fn sync(&mut self) {
        let result = match self.collab.as_mut() {
            Some(collab) => collab.bridge.mirror_store_events(&self.store, &mut collab.session).map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.degrade(&e);
        }
    }

    fn degrade(&mut self, error: &CollabError) {
        warn!(error = %error, "collaboration lost; continuing in single-user mode");
        self.disconnect();
    }

    /// Leave the session (if any) and stop every data poller.
    pub fn close(mut self) {
        self.disconnect();
        self.widget_data.clear();
    }

    // --- Widget data ---

    /// Attach or replace the data source of a widget. Returns `false` for an
    /// unknown widget.
    ///
    /// # Errors
    ///
    /// Returns `DataError::NoRuntime` outside a tokio runtime.
    pub fn attach_data(&mut self, id: &str, request: DataRequest) -> Result<bool, DataError> {
        if !self.dashboard().is_some_and(|d| d.contains(id)) {
            return Ok(false);
        }
        match self.widget_data.get_mut(id) {
            Some(handle) => handle.set_request(request),
            None => {
                let handle = self.data.watch(id, request)?;
                self.widget_data.insert(id.to_owned(), handle);
            }
        }
        Ok(true)
    }

    pub fn detach_data(&mut self, id: &str) -> bool {
        self.widget_data.remove(id).is_some()
    }

    #[must_use]
    pub fn widget_data(&self, id: &str) -> Option<&WidgetData> {
        self.widget_data.get(id)
    }

    // --- Preferences ---

    #[must_use]
    pub fn theme(&self) -> &str {
        self.prefs.theme()
    }

    /// # Errors
    ///
    /// Returns an error if the preference file cannot be written.
    pub fn set_theme(&mut self, theme: &str) -> Result<(), PrefsError> {
        self.prefs.set_theme(theme)
    }

    // --- Rendering ---

    /// The active dashboard as text, with any in-flight gesture overlaid.
    #[must_use]
    pub fn render(&self) -> String {
        let Some(dashboard) = self.store.active_dashboard() else {
            return String::new();
        };
        let mut out = format!("{} ({} widgets)\n", dashboard.name, dashboard.len());
        if dashboard.is_empty() {
            out.push_str(EMPTY_CANVAS_HINT);
            out.push('\n');
            return out;
        }
        let preview = self.gestures.preview();
        for widget in dashboard.sorted_widgets() {
            let mut shown = widget.clone();
            if let Some((_, layout)) = preview.filter(|(id, _)| *id == widget.id) {
                shown.layout = layout;
            }
            let state = self.widget_data.get(&widget.id).map(WidgetData::state);
            let props = match &state {
                Some(s) => RenderProps {
                    config: &widget.config,
                    data: s.data.as_ref(),
                    loading: s.loading,
                    error: s.error.as_deref(),
                },
                None => RenderProps::static_config(&widget.config),
            };
            for line in render_widget(&shown, &self.registry, &props) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}
