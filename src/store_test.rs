#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::widget::{TextConfig, WidgetConfig};

fn text_widget(x: f64, y: f64) -> NewWidget {
    NewWidget::new(WidgetConfig::Text(TextConfig::default()), Layout::new(x, y, 300.0, 150.0))
}

fn loaded(id: &str) -> DashboardStore {
    let mut store = DashboardStore::default();
    assert!(store.load_dashboard(id).is_ok());
    store
}

fn layout_of(store: &DashboardStore, id: &str) -> Option<Layout> {
    store.active_dashboard().and_then(|d| d.get(id)).map(|w| w.layout)
}

struct FailingRepo;

impl DashboardRepository for FailingRepo {
    fn load(&self, id: &str) -> Result<Option<Dashboard>, RepoError> {
        Err(RepoError::InvalidId(id.to_owned()))
    }

    fn save(&self, dashboard: &Dashboard) -> Result<(), RepoError> {
        Err(RepoError::InvalidId(dashboard.id.clone()))
    }
}

// =============================================================
// Load
// =============================================================

#[test]
fn load_creates_empty_grid_dashboard() {
    let mut store = DashboardStore::default();
    let dashboard = store.load_dashboard("d1").unwrap().clone();
    assert_eq!(dashboard.id, "d1");
    assert_eq!(dashboard.name, "Dashboard d1");
    assert!(dashboard.is_empty());
    assert_eq!(dashboard.layout.config, json!({"cols": 12, "rowHeight": 50}));
    assert_eq!(store.active_id(), Some("d1"));
    assert_eq!(store.history().present(), Some(&dashboard));
    assert!(!store.history().can_undo());
}

#[test]
fn load_prefers_repository_copy() {
    let repo = Arc::new(MemoryRepository::new());
    let mut saved = Dashboard::new("d1");
    saved.name = "Quarterly".into();
    repo.save(&saved).unwrap();

    let mut store = DashboardStore::new(StoreConfig::default(), repo);
    assert_eq!(store.load_dashboard("d1").unwrap().name, "Quarterly");
}

#[test]
fn load_resets_history() {
    let mut store = loaded("d1");
    store.add_widget(text_widget(0.0, 0.0));
    assert!(store.history().can_undo());
    store.load_dashboard("d2").unwrap();
    assert!(!store.history().can_undo());
    assert!(!store.history().can_redo());
}

#[test]
fn reload_keeps_session_edits() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    store.load_dashboard("d2").unwrap();
    let d1 = store.load_dashboard("d1").unwrap();
    assert!(d1.contains(&id));
}

#[test]
fn load_error_is_reported() {
    let mut store = DashboardStore::new(StoreConfig::default(), Arc::new(FailingRepo));
    let err = store.load_dashboard("d1").unwrap_err();
    assert!(matches!(err, StoreError::Load { ref dashboard_id, .. } if dashboard_id == "d1"));
    assert!(store.active_id().is_none());
}

// =============================================================
// Add / update / remove
// =============================================================

#[test]
fn add_without_active_dashboard_is_noop() {
    let mut store = DashboardStore::default();
    assert!(store.add_widget(text_widget(0.0, 0.0)).is_none());
    assert!(store.history().present().is_none());
}

#[test]
fn add_assigns_fresh_ids() {
    let mut store = loaded("d1");
    let a = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let b = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    assert_ne!(a, b);
    let dashboard = store.active_dashboard().unwrap();
    assert_eq!(dashboard.len(), 2);
    assert_eq!(dashboard.get(&a).map(|w| w.id.as_str()), Some(a.as_str()));
}

#[test]
fn update_merges_only_present_fields() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let moved = Layout::new(10.0, 20.0, 300.0, 150.0);
    assert!(store.update_widget(&id, WidgetPatch::layout(moved)));
    let widget = store.active_dashboard().unwrap().get(&id).unwrap();
    assert_eq!(widget.layout, moved);
    assert_eq!(widget.config, WidgetConfig::Text(TextConfig::default()));
}

#[test]
fn update_missing_widget_records_nothing() {
    let mut store = loaded("d1");
    store.add_widget(text_widget(0.0, 0.0));
    let before = store.history().clone();
    assert!(!store.update_widget("ghost", WidgetPatch::layout(Layout::default())));
    assert_eq!(store.history(), &before);
}

#[test]
fn empty_patch_records_nothing() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let past = store.history().past().count();
    assert!(!store.update_widget(&id, WidgetPatch::default()));
    assert_eq!(store.history().past().count(), past);
}

#[test]
fn remove_missing_widget_records_nothing() {
    let mut store = loaded("d1");
    let past = store.history().past().count();
    assert!(!store.remove_widget("ghost"));
    assert_eq!(store.history().past().count(), past);
}

#[test]
fn remove_deletes_widget() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    assert!(store.remove_widget(&id));
    assert!(store.active_dashboard().unwrap().is_empty());
}

// =============================================================
// Undo / redo
// =============================================================

#[test]
fn add_undo_redo_scenario() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();

    assert!(store.undo());
    assert!(store.active_dashboard().unwrap().is_empty());

    assert!(store.redo());
    assert_eq!(layout_of(&store, &id), Some(Layout::new(0.0, 0.0, 300.0, 150.0)));
}

#[test]
fn undo_restores_exact_prior_state() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let before = store.active_dashboard().unwrap().clone();
    store.update_widget(&id, WidgetPatch::layout(Layout::new(50.0, 60.0, 300.0, 150.0)));
    let after = store.active_dashboard().unwrap().clone();

    store.undo();
    assert_eq!(store.active_dashboard(), Some(&before));
    store.redo();
    assert_eq!(store.active_dashboard(), Some(&after));
}

#[test]
fn mixed_sequence_undoes_and_redoes_in_full() {
    let mut store = loaded("d1");
    let start = store.active_dashboard().unwrap().clone();

    let greeting = WidgetConfig::Text(TextConfig { content: "hi".into(), ..TextConfig::default() });
    let a = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let b = store.add_widget(text_widget(10.0, 10.0)).unwrap();
    let mut applied = vec![
        store.update_widget(&a, WidgetPatch::layout(Layout::new(40.0, 0.0, 300.0, 150.0))),
        store.update_widget(&b, WidgetPatch::config(greeting)),
        store.remove_widget(&a),
    ];
    let c = store.add_widget(text_widget(70.0, 70.0)).unwrap();
    applied.push(store.update_widget(&c, WidgetPatch::layout(Layout::new(80.0, 90.0, 320.0, 160.0))));
    applied.push(store.remove_widget(&b));
    assert!(applied.iter().all(|ok| *ok));

    let adds = 3;
    let steps = adds + applied.len();
    let end = store.active_dashboard().unwrap().clone();
    assert_eq!(store.history().past().len(), steps);

    for _ in 0..steps {
        assert!(store.undo());
    }
    assert_eq!(store.active_dashboard(), Some(&start));
    assert!(!store.undo());

    for _ in 0..steps {
        assert!(store.redo());
    }
    assert_eq!(store.active_dashboard(), Some(&end));
    assert!(!store.redo());
    assert_eq!(end.len(), 1);
    assert!(end.contains(&c));
}

#[test]
fn new_edit_after_undo_drops_redo() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    store.update_widget(&id, WidgetPatch::layout(Layout::new(5.0, 5.0, 300.0, 150.0)));
    store.undo();
    store.update_widget(&id, WidgetPatch::layout(Layout::new(9.0, 9.0, 300.0, 150.0)));
    assert!(!store.history().can_redo());
    assert!(!store.redo());
    assert_eq!(layout_of(&store, &id), Some(Layout::new(9.0, 9.0, 300.0, 150.0)));
}

#[test]
fn undo_with_nothing_to_undo_is_noop() {
    let mut store = loaded("d1");
    let before = store.active_dashboard().cloned();
    assert!(!store.undo());
    assert!(!store.redo());
    assert_eq!(store.active_dashboard().cloned(), before);
}

#[test]
fn undo_past_a_removal_brings_widget_back() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    store.remove_widget(&id);
    store.undo();
    assert!(store.active_dashboard().unwrap().contains(&id));
}

#[test]
fn active_dashboard_matches_history_present() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    store.update_widget(&id, WidgetPatch::layout(Layout::new(1.0, 2.0, 300.0, 150.0)));
    store.undo();
    assert_eq!(store.active_dashboard(), store.history().present());
    store.apply_remote_layout(&id, Layout::new(7.0, 7.0, 300.0, 150.0));
    assert_eq!(store.active_dashboard(), store.history().present());
}

// =============================================================
// Save
// =============================================================

#[test]
fn save_without_active_dashboard_is_silent() {
    let store = DashboardStore::default();
    assert!(!store.save_dashboard().unwrap());
}

#[test]
fn save_writes_to_repository_without_touching_history() {
    let repo = Arc::new(MemoryRepository::new());
    let mut store = DashboardStore::new(StoreConfig::default(), repo.clone());
    store.load_dashboard("d1").unwrap();
    store.add_widget(text_widget(0.0, 0.0));
    let before = store.history().clone();

    assert!(store.save_dashboard().unwrap());
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.load("d1").unwrap().as_ref(), store.active_dashboard());
    assert_eq!(store.history(), &before);
}

#[test]
fn save_error_is_reported() {
    let repo = Arc::new(MemoryRepository::new());
    let mut store = DashboardStore::new(StoreConfig::default(), repo);
    store.load_dashboard("d1").unwrap();
    store.repo = Arc::new(FailingRepo);
    assert!(matches!(store.save_dashboard(), Err(StoreError::Save { .. })));
}

// =============================================================
// Remote patches
// =============================================================

#[test]
fn remote_layout_bypasses_history() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let past = store.history().past().count();
    let remote = Layout::new(100.0, 40.0, 300.0, 150.0);

    assert!(store.apply_remote_layout(&id, remote));
    assert_eq!(store.history().past().count(), past);
    assert_eq!(layout_of(&store, &id), Some(remote));
}

#[test]
fn remote_layout_for_unknown_widget_is_ignored() {
    let mut store = loaded("d1");
    assert!(!store.apply_remote_layout("ghost", Layout::default()));
}

#[test]
fn remote_layout_equal_to_current_is_ignored() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    assert!(!store.apply_remote_layout(&id, Layout::new(0.0, 0.0, 300.0, 150.0)));
}

// =============================================================
// Events
// =============================================================

#[test]
fn commands_broadcast_events() {
    let mut store = loaded("d1");
    let mut rx = store.subscribe();
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let moved = Layout::new(3.0, 4.0, 300.0, 150.0);
    store.update_widget(&id, WidgetPatch::layout(moved));
    store.undo();
    store.remove_widget(&id);

    assert_eq!(
        rx.try_recv().unwrap(),
        StoreEvent::WidgetAdded { widget_id: id.clone(), layout: Layout::new(0.0, 0.0, 300.0, 150.0) }
    );
    assert_eq!(rx.try_recv().unwrap(), StoreEvent::WidgetUpdated { widget_id: id.clone(), layout: Some(moved) });
    assert_eq!(
        rx.try_recv().unwrap(),
        StoreEvent::HistoryRestored {
            step: HistoryStep::Undo,
            layouts: vec![(id.clone(), Layout::new(0.0, 0.0, 300.0, 150.0))],
            removed: vec![],
        }
    );
    assert_eq!(rx.try_recv().unwrap(), StoreEvent::WidgetRemoved { widget_id: id });
    assert!(rx.try_recv().is_err());
}

#[test]
fn undo_of_add_reports_removal() {
    let mut store = loaded("d1");
    let id = store.add_widget(text_widget(0.0, 0.0)).unwrap();
    let mut rx = store.subscribe();
    store.undo();
    assert_eq!(
        rx.try_recv().unwrap(),
        StoreEvent::HistoryRestored { step: HistoryStep::Undo, layouts: vec![], removed: vec![id] }
    );
}

#[test]
fn noop_commands_emit_nothing() {
    let mut store = loaded("d1");
    let mut rx = store.subscribe();
    store.update_widget("ghost", WidgetPatch::layout(Layout::default()));
    store.remove_widget("ghost");
    store.undo();
    store.redo();
    assert!(rx.try_recv().is_err());
}

#[test]
fn emitting_without_subscribers_is_harmless() {
    let mut store = loaded("d1");
    assert!(store.add_widget(text_widget(0.0, 0.0)).is_some());
}
