#![allow(clippy::float_cmp)]

use super::*;
use crate::model::NewWidget;
use crate::widget::{ChartConfig, WidgetConfig};

fn board() -> Dashboard {
    let mut d = Dashboard::new("d1");
    d.insert(
        NewWidget::new(WidgetConfig::Chart(ChartConfig::default()), Layout::new(100.0, 100.0, 400.0, 300.0))
            .into_widget("w1".into()),
    );
    d
}

fn controller() -> GestureController {
    GestureController::new(CanvasBounds::new(800.0, 600.0, 20.0), ResizeMode::SizeOnly)
}

fn commits(actions: &[Action]) -> Vec<&Action> {
    actions.iter().filter(|a| matches!(a, Action::Commit { .. })).collect()
}

// =============================================================
// Hit testing
// =============================================================

#[test]
fn hit_body() {
    let hit = hit_test(&board(), &CanvasBounds::new(800.0, 600.0, 20.0), Point::new(300.0, 300.0));
    assert_eq!(hit, Some(Hit { widget_id: "w1".into(), part: HitPart::Body }));
}

#[test]
fn hit_corner_handle() {
    // Drawn box spans (120,120)..(520,420).
    let bounds = CanvasBounds::new(800.0, 600.0, 20.0);
    let hit = hit_test(&board(), &bounds, Point::new(521.0, 419.0));
    assert_eq!(hit.map(|h| h.part), Some(HitPart::Handle(ResizeHandle::Se)));
    let hit = hit_test(&board(), &bounds, Point::new(320.0, 118.0));
    assert_eq!(hit.map(|h| h.part), Some(HitPart::Handle(ResizeHandle::N)));
}

#[test]
fn hit_empty_canvas() {
    assert!(hit_test(&board(), &CanvasBounds::new(800.0, 600.0, 20.0), Point::new(700.0, 550.0)).is_none());
}

// =============================================================
// Drag
// =============================================================

#[test]
fn pointer_down_on_body_starts_drag() {
    let mut c = controller();
    let actions = c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    assert_eq!(actions, vec![Action::SetCursor("move".into())]);
    assert!(matches!(c.state(), InputState::Dragging { .. }));
}

#[test]
fn pointer_down_on_empty_space_is_ignored() {
    let mut c = controller();
    assert!(c.on_pointer_down(&board(), Point::new(700.0, 550.0)).is_empty());
    assert!(matches!(c.state(), InputState::Idle));
}

#[test]
fn drag_previews_every_move_and_commits_once() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    let first = c.on_pointer_move(Point::new(310.0, 300.0));
    let second = c.on_pointer_move(Point::new(320.0, 305.0));
    assert_eq!(first, vec![Action::Preview { id: "w1".into(), layout: Layout::new(110.0, 100.0, 400.0, 300.0) }]);
    assert_eq!(second, vec![Action::Preview { id: "w1".into(), layout: Layout::new(120.0, 105.0, 400.0, 300.0) }]);
    assert_eq!(c.preview(), Some(("w1", Layout::new(120.0, 105.0, 400.0, 300.0))));

    let up = c.on_pointer_up();
    assert_eq!(commits(&up), vec![&Action::Commit { id: "w1".into(), layout: Layout::new(120.0, 105.0, 400.0, 300.0) }]);
    assert!(c.preview().is_none());
}

#[test]
fn repeated_identical_move_emits_nothing() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    c.on_pointer_move(Point::new(310.0, 300.0));
    assert!(c.on_pointer_move(Point::new(310.0, 300.0)).is_empty());
}

#[test]
fn click_without_motion_commits_nothing() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    assert!(commits(&c.on_pointer_up()).is_empty());
}

#[test]
fn drag_back_to_start_commits_nothing() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    c.on_pointer_move(Point::new(350.0, 300.0));
    c.on_pointer_move(Point::new(300.0, 300.0));
    assert!(commits(&c.on_pointer_up()).is_empty());
}

#[test]
fn drag_preview_is_clamped() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    let actions = c.on_pointer_move(Point::new(5_000.0, -5_000.0));
    assert_eq!(actions, vec![Action::Preview { id: "w1".into(), layout: Layout::new(360.0, 0.0, 400.0, 300.0) }]);
}

// =============================================================
// Resize
// =============================================================

#[test]
fn resize_from_handle_hit() {
    let mut c = controller();
    let down = c.on_pointer_down(&board(), Point::new(520.0, 420.0));
    assert_eq!(down, vec![Action::SetCursor("se-resize".into())]);
    let moved = c.on_pointer_move(Point::new(540.0, 430.0));
    assert_eq!(moved, vec![Action::Preview { id: "w1".into(), layout: Layout::new(100.0, 100.0, 420.0, 310.0) }]);
}

#[test]
fn resize_floor_holds_during_gesture() {
    let mut c = controller();
    c.begin_resize("w1".into(), ResizeHandle::Sw, Layout::new(0.0, 0.0, 300.0, 150.0), Point::new(0.0, 0.0));
    c.on_pointer_move(Point::new(10_000.0, -10_000.0));
    let up = c.on_pointer_up();
    assert_eq!(commits(&up), vec![&Action::Commit { id: "w1".into(), layout: Layout::new(0.0, 0.0, 100.0, 50.0) }]);
}

#[test]
fn anchored_mode_moves_origin() {
    let mut c = GestureController::new(CanvasBounds::default(), ResizeMode::AnchorOppositeEdge);
    c.begin_resize("w1".into(), ResizeHandle::W, Layout::new(100.0, 0.0, 300.0, 150.0), Point::new(120.0, 50.0));
    let actions = c.on_pointer_move(Point::new(140.0, 50.0));
    assert_eq!(actions, vec![Action::Preview { id: "w1".into(), layout: Layout::new(120.0, 0.0, 280.0, 150.0) }]);
}

// =============================================================
// Cancel
// =============================================================

#[test]
fn cancel_for_matching_widget() {
    let mut c = controller();
    c.on_pointer_down(&board(), Point::new(300.0, 300.0));
    assert!(!c.cancel_for("other"));
    assert!(c.cancel_for("w1"));
    assert!(c.on_pointer_up().is_empty());
}

#[test]
fn pointer_up_when_idle_is_empty() {
    assert!(controller().on_pointer_up().is_empty());
}
