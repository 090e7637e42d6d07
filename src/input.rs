//! Input: hit-testing and the drag/resize gesture state machine.
//!
//! `InputState` is the active gesture tracked between pointer-down and
//! pointer-up. It carries the start layout and the latest computed layout,
//! so every pointer-move yields a live [`Action::Preview`] while only
//! pointer-up yields an [`Action::Commit`] for the store to record. A
//! gesture that never changed the layout commits nothing.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use tracing::trace;

use crate::geometry::{CanvasBounds, Point, ResizeHandle, ResizeMode, drag_offset, drag_to, resize};
use crate::model::{Dashboard, Layout, WidgetId};

/// Side length of a resize handle's square hit region, in pixels.
pub const HANDLE_SIZE_PX: f64 = 8.0;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Uncommitted layout during a gesture. Mirrored to peers, not recorded.
    Preview { id: WidgetId, layout: Layout },
    /// Final layout at gesture end. Recorded once in history.
    Commit { id: WidgetId, layout: Layout },
    SetCursor(String),
}

/// Which part of a widget was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(ResizeHandle),
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub widget_id: WidgetId,
    pub part: HitPart,
}

/// Find the widget under `pt`, preferring resize handles over bodies.
///
/// Widgets later in reading order are drawn on top and win ties.
#[must_use]
pub fn hit_test(dashboard: &Dashboard, bounds: &CanvasBounds, pt: Point) -> Option<Hit> {
    let widgets = dashboard.sorted_widgets();
    for widget in widgets.iter().rev() {
        if let Some(handle) = handle_at(bounds, &widget.layout, pt) {
            return Some(Hit { widget_id: widget.id.clone(), part: HitPart::Handle(handle) });
        }
    }
    widgets
        .iter()
        .rev()
        .find(|w| bounds.contains(&w.layout, pt))
        .map(|w| Hit { widget_id: w.id.clone(), part: HitPart::Body })
}

/// The handle whose square is centered on an edge midpoint or corner of the drawn box.
fn handle_at(bounds: &CanvasBounds, layout: &Layout, pt: Point) -> Option<ResizeHandle> {
    let origin = bounds.origin_of(layout);
    let (left, top) = (origin.x, origin.y);
    let (right, bottom) = (left + layout.width, top + layout.height);
    let (mid_x, mid_y) = (left + layout.width / 2.0, top + layout.height / 2.0);
    let half = HANDLE_SIZE_PX / 2.0;
    ResizeHandle::ALL.into_iter().find(|handle| {
        let cx = if handle.moves_west() {
            left
        } else if handle.moves_east() {
            right
        } else {
            mid_x
        };
        let cy = if handle.moves_north() {
            top
        } else if handle.moves_south() {
            bottom
        } else {
            mid_y
        };
        (pt.x - cx).abs() <= half && (pt.y - cy).abs() <= half
    })
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is moving a widget across the canvas.
    Dragging {
        id: WidgetId,
        /// Pointer offset within the widget's box at drag start.
        offset: Point,
        start: Layout,
        current: Layout,
    },
    /// The user is resizing a widget by one of its eight handles.
    Resizing {
        id: WidgetId,
        handle: ResizeHandle,
        start_pointer: Point,
        start: Layout,
        current: Layout,
    },
}

/// Turns pointer events into preview and commit actions.
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    pub bounds: CanvasBounds,
    pub resize_mode: ResizeMode,
    state: InputState,
}

impl GestureController {
    #[must_use]
    pub fn new(bounds: CanvasBounds, resize_mode: ResizeMode) -> Self {
        Self { bounds, resize_mode, state: InputState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Widget and layout of the in-flight gesture, if any.
    #[must_use]
    pub fn preview(&self) -> Option<(&str, Layout)> {
        match &self.state {
            InputState::Idle => None,
            InputState::Dragging { id, current, .. } | InputState::Resizing { id, current, .. } => {
                Some((id.as_str(), *current))
            }
        }
    }

    /// Begin a gesture on whatever is under `pt`.
    pub fn on_pointer_down(&mut self, dashboard: &Dashboard, pt: Point) -> Vec<Action> {
        let Some(hit) = hit_test(dashboard, &self.bounds, pt) else {
            return Vec::new();
        };
        let Some(layout) = dashboard.get(&hit.widget_id).map(|w| w.layout) else {
            return Vec::new();
        };
        match hit.part {
            HitPart::Body => {
                self.begin_drag(hit.widget_id, layout, pt);
                vec![Action::SetCursor("move".into())]
            }
            HitPart::Handle(handle) => {
                self.begin_resize(hit.widget_id, handle, layout, pt);
                vec![Action::SetCursor(handle.cursor())]
            }
        }
    }

    pub fn begin_drag(&mut self, id: WidgetId, layout: Layout, pt: Point) {
        trace!(widget_id = %id, "drag start");
        let offset = drag_offset(&self.bounds, &layout, pt);
        self.state = InputState::Dragging { id, offset, start: layout, current: layout };
    }

    pub fn begin_resize(&mut self, id: WidgetId, handle: ResizeHandle, layout: Layout, pt: Point) {
        trace!(widget_id = %id, %handle, "resize start");
        self.state = InputState::Resizing { id, handle, start_pointer: pt, start: layout, current: layout };
    }

    /// Recompute the gesture's layout. Emits a preview only when it changed.
    pub fn on_pointer_move(&mut self, pt: Point) -> Vec<Action> {
        let bounds = self.bounds;
        let mode = self.resize_mode;
        let (id, next, current) = match &mut self.state {
            InputState::Idle => return Vec::new(),
            InputState::Dragging { id, offset, start, current } => (id, drag_to(&bounds, start, *offset, pt), current),
            InputState::Resizing { id, handle, start_pointer, start, current } => {
                let (dx, dy) = (pt.x - start_pointer.x, pt.y - start_pointer.y);
                (id, resize(start, *handle, dx, dy, mode), current)
            }
        };
        if next == *current {
            return Vec::new();
        }
        *current = next;
        vec![Action::Preview { id: id.clone(), layout: next }]
    }

    /// End the gesture, committing the last computed layout if it moved.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        match std::mem::take(&mut self.state) {
            InputState::Idle => return actions,
            InputState::Dragging { id, start, current, .. } | InputState::Resizing { id, start, current, .. } => {
                if current != start {
                    trace!(widget_id = %id, "gesture commit");
                    actions.push(Action::Commit { id, layout: current });
                }
            }
        }
        actions.push(Action::SetCursor("default".into()));
        actions
    }

    /// Abandon the gesture if it targets `id` (the widget vanished mid-gesture).
    pub fn cancel_for(&mut self, id: &str) -> bool {
        if self.preview().is_some_and(|(active, _)| active == id) {
            self.state = InputState::Idle;
            return true;
        }
        false
    }
}
