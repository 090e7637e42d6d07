//! Geometry: pure drag and resize math for widgets on a padded canvas.
//!
//! All points are canvas coordinates: pixels from the canvas's top-left
//! corner, padding included. Widget layouts are relative to the padded area,
//! so a widget at `x = 0` is drawn `padding` pixels from the canvas edge.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use std::fmt;
use std::str::FromStr;

use crate::consts::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_PADDING, DEFAULT_CANVAS_WIDTH, MIN_WIDGET_HEIGHT, MIN_WIDGET_WIDTH};
use crate::model::Layout;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Canvas size and its inner padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self { width: DEFAULT_CANVAS_WIDTH, height: DEFAULT_CANVAS_HEIGHT, padding: DEFAULT_CANVAS_PADDING }
    }
}

impl CanvasBounds {
    #[must_use]
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self { width, height, padding }
    }

    /// Largest legal top-left for a widget of the given size. Never negative.
    #[must_use]
    pub fn max_position(&self, width: f64, height: f64) -> Point {
        Point::new(
            (self.width - width - 2.0 * self.padding).max(0.0),
            (self.height - height - 2.0 * self.padding).max(0.0),
        )
    }

    /// Clamp a candidate top-left into `[0, canvas - size - 2 * padding]` on both axes.
    #[must_use]
    pub fn clamp_position(&self, x: f64, y: f64, width: f64, height: f64) -> Point {
        let max = self.max_position(width, height);
        Point::new(x.min(max.x).max(0.0), y.min(max.y).max(0.0))
    }

    /// Top-left corner where `layout` is drawn, in canvas coordinates.
    #[must_use]
    pub fn origin_of(&self, layout: &Layout) -> Point {
        Point::new(layout.x + self.padding, layout.y + self.padding)
    }

    /// Whether `pt` falls inside the drawn box of `layout`.
    #[must_use]
    pub fn contains(&self, layout: &Layout, pt: Point) -> bool {
        let origin = self.origin_of(layout);
        pt.x >= origin.x && pt.x <= origin.x + layout.width && pt.y >= origin.y && pt.y <= origin.y + layout.height
    }
}

// =============================================================================
// DRAG
// =============================================================================

/// Pointer offset within the widget's box at drag start.
#[must_use]
pub fn drag_offset(bounds: &CanvasBounds, layout: &Layout, pointer: Point) -> Point {
    let origin = bounds.origin_of(layout);
    Point::new(pointer.x - origin.x, pointer.y - origin.y)
}

/// Layout after dragging so the pointer keeps `offset` within the box.
///
/// Size is unchanged; the position is clamped to the canvas.
#[must_use]
pub fn drag_to(bounds: &CanvasBounds, layout: &Layout, offset: Point, pointer: Point) -> Layout {
    let x = pointer.x - offset.x - bounds.padding;
    let y = pointer.y - offset.y - bounds.padding;
    let clamped = bounds.clamp_position(x, y, layout.width, layout.height);
    layout.with_position(clamped.x, clamped.y)
}

// =============================================================================
// RESIZE
// =============================================================================

/// One of the eight resize handles, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    pub const ALL: [Self; 8] = [Self::N, Self::S, Self::E, Self::W, Self::Ne, Self::Nw, Self::Se, Self::Sw];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::S => "s",
            Self::E => "e",
            Self::W => "w",
            Self::Ne => "ne",
            Self::Nw => "nw",
            Self::Se => "se",
            Self::Sw => "sw",
        }
    }

    /// Cursor name the host shows over this handle.
    #[must_use]
    pub fn cursor(self) -> String {
        format!("{}-resize", self.as_str())
    }

    #[must_use]
    pub fn moves_north(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    #[must_use]
    pub fn moves_south(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    #[must_use]
    pub fn moves_east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    #[must_use]
    pub fn moves_west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }
}

impl fmt::Display for ResizeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resize direction: {0:?}")]
pub struct UnknownHandle(pub String);

impl FromStr for ResizeHandle {
    type Err = UnknownHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| UnknownHandle(s.to_owned()))
    }
}

/// How a resize treats the widget's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Only width and height change; `x`/`y` stay where they were.
    #[default]
    SizeOnly,
    /// North and west resizes move the top-left so the opposite edge stays put.
    AnchorOppositeEdge,
}

/// Layout after dragging `handle` by `(dx, dy)` from the gesture start.
///
/// East adds `dx` to the width and west subtracts it; south adds `dy` to the
/// height and north subtracts it. Width never drops below
/// [`MIN_WIDGET_WIDTH`] and height never below [`MIN_WIDGET_HEIGHT`].
#[must_use]
pub fn resize(start: &Layout, handle: ResizeHandle, dx: f64, dy: f64, mode: ResizeMode) -> Layout {
    let mut width = start.width;
    let mut height = start.height;
    if handle.moves_east() {
        width = start.width + dx;
    }
    if handle.moves_west() {
        width = start.width - dx;
    }
    if handle.moves_south() {
        height = start.height + dy;
    }
    if handle.moves_north() {
        height = start.height - dy;
    }
    let width = width.max(MIN_WIDGET_WIDTH);
    let height = height.max(MIN_WIDGET_HEIGHT);

    let (x, y) = match mode {
        ResizeMode::SizeOnly => (start.x, start.y),
        ResizeMode::AnchorOppositeEdge => (
            if handle.moves_west() { start.x + start.width - width } else { start.x },
            if handle.moves_north() { start.y + start.height - height } else { start.y },
        ),
    };
    Layout::new(x, y, width, height)
}
