//! Shared constants for the dashboard engine.

// ── Geometry ────────────────────────────────────────────────────

/// Smallest width a resize gesture may produce, in canvas pixels.
pub const MIN_WIDGET_WIDTH: f64 = 100.0;

/// Smallest height a resize gesture may produce, in canvas pixels.
pub const MIN_WIDGET_HEIGHT: f64 = 50.0;

/// Inner padding between the canvas border and the widget area.
pub const DEFAULT_CANVAS_PADDING: f64 = 20.0;

pub const DEFAULT_CANVAS_WIDTH: f64 = 1200.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 800.0;

// ── Dashboards ──────────────────────────────────────────────────

/// Column count of the default grid layout.
pub const DEFAULT_GRID_COLS: u32 = 12;

/// Row height of the default grid layout, in pixels.
pub const DEFAULT_GRID_ROW_HEIGHT: u32 = 50;

/// Maximum number of undo snapshots kept before the oldest is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Buffer size of the store's change-notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ── Collaboration ───────────────────────────────────────────────

/// Name of the shared-document map that mirrors widget layouts.
pub const LAYOUT_MAP_NAME: &str = "dashboard-state";

/// Presence color used when a peer does not publish one.
pub const DEFAULT_PRESENCE_COLOR: &str = "#000000";

// ── Host integration ────────────────────────────────────────────

/// Drag payload key carrying the widget kind token from the widget panel.
pub const DRAG_PAYLOAD_WIDGET_TYPE: &str = "widgetType";

/// Preference key holding the active theme name.
pub const THEME_PREF_KEY: &str = "dashboard-theme";
