//! Dashboard data model: widgets, their layouts, and dashboards.
//!
//! This module defines the value types the store snapshots into history
//! (`Dashboard`, `Widget`, `Layout`) and the sparse update applied by
//! `update_widget` (`WidgetPatch`). Everything here is plain data: cloning a
//! `Dashboard` produces a structurally independent snapshot.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{DEFAULT_GRID_COLS, DEFAULT_GRID_ROW_HEIGHT};
use crate::widget::WidgetConfig;

/// Opaque, globally unique widget identifier.
pub type WidgetId = String;

/// Dashboard identifier; also scopes the collaboration session.
pub type DashboardId = String;

/// Generate a fresh widget id.
#[must_use]
pub fn new_widget_id() -> WidgetId {
    Uuid::new_v4().to_string()
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Position and size of a widget in canvas-pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Left edge relative to the padded canvas area.
    pub x: f64,
    /// Top edge relative to the padded canvas area.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Copy of this layout moved to `(x, y)`.
    #[must_use]
    pub fn with_position(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    /// Copy of this layout resized to `width` × `height`.
    #[must_use]
    pub fn with_size(self, width: f64, height: f64) -> Self {
        Self { width, height, ..self }
    }
}

// =============================================================================
// WIDGET
// =============================================================================

/// A positioned, resizable widget on a dashboard canvas.
///
/// Serialized as `{id, type, config, layout}`; the `type` tag and the
/// `config` payload both come from [`WidgetConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    #[serde(flatten)]
    pub config: WidgetConfig,
    pub layout: Layout,
}

impl Widget {
    /// The widget's kind tag (`"chart"`, `"text"`, ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        self.config.kind()
    }
}

/// A widget as submitted to `add_widget`, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWidget {
    #[serde(flatten)]
    pub config: WidgetConfig,
    pub layout: Layout,
}

impl NewWidget {
    #[must_use]
    pub fn new(config: WidgetConfig, layout: Layout) -> Self {
        Self { config, layout }
    }

    /// Attach an id, producing the full widget.
    #[must_use]
    pub fn into_widget(self, id: WidgetId) -> Widget {
        Widget { id, config: self.config, layout: self.layout }
    }
}

/// Sparse update for a widget. Only present fields are applied.
///
/// `layout` replaces the whole layout rather than merging per field, since
/// geometry operations always supply it whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<WidgetConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
}

impl WidgetPatch {
    #[must_use]
    pub fn layout(layout: Layout) -> Self {
        Self { layout: Some(layout), ..Default::default() }
    }

    #[must_use]
    pub fn config(config: WidgetConfig) -> Self {
        Self { config: Some(config), ..Default::default() }
    }

    /// Returns `true` if the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.layout.is_none()
    }

    /// Shallow-merge this patch onto `widget`.
    pub fn apply_to(&self, widget: &mut Widget) {
        if let Some(ref config) = self.config {
            widget.config = config.clone();
        }
        if let Some(layout) = self.layout {
            widget.layout = layout;
        }
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Arrangement strategy of a dashboard canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Grid,
    Flex,
    Freeform,
}

/// Dashboard-level layout: a strategy tag plus its free-form settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayout {
    #[serde(rename = "type")]
    pub kind: LayoutKind,
    pub config: serde_json::Value,
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            kind: LayoutKind::Grid,
            config: serde_json::json!({
                "cols": DEFAULT_GRID_COLS,
                "rowHeight": DEFAULT_GRID_ROW_HEIGHT,
            }),
        }
    }
}

/// A named canvas of widgets.
///
/// Every key of `widgets` equals its value's `id`; the only writers are the
/// methods below, which maintain that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_widgets")]
    widgets: HashMap<WidgetId, Widget>,
    pub layout: DashboardLayout,
}

/// Rebuild the widget map from each widget's own id, ignoring the keys on the wire.
fn deserialize_widgets<'de, D>(deserializer: D) -> Result<HashMap<WidgetId, Widget>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = HashMap::<String, Widget>::deserialize(deserializer)?;
    Ok(raw.into_values().map(|w| (w.id.clone(), w)).collect())
}

impl Dashboard {
    /// Create an empty dashboard named `Dashboard <id>` with the default grid.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: format!("Dashboard {id}"),
            widgets: HashMap::new(),
            layout: DashboardLayout::default(),
        }
    }

    /// Insert or replace a widget, keyed by its own id.
    pub fn insert(&mut self, widget: Widget) {
        self.widgets.insert(widget.id.clone(), widget);
    }

    /// Remove a widget by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Widget> {
        self.widgets.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Widget> {
        self.widgets.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Widget> {
        self.widgets.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.widgets.contains_key(id)
    }

    /// Iterate widgets in arbitrary order.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.values()
    }

    /// Widgets sorted top-to-bottom, then left-to-right, then by id.
    #[must_use]
    pub fn sorted_widgets(&self) -> Vec<&Widget> {
        let mut widgets: Vec<&Widget> = self.widgets.values().collect();
        widgets.sort_by(|a, b| {
            a.layout
                .y
                .total_cmp(&b.layout.y)
                .then_with(|| a.layout.x.total_cmp(&b.layout.x))
                .then_with(|| a.id.cmp(&b.id))
        });
        widgets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
