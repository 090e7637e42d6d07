//! Rendering: turns widgets into plain-text panels.
//!
//! Renderers receive read-only views of a widget's config and its data-fetch
//! state and produce lines of text. They never mutate application state;
//! in-place edits go back through `DashboardStore::update_widget`.
//!
//! Every renderer must cope with absent data, `loading == true` and an error
//! string without failing, so [`WidgetRenderer::render`] is infallible.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde_json::Value;

use crate::model::{Dashboard, Widget};
use crate::widget::{ChartConfig, ImageConfig, MetricConfig, TableConfig, TextConfig, Trend, WidgetConfig, WidgetRegistry};

/// Shown in place of a body whose kind has no registered renderer.
pub const UNKNOWN_KIND_LABEL: &str = "Unknown widget type";

/// Inputs to a widget renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderProps<'a> {
    pub config: &'a WidgetConfig,
    pub data: Option<&'a Value>,
    pub loading: bool,
    pub error: Option<&'a str>,
}

impl<'a> RenderProps<'a> {
    /// Props for a widget with no data source attached.
    #[must_use]
    pub fn static_config(config: &'a WidgetConfig) -> Self {
        Self { config, data: None, loading: false, error: None }
    }
}

/// Renders one widget body. Implementations must not fail for any props.
pub trait WidgetRenderer: Send + Sync {
    fn render(&self, props: &RenderProps<'_>) -> Vec<String>;
}

/// Renderer for the five built-in kinds. Custom kinds render their raw config.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl WidgetRenderer for BuiltinRenderer {
    fn render(&self, props: &RenderProps<'_>) -> Vec<String> {
        match props.config {
            WidgetConfig::Chart(c) => render_chart(c, props),
            WidgetConfig::Text(c) => render_text(c),
            WidgetConfig::Metric(c) => render_metric(c),
            WidgetConfig::Table(c) => render_table(c),
            WidgetConfig::Image(c) => render_image(c),
            WidgetConfig::Custom { config, .. } => vec![config.to_string()],
        }
    }
}

// =============================================================================
// PANELS
// =============================================================================

/// Render a widget as a header line (kind and geometry) followed by its body.
///
/// The body comes from the kind's registered renderer; kinds missing from
/// `registry` get the unknown-kind placeholder.
#[must_use]
pub fn render_widget(widget: &Widget, registry: &WidgetRegistry, props: &RenderProps<'_>) -> Vec<String> {
    let l = widget.layout;
    let mut lines = vec![format!("[{}] {}x{} @ ({}, {})", widget.kind(), l.width, l.height, l.x, l.y)];
    match registry.get(widget.kind()) {
        Some(definition) => lines.extend(definition.renderer.render(props).into_iter().map(|line| format!("  {line}"))),
        None => lines.push(format!("  {UNKNOWN_KIND_LABEL}: {}", widget.kind())),
    }
    lines
}

/// Render every widget of `dashboard`, top-left first, with static props.
#[must_use]
pub fn render_dashboard(dashboard: &Dashboard, registry: &WidgetRegistry) -> String {
    let mut out = format!("{} ({} widgets)\n", dashboard.name, dashboard.len());
    for widget in dashboard.sorted_widgets() {
        for line in render_widget(widget, registry, &RenderProps::static_config(&widget.config)) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

// =============================================================================
// BODIES
// =============================================================================

fn render_chart(config: &ChartConfig, props: &RenderProps<'_>) -> Vec<String> {
    if props.loading {
        return vec!["Loading chart...".into()];
    }
    if let Some(error) = props.error {
        return vec![format!("Error: {error}")];
    }
    let title = if config.title.is_empty() { "Chart" } else { config.title.as_str() };
    let Some(data) = props.data else {
        return vec![title.to_owned(), "No data available".into()];
    };
    let points = data
        .pointer("/datasets/0/data")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    vec![title.to_owned(), format!("{} Chart", config.chart_type), format!("{points} data points")]
}

fn render_text(config: &TextConfig) -> Vec<String> {
    config.content.lines().map(str::to_owned).collect()
}

fn render_metric(config: &MetricConfig) -> Vec<String> {
    let arrow = match config.trend {
        Trend::Up => "↗",
        Trend::Down => "↘",
        Trend::Neutral => "→",
    };
    let value = if config.unit.is_empty() {
        config.value.clone()
    } else {
        format!("{} {}", config.value, config.unit)
    };
    vec![config.title.clone(), value, format!("{arrow} {}", config.trend_value)]
}

fn render_table(config: &TableConfig) -> Vec<String> {
    let mut lines = Vec::with_capacity(config.data.len() + 2);
    if !config.title.is_empty() {
        lines.push(config.title.clone());
    }
    lines.push(config.columns.join(" | "));
    lines.extend(config.data.iter().map(|row| row.join(" | ")));
    lines
}

fn render_image(config: &ImageConfig) -> Vec<String> {
    vec![format!("<img {} \"{}\" fit={:?}>", config.src, config.alt, config.fit)]
}
