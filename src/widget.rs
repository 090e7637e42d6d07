//! Widget kinds: typed configuration payloads, the kind registry, and
//! free-form config editing.
//!
//! DESIGN
//! ======
//! A widget's `type` tag and its `config` payload travel together as one
//! [`WidgetConfig`] variant, so a chart can never carry a table's config.
//! Built-in kinds get typed structs; anything else is kept verbatim in
//! [`WidgetConfig::Custom`]. The store copies configs but never inspects them.
//!
//! [`WidgetRegistry`] maps a kind tag to its definition (display metadata,
//! default config, default size, renderer). New kinds are added by
//! registering a definition; the store and geometry code never change.
//!
//! ERROR HANDLING
//! ==============
//! Config text typed by a user is parsed before it reaches the store. A
//! parse failure reverts the draft to the last accepted value and leaves the
//! store untouched.

#[cfg(test)]
#[path = "widget_test.rs"]
mod widget_test;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Layout, NewWidget, Widget, WidgetId, WidgetPatch};
use crate::render::{BuiltinRenderer, WidgetRenderer};
use crate::store::DashboardStore;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("unknown widget kind: {0}")]
    UnknownKind(String),
    #[error("invalid {kind} config: {source}")]
    InvalidConfig {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed config JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Line/bar/pie chart settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartConfig {
    pub chart_type: String,
    pub title: String,
    pub data_source: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { chart_type: "line".into(), title: "Chart Title".into(), data_source: "mock".into() }
    }
}

/// Formatted text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextConfig {
    pub content: String,
    pub font_size: f64,
    pub font_weight: String,
    pub text_align: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: "Enter your text here...".into(),
            font_size: 16.0,
            font_weight: "normal".into(),
            text_align: "left".into(),
        }
    }
}

/// Direction indicator shown next to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[default]
    Up,
    Down,
    #[serde(other)]
    Neutral,
}

/// Single key figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricConfig {
    pub title: String,
    pub value: String,
    pub unit: String,
    pub trend: Trend,
    pub trend_value: String,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            title: "Metric Title".into(),
            value: "0".into(),
            unit: String::new(),
            trend: Trend::Up,
            trend_value: "+5%".into(),
        }
    }
}

/// Static table; every row is a list of cell strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub title: String,
    pub columns: Vec<String>,
    pub data: Vec<Vec<String>>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            title: "Table Title".into(),
            columns: vec!["Name".into(), "Value".into(), "Status".into()],
            data: vec![
                vec!["Item 1".into(), "100".into(), "Active".into()],
                vec!["Item 2".into(), "200".into(), "Inactive".into()],
            ],
        }
    }
}

/// How an image fills its box. Unrecognized values fall back to `cover`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    Contain,
    Fill,
    #[serde(rename = "none")]
    NoScale,
    #[default]
    #[serde(other)]
    Cover,
}

/// Image or logo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub src: String,
    pub alt: String,
    pub fit: ImageFit,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            src: "https://via.placeholder.com/300x200".into(),
            alt: "Image description".into(),
            fit: ImageFit::Cover,
        }
    }
}

/// A widget's kind tag together with its kind-specific config.
///
/// On the wire this is the pair `{"type": <kind>, "config": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawWidgetConfig")]
pub enum WidgetConfig {
    Chart(ChartConfig),
    Text(TextConfig),
    Metric(MetricConfig),
    Table(TableConfig),
    Image(ImageConfig),
    /// A kind registered at runtime; its config is carried untouched.
    Custom { kind: String, config: Value },
}

/// Wire form of [`WidgetConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWidgetConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: Value,
}

impl WidgetConfig {
    /// The kind tag (`"chart"`, `"text"`, `"metric"`, `"table"`, `"image"`, or a custom tag).
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Chart(_) => "chart",
            Self::Text(_) => "text",
            Self::Metric(_) => "metric",
            Self::Table(_) => "table",
            Self::Image(_) => "image",
            Self::Custom { kind, .. } => kind.as_str(),
        }
    }

    /// Build a config from a kind tag and a JSON payload.
    ///
    /// A `null` payload yields the kind's defaults; missing fields of a
    /// built-in kind are filled from its defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a built-in kind's payload has the wrong shape.
    pub fn from_parts(kind: &str, config: Value) -> Result<Self, WidgetError> {
        Ok(match kind {
            "chart" => Self::Chart(parse_payload(kind, config)?),
            "text" => Self::Text(parse_payload(kind, config)?),
            "metric" => Self::Metric(parse_payload(kind, config)?),
            "table" => Self::Table(parse_payload(kind, config)?),
            "image" => Self::Image(parse_payload(kind, config)?),
            other => Self::Custom { kind: other.to_owned(), config },
        })
    }

    /// The config payload as JSON, without the kind tag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a built-in config cannot be encoded.
    pub fn payload(&self) -> Result<Value, WidgetError> {
        let value = match self {
            Self::Chart(c) => serde_json::to_value(c),
            Self::Text(c) => serde_json::to_value(c),
            Self::Metric(c) => serde_json::to_value(c),
            Self::Table(c) => serde_json::to_value(c),
            Self::Image(c) => serde_json::to_value(c),
            Self::Custom { config, .. } => return Ok(config.clone()),
        };
        value.map_err(|source| WidgetError::InvalidConfig { kind: self.kind().to_owned(), source })
    }
}

fn parse_payload<T: DeserializeOwned + Default>(kind: &str, config: Value) -> Result<T, WidgetError> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config).map_err(|source| WidgetError::InvalidConfig { kind: kind.to_owned(), source })
}

impl TryFrom<RawWidgetConfig> for WidgetConfig {
    type Error = WidgetError;

    fn try_from(raw: RawWidgetConfig) -> Result<Self, Self::Error> {
        Self::from_parts(&raw.kind, raw.config)
    }
}

impl Serialize for WidgetConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let config = self.payload().map_err(serde::ser::Error::custom)?;
        RawWidgetConfig { kind: self.kind().to_owned(), config }.serialize(serializer)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Default width and height of a newly created widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Everything the host needs to offer and create a widget kind.
#[derive(Clone)]
pub struct WidgetDefinition {
    pub kind: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub default_config: WidgetConfig,
    pub default_size: Size,
    pub renderer: Arc<dyn WidgetRenderer>,
}

impl std::fmt::Debug for WidgetDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetDefinition")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("default_size", &self.default_size)
            .finish_non_exhaustive()
    }
}

impl WidgetDefinition {
    /// A new widget of this kind at `(x, y)` with the default config and size.
    #[must_use]
    pub fn instantiate(&self, x: f64, y: f64) -> NewWidget {
        NewWidget::new(
            self.default_config.clone(),
            Layout::new(x, y, self.default_size.width, self.default_size.height),
        )
    }
}

/// Kind tag → definition. Iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    definitions: Vec<WidgetDefinition>,
}

impl WidgetRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the five built-in kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let renderer: Arc<dyn WidgetRenderer> = Arc::new(BuiltinRenderer);
        let mut registry = Self::new();
        let builtins = [
            (
                "Chart",
                "Display data in various chart formats",
                "📊",
                WidgetConfig::Chart(ChartConfig::default()),
                Size::new(400.0, 300.0),
            ),
            (
                "Text",
                "Display formatted text content",
                "📝",
                WidgetConfig::Text(TextConfig::default()),
                Size::new(300.0, 150.0),
            ),
            (
                "Metric",
                "Display a single key metric",
                "🔢",
                WidgetConfig::Metric(MetricConfig::default()),
                Size::new(200.0, 120.0),
            ),
            (
                "Table",
                "Display data in a table format",
                "📋",
                WidgetConfig::Table(TableConfig::default()),
                Size::new(500.0, 300.0),
            ),
            (
                "Image",
                "Display images or logos",
                "🖼️",
                WidgetConfig::Image(ImageConfig::default()),
                Size::new(300.0, 200.0),
            ),
        ];
        for (name, description, icon, default_config, default_size) in builtins {
            registry.register(WidgetDefinition {
                kind: default_config.kind().to_owned(),
                name: name.to_owned(),
                description: description.to_owned(),
                icon: icon.to_owned(),
                default_config,
                default_size,
                renderer: Arc::clone(&renderer),
            });
        }
        registry
    }

    /// Add a definition, replacing any existing definition of the same kind.
    pub fn register(&mut self, definition: WidgetDefinition) {
        if let Some(existing) = self.definitions.iter_mut().find(|d| d.kind == definition.kind) {
            *existing = definition;
        } else {
            self.definitions.push(definition);
        }
    }

    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&WidgetDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    /// All definitions in registration order.
    #[must_use]
    pub fn all(&self) -> &[WidgetDefinition] {
        &self.definitions
    }

    /// A new widget of `kind` at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if no definition is registered for `kind`.
    pub fn instantiate(&self, kind: &str, x: f64, y: f64) -> Result<NewWidget, WidgetError> {
        self.get(kind)
            .map(|d| d.instantiate(x, y))
            .ok_or_else(|| WidgetError::UnknownKind(kind.to_owned()))
    }
}

// =============================================================================
// CONFIG EDITING
// =============================================================================

/// Free-form JSON editor state for one widget's config.
///
/// Edits stay local to the draft until [`ConfigDraft::commit`] succeeds.
#[derive(Debug, Clone)]
pub struct ConfigDraft {
    widget_id: WidgetId,
    last_good: WidgetConfig,
    text: String,
}

impl ConfigDraft {
    /// Open a draft showing the widget's current config payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the current config cannot be encoded.
    pub fn open(widget: &Widget) -> Result<Self, WidgetError> {
        let text = render_payload(&widget.config)?;
        Ok(Self { widget_id: widget.id.clone(), last_good: widget.config.clone(), text })
    }

    #[must_use]
    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    /// Current draft text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The most recently accepted config.
    #[must_use]
    pub fn last_good(&self) -> &WidgetConfig {
        &self.last_good
    }

    /// Replace the draft text. Nothing is validated until commit.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Parse the draft as a config of the widget's kind.
    ///
    /// # Errors
    ///
    /// Returns `MalformedJson` for invalid JSON and `InvalidConfig` when the
    /// JSON does not fit the kind.
    pub fn parse(&self) -> Result<WidgetConfig, WidgetError> {
        let value: Value = serde_json::from_str(&self.text)?;
        WidgetConfig::from_parts(self.last_good.kind(), value)
    }

    /// Validate the draft and, if it parses, persist it through [`DashboardStore::update_widget`].
    ///
    /// Returns whether the store recorded a change.
    ///
    /// # Errors
    ///
    /// On a parse failure the draft text reverts to the last accepted config
    /// and the store is not touched.
    pub fn commit(&mut self, store: &mut DashboardStore) -> Result<bool, WidgetError> {
        let config = match self.parse() {
            Ok(config) => config,
            Err(e) => {
                warn!(widget_id = %self.widget_id, error = %e, "rejected config edit");
                match render_payload(&self.last_good) {
                    Ok(text) => self.text = text,
                    Err(revert) => warn!(widget_id = %self.widget_id, error = %revert, "could not restore draft text"),
                }
                return Err(e);
            }
        };
        if config == self.last_good {
            return Ok(false);
        }
        let changed = store.update_widget(&self.widget_id, WidgetPatch::config(config.clone()));
        if changed {
            debug!(widget_id = %self.widget_id, "config edit committed");
            self.last_good = config;
        }
        Ok(changed)
    }
}

fn render_payload(config: &WidgetConfig) -> Result<String, WidgetError> {
    Ok(serde_json::to_string_pretty(&config.payload()?)?)
}
