#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn store_with(config: WidgetConfig) -> (DashboardStore, Widget) {
    let mut store = DashboardStore::default();
    store.load_dashboard("d1").unwrap();
    let id = store.add_widget(NewWidget::new(config, Layout::new(0.0, 0.0, 300.0, 150.0))).unwrap();
    let widget = store.active_dashboard().unwrap().get(&id).unwrap().clone();
    (store, widget)
}

// =============================================================
// WidgetConfig
// =============================================================

#[test]
fn from_parts_null_payload_gives_defaults() {
    let c = WidgetConfig::from_parts("chart", Value::Null).unwrap();
    assert_eq!(c, WidgetConfig::Chart(ChartConfig::default()));
}

#[test]
fn from_parts_fills_missing_fields() {
    let c = WidgetConfig::from_parts("text", json!({"content": "Hi"})).unwrap();
    match c {
        WidgetConfig::Text(t) => {
            assert_eq!(t.content, "Hi");
            assert_eq!(t.font_size, 16.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn from_parts_rejects_wrong_shape() {
    let err = WidgetConfig::from_parts("table", json!({"columns": 3})).unwrap_err();
    assert!(matches!(err, WidgetError::InvalidConfig { ref kind, .. } if kind == "table"));
}

#[test]
fn unknown_kind_is_kept_verbatim() {
    let payload = json!({"anything": [1, 2]});
    let c = WidgetConfig::from_parts("gauge", payload.clone()).unwrap();
    assert_eq!(c.kind(), "gauge");
    assert_eq!(c.payload().unwrap(), payload);
}

#[test]
fn wire_form_is_type_plus_config() {
    let c = WidgetConfig::Image(ImageConfig::default());
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["type"], "image");
    assert_eq!(v["config"]["fit"], "cover");
}

#[test]
fn wire_config_is_the_payload() {
    let c = WidgetConfig::Metric(MetricConfig::default());
    let wire = serde_json::to_value(&c).unwrap();
    assert_eq!(wire["config"], c.payload().unwrap());
    assert_eq!(serde_json::from_value::<WidgetConfig>(wire).unwrap(), c);
}

#[test]
fn image_fit_unknown_falls_back_to_cover() {
    let c: ImageConfig = serde_json::from_value(json!({"fit": "stretch"})).unwrap();
    assert_eq!(c.fit, ImageFit::Cover);
    let c: ImageConfig = serde_json::from_value(json!({"fit": "none"})).unwrap();
    assert_eq!(c.fit, ImageFit::NoScale);
}

#[test]
fn metric_trend_unknown_is_neutral() {
    let c: MetricConfig = serde_json::from_value(json!({"trend": "sideways"})).unwrap();
    assert_eq!(c.trend, Trend::Neutral);
}

// =============================================================
// Registry
// =============================================================

#[test]
fn builtin_registry_lists_five_kinds_in_order() {
    let registry = WidgetRegistry::builtin();
    let kinds: Vec<&str> = registry.all().iter().map(|d| d.kind.as_str()).collect();
    assert_eq!(kinds, vec!["chart", "text", "metric", "table", "image"]);
}

#[test]
fn builtin_default_sizes() {
    let registry = WidgetRegistry::builtin();
    let size = |k: &str| registry.get(k).map(|d| d.default_size);
    assert_eq!(size("chart"), Some(Size::new(400.0, 300.0)));
    assert_eq!(size("text"), Some(Size::new(300.0, 150.0)));
    assert_eq!(size("metric"), Some(Size::new(200.0, 120.0)));
    assert_eq!(size("table"), Some(Size::new(500.0, 300.0)));
    assert_eq!(size("image"), Some(Size::new(300.0, 200.0)));
}

#[test]
fn instantiate_uses_default_config_and_size() {
    let registry = WidgetRegistry::builtin();
    let w = registry.instantiate("metric", 10.0, 20.0).unwrap();
    assert_eq!(w.config, WidgetConfig::Metric(MetricConfig::default()));
    assert_eq!(w.layout, Layout::new(10.0, 20.0, 200.0, 120.0));
}

#[test]
fn instantiate_unknown_kind_errors() {
    let registry = WidgetRegistry::builtin();
    assert!(matches!(registry.instantiate("gauge", 0.0, 0.0), Err(WidgetError::UnknownKind(k)) if k == "gauge"));
}

#[test]
fn register_adds_and_replaces() {
    let mut registry = WidgetRegistry::builtin();
    let custom = WidgetDefinition {
        kind: "gauge".into(),
        name: "Gauge".into(),
        description: "Dial".into(),
        icon: "G".into(),
        default_config: WidgetConfig::Custom { kind: "gauge".into(), config: json!({"max": 100}) },
        default_size: Size::new(150.0, 150.0),
        renderer: Arc::new(BuiltinRenderer),
    };
    registry.register(custom.clone());
    assert_eq!(registry.all().len(), 6);

    registry.register(WidgetDefinition { name: "Gauge v2".into(), ..custom });
    assert_eq!(registry.all().len(), 6);
    assert_eq!(registry.get("gauge").map(|d| d.name.as_str()), Some("Gauge v2"));
}

// =============================================================
// ConfigDraft
// =============================================================

#[test]
fn draft_opens_with_pretty_payload() {
    let (_, widget) = store_with(WidgetConfig::Text(TextConfig::default()));
    let draft = ConfigDraft::open(&widget).unwrap();
    let parsed: Value = serde_json::from_str(draft.text()).unwrap();
    assert_eq!(parsed["content"], "Enter your text here...");
    assert_eq!(draft.widget_id(), widget.id);
}

#[test]
fn valid_edit_commits_through_store() {
    let (mut store, widget) = store_with(WidgetConfig::Text(TextConfig::default()));
    let mut draft = ConfigDraft::open(&widget).unwrap();
    draft.edit(r#"{"content": "Hello"}"#);

    assert!(draft.commit(&mut store).unwrap());
    let stored = store.active_dashboard().unwrap().get(&widget.id).unwrap();
    match &stored.config {
        WidgetConfig::Text(t) => assert_eq!(t.content, "Hello"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(draft.last_good(), &stored.config);
    assert!(store.undo());
}

#[test]
fn malformed_edit_reverts_and_leaves_store() {
    let (mut store, widget) = store_with(WidgetConfig::Text(TextConfig::default()));
    let before = store.history().clone();
    let mut draft = ConfigDraft::open(&widget).unwrap();
    let original = draft.text().to_owned();
    draft.edit("{not json");

    assert!(matches!(draft.commit(&mut store), Err(WidgetError::MalformedJson(_))));
    assert_eq!(draft.text(), original);
    assert_eq!(store.history(), &before);
}

#[test]
fn unchanged_edit_is_not_recorded() {
    let (mut store, widget) = store_with(WidgetConfig::Metric(MetricConfig::default()));
    let past = store.history().past().count();
    let mut draft = ConfigDraft::open(&widget).unwrap();
    assert!(!draft.commit(&mut store).unwrap());
    assert_eq!(store.history().past().count(), past);
}
