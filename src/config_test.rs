#![allow(clippy::float_cmp)]

use std::collections::HashMap;

use super::*;

fn from(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    EngineConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn empty_environment_gives_defaults() {
    let cfg = from(&[]).unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.dashboard_id, "default-dashboard");
    assert_eq!(cfg.store, StoreConfig { history_limit: 100, event_capacity: 256 });
    assert_eq!(cfg.canvas, CanvasBounds::new(1200.0, 800.0, 20.0));
    assert_eq!(cfg.resize_mode, ResizeMode::SizeOnly);
    assert!(cfg.collab_enabled);
    assert_eq!(cfg.user.name, None);
    assert_eq!(cfg.user.color.as_deref(), Some("#000000"));
    assert_eq!(cfg.data_timeout, Duration::from_secs(30));
    assert_eq!(cfg.prefs_path, PathBuf::from("dashboard-prefs.json"));
}

#[test]
fn overrides_are_applied() {
    let cfg = from(&[
        ("DASHBOARD_ID", "ops"),
        ("DASHBOARD_HISTORY_LIMIT", "5"),
        ("DASHBOARD_EVENT_CAPACITY", "16"),
        ("CANVAS_WIDTH", "800"),
        ("CANVAS_HEIGHT", "600"),
        ("CANVAS_PADDING", "0"),
        ("RESIZE_ANCHOR_EDGES", "yes"),
        ("COLLAB_ENABLED", "false"),
        ("COLLAB_USER_NAME", "Ada"),
        ("COLLAB_USER_COLOR", "#336699"),
        ("DATA_REQUEST_TIMEOUT_SECS", "3"),
        ("PREFS_PATH", "/tmp/prefs.json"),
    ])
    .unwrap();
    assert_eq!(cfg.dashboard_id, "ops");
    assert_eq!(cfg.store.history_limit, 5);
    assert_eq!(cfg.store.event_capacity, 16);
    assert_eq!(cfg.canvas.width, 800.0);
    assert_eq!(cfg.canvas.padding, 0.0);
    assert_eq!(cfg.resize_mode, ResizeMode::AnchorOppositeEdge);
    assert!(!cfg.collab_enabled);
    assert_eq!(cfg.user, UserInfo::new("Ada", "#336699"));
    assert_eq!(cfg.data_timeout, Duration::from_secs(3));
    assert_eq!(cfg.prefs_path, PathBuf::from("/tmp/prefs.json"));
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let cfg = from(&[("DASHBOARD_ID", "  "), ("CANVAS_WIDTH", "")]).unwrap();
    assert_eq!(cfg.dashboard_id, "default-dashboard");
    assert_eq!(cfg.canvas.width, 1200.0);
}

#[test]
fn malformed_number_is_rejected() {
    let err = from(&[("DASHBOARD_HISTORY_LIMIT", "lots")]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid { var: "DASHBOARD_HISTORY_LIMIT", expected: "a number", value: "lots".into() }
    );
}

#[test]
fn malformed_bool_is_rejected() {
    let err = from(&[("COLLAB_ENABLED", "maybe")]).unwrap_err();
    assert!(err.to_string().starts_with("COLLAB_ENABLED: expected a boolean"));
}
