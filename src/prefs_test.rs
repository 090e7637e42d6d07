use super::*;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("dashboard-prefs-{}", uuid::Uuid::new_v4())).join("prefs.json")
}

#[test]
fn missing_file_defaults_to_light() {
    let prefs = PreferenceStore::open(temp_path()).unwrap();
    assert_eq!(prefs.theme(), "light");
    assert_eq!(prefs.get("dashboard-theme"), None);
}

#[test]
fn theme_is_written_through_and_reloaded() {
    let path = temp_path();
    let mut prefs = PreferenceStore::open(&path).unwrap();
    prefs.set_theme("dark").unwrap();
    assert!(path.exists());

    let reopened = PreferenceStore::open(&path).unwrap();
    assert_eq!(reopened.theme(), "dark");
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn theme_value_is_not_validated() {
    let mut prefs = PreferenceStore::open(temp_path()).unwrap();
    prefs.set_theme("solarized-ish").unwrap();
    assert_eq!(prefs.theme(), "solarized-ish");
}

#[test]
fn other_keys_survive_theme_changes() {
    let path = temp_path();
    let mut prefs = PreferenceStore::open(&path).unwrap();
    prefs.set("sidebar", "collapsed").unwrap();
    prefs.set_theme("dark").unwrap();
    let reopened = PreferenceStore::open(&path).unwrap();
    assert_eq!(reopened.get("sidebar"), Some("collapsed"));
}

#[test]
fn malformed_file_is_decode_error() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(PreferenceStore::open(&path), Err(PrefsError::Decode { .. })));
}
