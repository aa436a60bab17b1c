use md_editor_lib::preferences::{Preferences, PreferencesError, PreferencesStore};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    assert!(store.preferences().is_dark_mode);
    assert!(!path.exists());
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("config").join("preferences.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .overwrite(Preferences { is_dark_mode: false })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    assert!(!reloaded.preferences().is_dark_mode);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn corrupt_file_is_reported_by_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(PreferencesStore::load(&path), Err(PreferencesError::Parse { .. })));
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    let store = PreferencesStore::load_or_default(&path);
    assert_eq!(store.preferences(), &Preferences::default());
    assert_eq!(store.path(), path.as_path());
}

#[test]
fn file_on_disk_uses_camel_case_key() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, r#"{ "isDarkMode": false }"#).unwrap();

    let store = PreferencesStore::load(&path).expect("load");
    assert!(!store.preferences().is_dark_mode);
}
