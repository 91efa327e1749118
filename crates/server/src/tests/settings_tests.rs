use super::{load_settings_from, Settings};

use std::{env, fs};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("server.toml")).expect("settings");
    let defaults = Settings::default();
    assert_eq!(settings.bind_addr, defaults.bind_addr);
    assert_eq!(settings.config_path, defaults.config_path);
    assert!(settings.calendar_path.is_none());
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        "bind_addr = \"0.0.0.0:9000\"\nconfig_path = \"/srv/uma/config.json\"\ncalendar_path = \"calendar.json\"\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path).expect("settings");
    assert_eq!(settings.bind_addr, "0.0.0.0:9000");
    assert_eq!(settings.config_path.to_string_lossy(), "/srv/uma/config.json");
    assert_eq!(
        settings.calendar_path.as_deref().map(|p| p.to_string_lossy().into_owned()),
        Some("calendar.json".to_string())
    );
    assert_eq!(settings.version_path, Settings::default().version_path);
}

#[test]
fn environment_overrides_body_limit() {
    let dir = tempfile::tempdir().expect("tempdir");
    env::set_var("APP__MAX_BODY_BYTES", "4096");
    let settings = load_settings_from(&dir.path().join("server.toml"));
    env::remove_var("APP__MAX_BODY_BYTES");
    assert_eq!(settings.expect("settings").max_body_bytes, 4096);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "bind_addr = [").expect("write settings");
    assert!(load_settings_from(&path).is_err());
}
