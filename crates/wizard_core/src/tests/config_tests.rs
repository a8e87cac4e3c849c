use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.submit_timeout(), Duration::from_secs(30));
}

#[test]
fn file_values_then_env_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wizard.toml");
    fs::write(
        &path,
        r#"
base_url = "https://agency.example"
profile = "web_development"
submit_timeout_secs = 12
locale = "ar"
"#,
    )
    .expect("write settings");

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("WIZARD_BASE_URL", "http://short-alias"),
            ("APP__BASE_URL", "http://prefixed"),
            ("APP__DRAFT_DIR", "/var/lib/wizard"),
        ]),
    );

    assert_eq!(settings.base_url, "http://prefixed");
    assert_eq!(settings.profile, ProfileKind::WebDevelopment);
    assert_eq!(settings.submit_timeout_secs, 12);
    assert_eq!(settings.locale, Locale::Ar);
    assert_eq!(settings.draft_dir, PathBuf::from("/var/lib/wizard"));
}

#[test]
fn invalid_overrides_are_ignored() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("APP__PROFILE", "mobile_app"),
            ("APP__SUBMIT_TIMEOUT_SECS", "soon"),
            ("APP__LOCALE", "fr"),
        ]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wizard.toml");
    fs::write(&path, "base_url = [").expect("write settings");
    assert_eq!(load_settings_from(&path, env_from(&[])), Settings::default());
}

#[test]
fn zero_timeout_is_clamped() {
    let settings = Settings {
        submit_timeout_secs: 0,
        ..Settings::default()
    };
    assert_eq!(settings.submit_timeout(), Duration::from_secs(1));
}

#[test]
fn prepares_nested_draft_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("data").join("drafts");
    let prepared = prepare_draft_dir(&target).expect("prepare");
    assert_eq!(prepared, target);
    assert!(target.is_dir());
}
