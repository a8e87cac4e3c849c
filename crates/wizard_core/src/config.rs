use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::Locale;
use tracing::warn;

use crate::profile::ProfileKind;

pub const DEFAULT_SETTINGS_FILE: &str = "wizard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub profile: ProfileKind,
    pub submit_timeout_secs: u64,
    pub draft_dir: PathBuf,
    pub fallback_email: String,
    pub locale: Locale,
    pub translations_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            profile: ProfileKind::ProjectRequest,
            submit_timeout_secs: 30,
            draft_dir: PathBuf::from("./data/drafts"),
            fallback_email: "projects@agency.example".into(),
            locale: Locale::En,
            translations_path: None,
        }
    }
}

impl Settings {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs.max(1))
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists, then environment overrides looked up
/// through `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    };
    apply_env_overrides(&mut settings, env);
    settings
}

fn first_of(env: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    // Later keys win, so APP__-prefixed names override the short aliases.
    keys.iter().rev().find_map(|key| env(key))
}

pub fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = first_of(&env, &["WIZARD_BASE_URL", "APP__BASE_URL"]) {
        settings.base_url = v;
    }
    if let Some(v) = first_of(&env, &["WIZARD_PROFILE", "APP__PROFILE"]) {
        match v.parse() {
            Ok(profile) => settings.profile = profile,
            Err(err) => warn!(value = %v, error = %err, "ignoring profile override"),
        }
    }
    if let Some(v) = env("APP__SUBMIT_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.submit_timeout_secs = parsed;
        }
    }
    if let Some(v) = first_of(&env, &["WIZARD_DRAFT_DIR", "APP__DRAFT_DIR"]) {
        settings.draft_dir = PathBuf::from(v);
    }
    if let Some(v) = env("APP__FALLBACK_EMAIL") {
        settings.fallback_email = v;
    }
    if let Some(v) = first_of(&env, &["WIZARD_LOCALE", "APP__LOCALE"]) {
        match v.parse() {
            Ok(locale) => settings.locale = locale,
            Err(err) => warn!(value = %v, error = %err, "ignoring locale override"),
        }
    }
    if let Some(v) = env("APP__TRANSLATIONS_PATH") {
        settings.translations_path = Some(PathBuf::from(v));
    }
}

pub fn prepare_draft_dir(draft_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(draft_dir).with_context(|| {
        format!(
            "failed to create draft directory '{}'",
            draft_dir.display()
        )
    })?;
    Ok(draft_dir.to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
