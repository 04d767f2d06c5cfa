use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "notetaker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// GraphQL HTTP endpoint for queries and mutations.
    pub endpoint: String,
    /// WebSocket endpoint for subscriptions; derived from `endpoint` when unset.
    pub realtime_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    pub page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:20002/graphql".into(),
            realtime_endpoint: None,
            api_key: None,
            auth_token: None,
            page_size: 100,
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

/// Defaults, then the settings file if it exists, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<ClientSettings>(&raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(path = %path.display(), "ignoring unreadable settings file: {err}");
                ClientSettings::default()
            }
        },
        Err(_) => ClientSettings::default(),
    };

    let lookup = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| env(name))
            .filter(|value| !value.trim().is_empty())
            .last()
    };

    if let Some(v) = lookup(&["NOTETAKER_ENDPOINT", "APP__ENDPOINT"]) {
        settings.endpoint = v;
    }
    if let Some(v) = lookup(&["NOTETAKER_REALTIME_ENDPOINT", "APP__REALTIME_ENDPOINT"]) {
        settings.realtime_endpoint = Some(v);
    }
    if let Some(v) = lookup(&["NOTETAKER_API_KEY", "APP__API_KEY"]) {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup(&["NOTETAKER_AUTH_TOKEN", "APP__AUTH_TOKEN"]) {
        settings.auth_token = Some(v);
    }
    if let Some(v) = lookup(&["APP__PAGE_SIZE"]) {
        match v.parse::<u32>() {
            Ok(parsed) if parsed > 0 => settings.page_size = parsed,
            _ => warn!(value = %v, "ignoring invalid APP__PAGE_SIZE"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
