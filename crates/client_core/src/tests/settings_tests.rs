use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("notetaker_settings_test_{suffix}.toml"));
    fs::write(&path, contents).expect("write settings");
    path
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/notetaker.toml"), |_| None);
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn file_values_override_defaults() {
    let path = temp_settings_file(
        r#"
endpoint = "https://notes.example.com/graphql"
api_key = "da2-file"
page_size = 25
"#,
    );

    let settings = load_settings_from(&path, |_| None);

    assert_eq!(settings.endpoint, "https://notes.example.com/graphql");
    assert_eq!(settings.api_key.as_deref(), Some("da2-file"));
    assert_eq!(settings.page_size, 25);
    assert_eq!(settings.realtime_endpoint, None);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn environment_overrides_file() {
    let path = temp_settings_file("endpoint = \"https://file.example.com/graphql\"\n");
    let env = vars(&[
        ("NOTETAKER_ENDPOINT", "https://env.example.com/graphql"),
        ("APP__AUTH_TOKEN", "token-123"),
        ("APP__PAGE_SIZE", "10"),
    ]);

    let settings = load_settings_from(&path, |name| env.get(name).cloned());

    assert_eq!(settings.endpoint, "https://env.example.com/graphql");
    assert_eq!(settings.auth_token.as_deref(), Some("token-123"));
    assert_eq!(settings.page_size, 10);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn app_prefixed_variable_wins_over_plain_name() {
    let env = vars(&[
        ("NOTETAKER_API_KEY", "plain"),
        ("APP__API_KEY", "prefixed"),
    ]);

    let settings = load_settings_from(Path::new("/nonexistent/notetaker.toml"), |name| {
        env.get(name).cloned()
    });

    assert_eq!(settings.api_key.as_deref(), Some("prefixed"));
}

#[test]
fn invalid_page_size_and_blank_values_are_ignored() {
    let env = vars(&[("APP__PAGE_SIZE", "zero"), ("NOTETAKER_ENDPOINT", "  ")]);

    let settings = load_settings_from(Path::new("/nonexistent/notetaker.toml"), |name| {
        env.get(name).cloned()
    });

    assert_eq!(settings.page_size, ClientSettings::default().page_size);
    assert_eq!(settings.endpoint, ClientSettings::default().endpoint);
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let path = temp_settings_file("endpoint = [not valid toml");

    let settings = load_settings_from(&path, |_| None);

    assert_eq!(settings, ClientSettings::default());
    fs::remove_file(path).expect("cleanup");
}
