use std::{collections::HashMap, fs};

use serde::Deserialize;
use shared::domain::Role;
use tracing::warn;

const SETTINGS_FILE: &str = "swipe_backend.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub access_token: String,
    /// Number of items in the served catalogue.
    pub catalog_size: usize,
    /// Upper bound on items returned by one next-batch call.
    pub batch_size: usize,
    pub users: Vec<FixtureUser>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".into(),
            access_token: "dev-access-token".into(),
            catalog_size: 12,
            batch_size: 5,
            users: vec![
                FixtureUser {
                    username: "user".into(),
                    password: "password".into(),
                    role: Role::User,
                },
                FixtureUser {
                    username: "admin".into(),
                    password: "admin".into(),
                    role: Role::Admin,
                },
            ],
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "config: ignoring unreadable {SETTINGS_FILE}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("bind_addr").and_then(|v| v.as_str()) {
        settings.bind_addr = v.to_string();
    }
    if let Some(v) = file_cfg.get("access_token").and_then(|v| v.as_str()) {
        settings.access_token = v.to_string();
    }
    if let Some(v) = file_cfg.get("catalog_size").and_then(positive) {
        settings.catalog_size = v;
    }
    if let Some(v) = file_cfg.get("batch_size").and_then(positive) {
        settings.batch_size = v;
    }
    if let Some(users) = file_cfg.get("users") {
        match users.clone().try_into::<Vec<FixtureUser>>() {
            Ok(users) => settings.users = users,
            Err(error) => warn!(%error, "config: ignoring malformed users table"),
        }
    }
}

fn positive(value: &toml::Value) -> Option<usize> {
    value
        .as_integer()
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v > 0)
}

fn apply_env<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("MOCK__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("MOCK__ACCESS_TOKEN") {
        settings.access_token = v;
    }
    if let Some(v) = lookup("MOCK__CATALOG_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.catalog_size = parsed;
        }
    }
    if let Some(v) = lookup("MOCK__BATCH_SIZE") {
        match v.parse::<usize>() {
            Ok(parsed) if parsed > 0 => settings.batch_size = parsed,
            _ => warn!(value = %v, "config: MOCK__BATCH_SIZE must be a positive integer"),
        }
    }
}
