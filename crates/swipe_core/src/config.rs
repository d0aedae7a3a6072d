use std::{fs, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "swipe.toml";
const ENV_PREFIX: &str = "SWIPE__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Simulated,
    Live,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(Self::Simulated),
            "live" => Ok(Self::Live),
            other => Err(ConfigError::Invalid {
                key: "backend",
                reason: format!("expected 'simulated' or 'live', got '{other}'"),
            }),
        }
    }
}

/// Tunables for gesture recognition, animation timing and submission retry.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Displacement both axes must exceed to commit. Shared by all four directions.
    pub swipe_threshold: f32,
    /// Distance the card travels off-screen on commit; also scales rotation.
    pub viewport_width: f32,
    pub max_rotation_deg: f32,
    pub commit_duration: Duration,
    pub frame_interval: Duration,
    pub spring_stiffness: f32,
    pub settle_epsilon: f32,
    pub max_settle_duration: Duration,
    /// Total attempts per submission, including the first one.
    pub submit_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
    pub backend: BackendKind,
    pub server_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: 120.0,
            viewport_width: 400.0,
            max_rotation_deg: 10.0,
            commit_duration: Duration::from_millis(250),
            frame_interval: Duration::from_millis(16),
            spring_stiffness: 180.0,
            settle_epsilon: 0.5,
            max_settle_duration: Duration::from_secs(1),
            submit_attempts: 2,
            attempt_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(200),
            backend: BackendKind::Simulated,
            server_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    swipe_threshold: Option<f32>,
    viewport_width: Option<f32>,
    max_rotation_deg: Option<f32>,
    commit_duration_ms: Option<u64>,
    frame_interval_ms: Option<u64>,
    spring_stiffness: Option<f32>,
    settle_epsilon: Option<f32>,
    max_settle_duration_ms: Option<u64>,
    submit_attempts: Option<u32>,
    attempt_timeout_ms: Option<u64>,
    retry_delay_ms: Option<u64>,
    backend: Option<BackendKind>,
    server_url: Option<String>,
}

/// Defaults, then `path` (or `swipe.toml` if present), then `SWIPE__*` env vars.
/// Not validated; hosts apply their own overrides and then call `validate`.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => config.apply_toml(&raw, &path.display().to_string())?,
        Err(source) if required => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
        Err(_) => {}
    }

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

impl EngineConfig {
    pub fn apply_toml(&mut self, raw: &str, origin: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        if let Some(v) = file.swipe_threshold {
            self.swipe_threshold = v;
        }
        if let Some(v) = file.viewport_width {
            self.viewport_width = v;
        }
        if let Some(v) = file.max_rotation_deg {
            self.max_rotation_deg = v;
        }
        if let Some(v) = file.commit_duration_ms {
            self.commit_duration = Duration::from_millis(v);
        }
        if let Some(v) = file.frame_interval_ms {
            self.frame_interval = Duration::from_millis(v);
        }
        if let Some(v) = file.spring_stiffness {
            self.spring_stiffness = v;
        }
        if let Some(v) = file.settle_epsilon {
            self.settle_epsilon = v;
        }
        if let Some(v) = file.max_settle_duration_ms {
            self.max_settle_duration = Duration::from_millis(v);
        }
        if let Some(v) = file.submit_attempts {
            self.submit_attempts = v;
        }
        if let Some(v) = file.attempt_timeout_ms {
            self.attempt_timeout = Duration::from_millis(v);
        }
        if let Some(v) = file.retry_delay_ms {
            self.retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = file.backend {
            self.backend = v;
        }
        if file.server_url.is_some() {
            self.server_url = file.server_url;
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("SWIPE_THRESHOLD") {
            self.swipe_threshold = parse_env("swipe_threshold", &v)?;
        }
        if let Some(v) = var("COMMIT_DURATION_MS") {
            self.commit_duration = Duration::from_millis(parse_env("commit_duration_ms", &v)?);
        }
        if let Some(v) = var("SUBMIT_ATTEMPTS") {
            self.submit_attempts = parse_env("submit_attempts", &v)?;
        }
        if let Some(v) = var("ATTEMPT_TIMEOUT_MS") {
            self.attempt_timeout = Duration::from_millis(parse_env("attempt_timeout_ms", &v)?);
        }
        if let Some(v) = var("BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = var("SERVER_URL") {
            self.server_url = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.swipe_threshold.is_finite() && self.swipe_threshold > 0.0) {
            return Err(ConfigError::Invalid {
                key: "swipe_threshold",
                reason: format!("must be a positive number, got {}", self.swipe_threshold),
            });
        }
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0) {
            return Err(ConfigError::Invalid {
                key: "viewport_width",
                reason: format!("must be a positive number, got {}", self.viewport_width),
            });
        }
        if self.submit_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "submit_attempts",
                reason: "at least one attempt is required".into(),
            });
        }
        for (key, value) in [
            ("commit_duration", self.commit_duration),
            ("frame_interval", self.frame_interval),
            ("attempt_timeout", self.attempt_timeout),
            ("max_settle_duration", self.max_settle_duration),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "duration must be non-zero".into(),
                });
            }
        }
        if self.backend == BackendKind::Live && self.server_url.is_none() {
            return Err(ConfigError::Invalid {
                key: "server_url",
                reason: "live backend requires a server url".into(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: format!("'{raw}': {err}"),
    })
}
