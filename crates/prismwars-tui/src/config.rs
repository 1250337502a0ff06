// Configuration loading and parsing (client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use prismwars_core::projection::ProjectionParams;
use prismwars_core::transport::RetryPolicy;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
    pub render: RenderConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: "ws://127.0.0.1:8080/ws".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub heartbeat_secs: u64,
    pub reconnect_delay_secs: u64,
    pub countdown_tick_millis: u64,
    pub transport_retry_initial_millis: u64,
    pub transport_retry_max_millis: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            heartbeat_secs: 10,
            reconnect_delay_secs: 2,
            countdown_tick_millis: 1000,
            transport_retry_initial_millis: 1000,
            transport_retry_max_millis: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Empty means the platform data directory.
    pub db_path: String,
    pub freshness_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            db_path: String::new(),
            freshness_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_cell_size: f64,
    pub margin_cells: f64,
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            max_cell_size: 60.0,
            margin_cells: 2.0,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub notification_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            notification_secs: 3,
        }
    }
}

impl Config {
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.timing.heartbeat_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.timing.reconnect_delay_secs)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.timing.countdown_tick_millis)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial: Duration::from_millis(self.timing.transport_retry_initial_millis),
            max: Duration::from_millis(self.timing.transport_retry_max_millis),
        }
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.render.fps.max(1)))
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.ui.notification_secs)
    }

    pub fn projection(&self) -> ProjectionParams {
        ProjectionParams {
            max_cell_size: self.render.max_cell_size,
            margin_cells: self.render.margin_cells,
        }
    }

    /// Session database location, falling back to the platform data dir.
    pub fn db_path(&self) -> Option<PathBuf> {
        if self.session.db_path.is_empty() {
            prismwars_core::session::default_db_path()
        } else {
            Some(PathBuf::from(&self.session.db_path))
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/client.toml` relative to `base_dir`, without
/// copying defaults. Prefer `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("client.toml");
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the client directory or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = &config.server.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(invalid(
            "server.url",
            format!("must start with ws:// or wss://, got {url:?}"),
        ));
    }

    let t = &config.timing;
    let periods: &[(&str, u64)] = &[
        ("timing.heartbeat_secs", t.heartbeat_secs),
        ("timing.reconnect_delay_secs", t.reconnect_delay_secs),
        ("timing.countdown_tick_millis", t.countdown_tick_millis),
        (
            "timing.transport_retry_initial_millis",
            t.transport_retry_initial_millis,
        ),
        (
            "timing.transport_retry_max_millis",
            t.transport_retry_max_millis,
        ),
        ("ui.notification_secs", config.ui.notification_secs),
    ];
    for (name, val) in periods {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }
    if t.transport_retry_max_millis < t.transport_retry_initial_millis {
        return Err(invalid(
            "timing.transport_retry_max_millis",
            "must not be below transport_retry_initial_millis",
        ));
    }

    if config.session.freshness_hours <= 0 {
        return Err(invalid(
            "session.freshness_hours",
            format!("must be > 0, got {}", config.session.freshness_hours),
        ));
    }

    let r = &config.render;
    if r.max_cell_size <= 0.0 {
        return Err(invalid(
            "render.max_cell_size",
            format!("must be > 0, got {}", r.max_cell_size),
        ));
    }
    if r.margin_cells < 0.0 {
        return Err(invalid(
            "render.margin_cells",
            format!("must be >= 0, got {}", r.margin_cells),
        ));
    }
    if !(1..=120).contains(&r.fps) {
        return Err(invalid(
            "render.fps",
            format!("must be between 1 and 120, got {}", r.fps),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
