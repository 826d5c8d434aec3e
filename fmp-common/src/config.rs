//! Bootstrap configuration
//!
//! The player reads one TOML file at startup. Every field has a built-in
//! default, so an absent file (or an empty one) yields a working in-memory
//! setup.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. `FM_PLAYER_CONFIG` environment variable
//! 3. `~/.config/fmplayer/config.toml`
//! 4. `/etc/fmplayer/config.toml`
//! 5. Built-in defaults (no file)
//!
//! An explicitly named file (1 or 2) must exist; the well-known locations
//! (3 and 4) are only used when present.

use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::keys::{Channels, StoreKeys};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FM_PLAYER_CONFIG";

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub channels: Channels,
    pub keys: StoreKeys,
    pub playback: PlaybackConfig,
    pub mixer: MixerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Which shared store implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; producers must live in the same process
    #[default]
    Memory,
    /// Redis server (requires the `redis` feature of fmp-player)
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Shared store connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Connection URL, e.g. `redis://localhost:6379/0`
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "redis://localhost:6379/".to_string(),
        }
    }
}

/// Queue consumer and engine timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Give up on a track that has not reported completion after this long.
    ///
    /// Absent means wait forever.
    pub completion_timeout_ms: Option<u64>,

    /// Lower bound of the randomized delay between polls of an empty queue
    pub idle_poll_min_ms: u64,

    /// Upper bound of the randomized delay between polls of an empty queue
    pub idle_poll_max_ms: u64,

    /// How long the simulated engine "plays" each track
    pub track_duration_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: None,
            idle_poll_min_ms: 0,
            idle_poll_max_ms: 2,
            track_duration_ms: 180_000,
        }
    }
}

/// Mixer scaling and startup state
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Raw level that a requested volume of 0 maps to
    pub min_volume: u8,
    /// Raw level that a requested volume of 100 maps to
    pub max_volume: u8,
    /// Apply `initial_volume` and `initial_mute` at startup
    pub apply_initial_state: bool,
    pub initial_volume: u8,
    pub initial_mute: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            min_volume: 0,
            max_volume: 100,
            apply_initial_state: true,
            initial_volume: 80,
            initial_mute: false,
        }
    }
}

/// Read-only status API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:5780".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(toml_str)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        let config = Self::from_toml_str(&toml_str)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the config file location and load it, or fall back to defaults
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR)? {
            Some(path) => Self::load(&path),
            None => {
                info!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.keys.named() {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }
        if self.channels.command.trim().is_empty() || self.channels.notification.trim().is_empty() {
            return Err(Error::Config("channel names must not be empty".to_string()));
        }
        if self.playback.completion_timeout_ms == Some(0) {
            return Err(Error::Config(
                "playback.completion_timeout_ms must be greater than 0 (omit it to wait forever)"
                    .to_string(),
            ));
        }
        if self.playback.idle_poll_min_ms > self.playback.idle_poll_max_ms {
            return Err(Error::Config(format!(
                "playback.idle_poll_min_ms ({}) exceeds idle_poll_max_ms ({})",
                self.playback.idle_poll_min_ms, self.playback.idle_poll_max_ms
            )));
        }
        if self.mixer.max_volume > 100 {
            return Err(Error::Config(format!(
                "mixer.max_volume ({}) exceeds 100",
                self.mixer.max_volume
            )));
        }
        if self.mixer.min_volume > self.mixer.max_volume {
            return Err(Error::Config(format!(
                "mixer.min_volume ({}) exceeds max_volume ({})",
                self.mixer.min_volume, self.mixer.max_volume
            )));
        }
        if self.mixer.initial_volume > 100 {
            return Err(Error::Config(format!(
                "mixer.initial_volume ({}) exceeds 100",
                self.mixer.initial_volume
            )));
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.playback.completion_timeout_ms.map(Duration::from_millis)
    }

    pub fn idle_poll_range(&self) -> RangeInclusive<u64> {
        self.playback.idle_poll_min_ms..=self.playback.idle_poll_max_ms
    }

    pub fn track_duration(&self) -> Duration {
        Duration::from_millis(self.playback.track_duration_ms)
    }
}

/// Locate the config file following the documented priority order
///
/// Returns `Ok(None)` when no file was named and none exists in the
/// well-known locations.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return require_exists(PathBuf::from(path));
        }
    }

    // Priority 3 and 4: well-known locations
    Ok(default_config_paths().into_iter().find(|path| path.exists()))
}

fn require_exists(path: PathBuf) -> Result<Option<PathBuf>> {
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Well-known config file locations, most specific first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("fmplayer").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/fmplayer/config.toml"));
    }
    paths
}
