//! fmp-player configuration
//!
//! The TOML bootstrap file (see [`fmp_common::config`]) with command-line
//! overrides applied on top.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments / their environment variables
//! 2. TOML configuration file
//! 3. Built-in defaults

use fmp_common::config::{StoreBackend, TomlConfig};
use fmp_common::Channels;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_backend: Option<StoreBackend>,
    pub store_url: Option<String>,
    /// One channel for both commands and notifications
    pub channel: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub http_bind: Option<String>,
    pub disable_http: bool,
}

impl ConfigOverrides {
    /// Apply on top of `config` and re-validate the result
    pub fn apply(self, mut config: TomlConfig) -> Result<TomlConfig> {
        if let Some(backend) = self.store_backend {
            config.store.backend = backend;
        }
        if let Some(url) = self.store_url {
            config.store.url = url;
        }
        if let Some(channel) = self.channel {
            config.channels = Channels::shared(channel);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(file) = self.log_file {
            config.logging.file = Some(file);
        }
        if let Some(bind) = self.http_bind {
            config.http.bind = bind;
        }
        if self.disable_http {
            config.http.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the config file, load it and apply overrides
pub fn load(cli_path: Option<&Path>, overrides: ConfigOverrides) -> Result<TomlConfig> {
    let config = TomlConfig::resolve(cli_path)?;
    overrides.apply(config)
}
