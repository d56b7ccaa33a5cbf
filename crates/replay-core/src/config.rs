//! Process configuration, read once from the environment at startup.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::app::ReplaySettings;

pub const DEFAULT_STAGING_TABLE: &str = "lake_readings_staging";
pub const DEFAULT_LIVE_TABLE: &str = "lake_readings_live";
pub const DEFAULT_SEND_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Credential whose value never shows up in `Debug` output or logs.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// Table polled and drained
    #[serde(default = "default_staging_table")]
    pub staging_table: String,

    /// Table appended to
    #[serde(default = "default_live_table")]
    pub live_table: String,

    /// Pacing target per iteration
    #[serde(default = "default_send_interval_seconds")]
    pub send_interval_seconds: u64,

    /// Max rows per iteration
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Backend endpoint URL
    pub supabase_url: String,

    /// Backend service credential
    pub supabase_service_role_key: Secret,

    /// Per-request timeout in seconds (0 disables it)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_staging_table() -> String {
    DEFAULT_STAGING_TABLE.to_string()
}

fn default_live_table() -> String {
    DEFAULT_LIVE_TABLE.to_string()
}

fn default_send_interval_seconds() -> u64 {
    DEFAULT_SEND_INTERVAL_SECONDS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ReplayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    /// Same as `from_env`, but reads variables from `vars` instead of the process.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::default().source(Some(vars)))
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        if config.supabase_url.trim().is_empty() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        if config.supabase_service_role_key.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"));
        }
        Ok(config)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    pub fn replay_settings(&self) -> ReplaySettings {
        ReplaySettings {
            staging_table: self.staging_table.clone(),
            live_table: self.live_table.clone(),
            interval: Duration::from_secs(self.send_interval_seconds),
            batch_size: self.batch_size,
        }
    }
}
