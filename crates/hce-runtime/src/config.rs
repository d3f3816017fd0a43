//! # Runtime Configuration
//!
//! Unified configuration for the registry stores, the dispatcher and
//! logging. Every field has a default; `from_env` overrides from `HCE_*`
//! variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use hce_02_service_registry::{DYNAMIC_SETTINGS_FILE, OTHER_STATUS_FILE};
use hce_04_emulation_dispatcher::DispatcherConfig;
use hce_telemetry::TelemetryConfig;
use shared_types::UserId;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}")]
    InvalidValue { var: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Directory holding both settings documents.
    pub data_dir: PathBuf,
    /// Dynamic-settings document name.
    pub dynamic_settings_file: String,
    /// Category-other status document name.
    pub other_status_file: String,
    /// JSON service manifest used as the platform by the binary.
    pub manifest_path: Option<PathBuf>,
    /// User whose catalog routing starts on.
    pub active_user: UserId,
    pub dispatcher: DispatcherConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            dynamic_settings_file: DYNAMIC_SETTINGS_FILE.to_string(),
            other_status_file: OTHER_STATUS_FILE.to_string(),
            manifest_path: None,
            active_user: 0,
            dispatcher: DispatcherConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `HCE_DATA_DIR` | `data_dir` |
    /// | `HCE_DYNAMIC_SETTINGS_FILE` | `dynamic_settings_file` |
    /// | `HCE_OTHER_STATUS_FILE` | `other_status_file` |
    /// | `HCE_MANIFEST` | `manifest_path` |
    /// | `HCE_ACTIVE_USER` | `active_user` |
    /// | `HCE_PENDING_CAPACITY` | `dispatcher.pending_capacity` |
    /// | `HCE_EVENT_QUEUE_CAPACITY` | `dispatcher.event_queue_capacity` |
    /// | `HCE_BIND_TIMEOUT_MS` | `dispatcher.bind_timeout` (0 disables) |
    ///
    /// Logging variables are read by `TelemetryConfig::from_env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        };

        if let Some(dir) = lookup("HCE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("HCE_DYNAMIC_SETTINGS_FILE") {
            config.dynamic_settings_file = name;
        }
        if let Some(name) = lookup("HCE_OTHER_STATUS_FILE") {
            config.other_status_file = name;
        }
        if let Some(path) = lookup("HCE_MANIFEST") {
            config.manifest_path = Some(PathBuf::from(path));
        }
        if let Some(user) = parse_var(&lookup, "HCE_ACTIVE_USER")? {
            config.active_user = user;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "HCE_PENDING_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::Zero("HCE_PENDING_CAPACITY"));
            }
            config.dispatcher.pending_capacity = capacity;
        }
        if let Some(capacity) = parse_var::<usize, _>(&lookup, "HCE_EVENT_QUEUE_CAPACITY")? {
            if capacity == 0 {
                return Err(ConfigError::Zero("HCE_EVENT_QUEUE_CAPACITY"));
            }
            config.dispatcher.event_queue_capacity = capacity;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "HCE_BIND_TIMEOUT_MS")? {
            config.dispatcher.bind_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
    }
}
