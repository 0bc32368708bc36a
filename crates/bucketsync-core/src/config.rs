//! Configuration module for bucketsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and environment overrides for
//! credentials. Endpoint and credentials are always supplied externally;
//! nothing here is hard-coded into the sync core.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for bucketsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Remote endpoint and credential settings.
///
/// One store instance is built from this per run. Credentials left as
/// `None` fall back to the ambient AWS credential chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// S3-compatible endpoint URL, e.g. `http://127.0.0.1:9000` for MinIO.
    /// `None` targets the default AWS endpoint for the region.
    pub endpoint_url: Option<String>,
    /// Signing region. Custom endpoints usually accept any value here.
    pub region: Option<String>,
    /// Access key id; `None` defers to the environment/credential chain.
    pub access_key_id: Option<String>,
    /// Secret access key; `None` defers to the environment/credential chain.
    pub secret_access_key: Option<String>,
    /// Use path-style bucket addressing (required by MinIO and most
    /// self-hosted endpoints).
    pub force_path_style: bool,
}

/// Synchronization tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum file operations in flight. 1 reproduces the strictly
    /// sequential reference behavior.
    pub concurrency: usize,
    /// Retries per remote call on transient store failures.
    pub retry_attempts: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Environment variable overriding `remote.endpoint_url`.
pub const ENV_ENDPOINT: &str = "BUCKETSYNC_ENDPOINT";
/// Environment variable overriding `remote.region`.
pub const ENV_REGION: &str = "AWS_REGION";
/// Environment variable overriding `remote.access_key_id`.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable overriding `remote.secret_access_key`.
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/bucketsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bucketsync")
            .join("config.yaml")
    }

    /// Overlay endpoint/credential settings from the environment.
    ///
    /// Environment values win over file values, so a config file can be
    /// committed without secrets.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.remote.endpoint_url = Some(endpoint);
        }
        if let Ok(region) = std::env::var(ENV_REGION) {
            self.remote.region = Some(region);
        }
        if let Ok(id) = std::env::var(ENV_ACCESS_KEY_ID) {
            self.remote.access_key_id = Some(id);
        }
        if let Ok(secret) = std::env::var(ENV_SECRET_ACCESS_KEY) {
            self.remote.secret_access_key = Some(secret);
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            retry_attempts: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.concurrency"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.concurrency`.
const MAX_CONCURRENCY: usize = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        if let Some(endpoint) = &self.remote.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError {
                    field: "remote.endpoint_url".into(),
                    message: format!("must start with http:// or https://: {endpoint}"),
                });
            }
        }
        match (
            self.remote.access_key_id.is_some(),
            self.remote.secret_access_key.is_some(),
        ) {
            (true, false) | (false, true) => {
                errors.push(ValidationError {
                    field: "remote.access_key_id".into(),
                    message: "access key id and secret access key must be set together".into(),
                });
            }
            _ => {}
        }

        // --- sync ---
        if self.sync.concurrency == 0 {
            errors.push(ValidationError {
                field: "sync.concurrency".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.concurrency > MAX_CONCURRENCY {
            errors.push(ValidationError {
                field: "sync.concurrency".into(),
                message: format!("must not exceed {MAX_CONCURRENCY}"),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
