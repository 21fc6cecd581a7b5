//! TOML-based configuration for analytics-export.
//!
//! Supports a config file (`analytics-export.toml`) with environment variable
//! expansion in every string value.
//!
//! Example configuration:
//! ```toml
//! [report]
//! view_id = "123456789"
//! key_file = "${GA_KEY_FILE}"
//! timeout = "30s"
//!
//! [destination]
//! kind = "database"
//! engine = "postgresql"
//! host = "localhost"
//! user = "etl"
//! password = "${DB_PASSWORD}"
//! db_name = "analytics"
//! connect_timeout = "10s"
//! ```
//!
//! or, for a file destination:
//! ```toml
//! [destination]
//! kind = "file"
//! format = "csv"
//! path = "./sessions.csv"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::{DatabaseConfig, Engine, DEFAULT_CONNECT_TIMEOUT};
use super::destination::Destination;
use crate::sink::FileFormat;

/// Scope requested for the service-account session.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Base URL of the Analytics Reporting API.
pub const DEFAULT_ENDPOINT: &str = "https://analyticsreporting.googleapis.com";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ANALYTICS_EXPORT_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),

    #[error("Invalid duration format: {0}")]
    InvalidDuration(String),

    #[error("Unsupported database engine: {0}")]
    UnsupportedEngine(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Reporting API settings.
    pub report: ReportSettings,

    /// Where the report goes. May be supplied on the command line instead.
    pub destination: Option<DestinationSettings>,
}

/// Reporting API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Analytics view (profile) to query.
    pub view_id: Option<String>,

    /// Path to the service-account key file (supports ${ENV_VAR} expansion).
    pub key_file: Option<String>,

    /// Pre-issued access token, used when no key file is configured.
    pub access_token: Option<String>,

    /// OAuth scope requested with the key file.
    pub scope: String,

    /// API base URL.
    pub endpoint: String,

    /// Timeout for the token exchange and the report request (e.g., "30s").
    pub timeout: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            view_id: None,
            key_file: None,
            access_token: None,
            scope: DEFAULT_SCOPE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: "30s".to_string(),
        }
    }
}

impl ReportSettings {
    /// The view id with environment variables expanded.
    pub fn resolved_view_id(&self) -> Result<String, SettingsError> {
        let view_id = self
            .view_id
            .as_deref()
            .ok_or(SettingsError::MissingField("report.view_id"))?;
        expand_env_vars(view_id)
    }

    /// The key file path with environment variables expanded, if configured.
    pub fn resolved_key_file(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.key_file
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }

    /// The access token with environment variables expanded, if configured.
    pub fn resolved_access_token(&self) -> Result<Option<String>, SettingsError> {
        self.access_token.as_deref().map(expand_env_vars).transpose()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Result<Duration, SettingsError> {
        parse_duration(&self.timeout)
    }
}

/// Destination section of the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DestinationSettings {
    /// Write a CSV or JSON file.
    File { format: String, path: String },

    /// Append rows to the `analytics_data` table.
    Database {
        engine: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        password: Option<String>,
        db_name: String,
        #[serde(default)]
        connect_timeout: Option<String>,
    },
}

impl DestinationSettings {
    /// Expand environment variables and parse the destination.
    pub fn resolve(&self) -> Result<Destination, SettingsError> {
        match self {
            DestinationSettings::File { format, path } => {
                let format: FileFormat = format.parse()?;
                let path = expand_env_vars(path)?;
                if path.trim().is_empty() {
                    return Err(SettingsError::MissingField("destination.path"));
                }
                Ok(Destination::File {
                    format,
                    path: PathBuf::from(path),
                })
            }
            DestinationSettings::Database {
                engine,
                host,
                port,
                user,
                password,
                db_name,
                connect_timeout,
            } => {
                let engine: Engine = engine.parse()?;
                let expand = |value: &Option<String>| -> Result<Option<String>, SettingsError> {
                    value.as_deref().map(expand_env_vars).transpose()
                };

                let config = DatabaseConfig {
                    engine,
                    host: expand(host)?,
                    port: *port,
                    user: expand(user)?,
                    password: expand(password)?,
                    db_name: expand_env_vars(db_name)?,
                    connect_timeout: match connect_timeout {
                        Some(timeout) => parse_duration(timeout)?,
                        None => DEFAULT_CONNECT_TIMEOUT,
                    },
                }
                .with_env_password();

                config.validate()?;
                Ok(Destination::Database(config))
            }
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ANALYTICS_EXPORT_CONFIG`
    /// 2. `./analytics-export.toml`
    /// 3. `~/.config/analytics-export/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("analytics-export.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("analytics-export").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Resolve the configured destination, if any.
    pub fn destination(&self) -> Result<Option<Destination>, SettingsError> {
        self.destination
            .as_ref()
            .map(DestinationSettings::resolve)
            .transpose()
    }
}

/// Parse a duration such as `"250ms"`, `"30s"`, `"5m"`, `"1h"` or `"10"` (seconds).
pub fn parse_duration(s: &str) -> Result<Duration, SettingsError> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| SettingsError::InvalidDuration(s.to_string()))?;

    let invalid = || SettingsError::InvalidDuration(s.to_string());
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs).ok_or_else(invalid),
        "h" => value.checked_mul(3600).map(Duration::from_secs).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        // Check for ${VAR} or $VAR
        if chars.next_if_eq(&'{').is_some() {
            let mut var_name = String::new();
            while let Some(ch) = chars.next_if(|&ch| ch != '}') {
                var_name.push(ch);
            }
            if chars.next_if_eq(&'}').is_none() {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference '${{{}'",
                    var_name
                )));
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            let mut var_name = String::new();
            while let Some(ch) = chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
            } else {
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}
