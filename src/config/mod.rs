//! Configuration module for analytics-export.
//!
//! Handles the settings file, environment variable expansion, and the
//! destination a run writes to.

mod connection;
mod destination;
mod settings;

pub use connection::{DatabaseConfig, Engine, DEFAULT_CONNECT_TIMEOUT, PASSWORD_ENV_VAR};
pub use destination::Destination;
pub use settings::{
    expand_env_vars, parse_duration, DestinationSettings, ReportSettings, Settings, SettingsError,
    CONFIG_ENV_VAR, DEFAULT_ENDPOINT, DEFAULT_SCOPE,
};
