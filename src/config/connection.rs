//! Database destination configuration.
//!
//! Supports three engines:
//! - `sqlite`: embedded, `db_name` is the database file path (or `:memory:`)
//! - `mysql`: networked, requires host, user, password and `db_name`
//! - `postgresql`: networked, requires host, user, password and `db_name`
//!
//! A missing password can be supplied through `ANALYTICS_EXPORT_DB_PASSWORD`.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::settings::SettingsError;

/// Default timeout for establishing a database connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV_VAR: &str = "ANALYTICS_EXPORT_DB_PASSWORD";

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// SQLite (embedded, file-based)
    Sqlite,
    /// MySQL / MariaDB
    MySql,
    /// PostgreSQL
    Postgres,
}

impl Engine {
    /// Get the canonical engine name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Sqlite => "sqlite",
            Engine::MySql => "mysql",
            Engine::Postgres => "postgresql",
        }
    }

    /// Get the default port for this engine.
    pub fn default_port(&self) -> u16 {
        match self {
            Engine::Sqlite => 0, // Not applicable
            Engine::MySql => 3306,
            Engine::Postgres => 5432,
        }
    }

    /// Whether the engine is reached over the network.
    pub fn is_networked(&self) -> bool {
        !matches!(self, Engine::Sqlite)
    }
}

impl FromStr for Engine {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            "mysql" | "mariadb" => Ok(Engine::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Engine::Postgres),
            other => Err(SettingsError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database destination configuration.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Database engine.
    pub engine: Engine,
    /// Server hostname (networked engines only).
    pub host: Option<String>,
    /// Port (optional, uses the engine default).
    pub port: Option<u16>,
    /// Username (networked engines only).
    pub user: Option<String>,
    /// Password (networked engines only).
    pub password: Option<String>,
    /// Database name, or the database file path for SQLite.
    pub db_name: String,
    /// Upper bound on connection establishment.
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a config for an SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: Engine::Sqlite,
            host: None,
            port: None,
            user: None,
            password: None,
            db_name: path.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a config for a networked engine.
    pub fn networked(
        engine: Engine,
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            host: Some(host.into()),
            port: None,
            user: Some(user.into()),
            password: Some(password.into()),
            db_name: db_name.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Fill a missing password from `ANALYTICS_EXPORT_DB_PASSWORD`.
    pub fn with_env_password(mut self) -> Self {
        if self.password.is_none() && self.engine.is_networked() {
            self.password = env::var(PASSWORD_ENV_VAR).ok();
        }
        self
    }

    /// Check that every field the engine needs is present.
    ///
    /// `db_name` is always required; host, user and password are required
    /// for networked engines only.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.db_name.trim().is_empty() {
            return Err(SettingsError::MissingField("db_name"));
        }

        if self.engine.is_networked() {
            if is_blank(&self.host) {
                return Err(SettingsError::MissingField("host"));
            }
            if is_blank(&self.user) {
                return Err(SettingsError::MissingField("user"));
            }
            if self.password.is_none() {
                return Err(SettingsError::MissingField("password"));
            }
        }

        Ok(())
    }

    /// Host, or an empty string when unset.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or_default()
    }

    /// Port, falling back to the engine default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    /// User, or an empty string when unset.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }

    /// Password, or an empty string when unset.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Human-readable target without credentials, for logs and summaries.
    pub fn describe(&self) -> String {
        match self.engine {
            Engine::Sqlite => format!("sqlite database '{}'", self.db_name),
            engine => format!(
                "{} database '{}' on {}:{}",
                engine,
                self.db_name,
                self.host(),
                self.port()
            ),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db_name", &self.db_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}
