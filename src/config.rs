//! Service configuration.
//!
//! Settings come from an optional TOML file; every field has a default so
//! the service runs with no file at all. Secrets never live in the file:
//! the Bluesky handle and password are read from the environment (a `.env`
//! file is loaded at startup) when the publish step needs them.
//!
//! ```toml
//! [station]
//! id = "1671"
//! name = "Leipziger Straße, Chemnitz (DESN083)"
//! timezone = "Europe/Berlin"
//!
//! [alert]
//! min_severity = "moderate"
//! ```

use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::alert::thresholds::{AlertThreshold, Severity};
use crate::logging::LogLevel;
use crate::model::PublishError;

pub const DEFAULT_CONFIG_PATH: &str = "./luftmon.toml";
pub const CONFIG_PATH_VAR: &str = "LUFTMON_CONFIG";
pub const HANDLE_VAR: &str = "BLUESKY_HANDLE";
pub const PASSWORD_VAR: &str = "BLUESKY_PASSWORD";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub station: StationConfig,
    pub uba: UbaConfig,
    pub bluesky: BlueskyConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// The one monitored station.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    /// UBA station id (numeric, kept as the string the API keys by).
    pub id: String,
    /// Name shown in the report header.
    pub name: String,
    /// IANA zone used for the query window and report timestamps.
    pub timezone: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            id: "1671".to_string(),
            name: "Leipziger Straße, Chemnitz (DESN083)".to_string(),
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl StationConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UbaConfig {
    pub base_url: String,
    pub lang: String,
    pub timeout_secs: u64,
}

impl Default for UbaConfig {
    fn default() -> Self {
        UbaConfig {
            base_url: "https://umweltbundesamt.api.proxy.bund.dev/api/air_data/v2/airquality/json"
                .to_string(),
            lang: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueskyConfig {
    /// PDS base URL.
    pub service: String,
    pub timeout_secs: u64,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        BlueskyConfig {
            service: "https://bsky.social".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    /// Lowest severity that gets the report published.
    pub min_severity: Severity,
    /// Snapshots older than this log a staleness warning.
    pub stale_after_minutes: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            min_severity: AlertThreshold::default().min_severity,
            stale_after_minutes: 180,
        }
    }
}

impl AlertConfig {
    pub fn threshold(&self) -> AlertThreshold {
        AlertThreshold::new(self.min_severity)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
            timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// Read and write timeout per trigger connection.
    pub io_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
            io_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file.
    ///
    /// An explicitly named file must exist. When `path` is `None` the
    /// default location is tried and built-in defaults are used if it is
    /// absent.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        match std::fs::read_to_string(path) {
            Ok(text) => Config::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.station.tz()?;

        if self.station.id.trim().is_empty() {
            return Err(ConfigError::Invalid("station.id must not be empty".to_string()));
        }
        if self.uba.timeout_secs == 0
            || self.bluesky.timeout_secs == 0
            || self.server.io_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("timeouts must be at least one second".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Bluesky login, taken from the environment at publish time.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub handle: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("handle", &self.handle)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Credentials, PublishError> {
        Credentials::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads both variables through `lookup`. Unset and blank are the same.
    pub fn from_lookup<F>(lookup: F) -> Result<Credentials, PublishError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(PublishError::MissingConfig(key))
        };

        Ok(Credentials {
            handle: read(HANDLE_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Startup configuration errors. These are the only fatal errors.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    InvalidTimezone(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "Cannot read {}: {}", path, message),
            ConfigError::Parse(msg) => write!(f, "Invalid configuration file: {}", msg),
            ConfigError::InvalidTimezone(tz) => write!(f, "Unknown time zone: {}", tz),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
