//! calbridge configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DEFAULT_CALENDAR_DIR: &str = "~/calendar/local";
const DEFAULT_REDIRECT_PORT: u16 = 8085;
const DEFAULT_MAX_RETRY_INTERVAL_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration at ~/.config/calbridge/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalbridgeConfig {
    #[serde(default)]
    pub local: LocalSettings,

    #[serde(default)]
    pub remote: RemoteSettings,
}

/// Settings for the device-local calendar store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default = "default_calendar_dir")]
    pub calendar_dir: PathBuf,

    /// IANA zone name; the device zone when unset
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Whether an access request may create a missing calendar directory
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

/// Settings for the remote calendar service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// OAuth client secret paired with the client id given per target
    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,

    #[serde(default = "default_max_retry_interval_secs")]
    pub max_retry_interval_secs: u64,
}

fn default_calendar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_DIR)
}

fn default_true() -> bool {
    true
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_max_retry_interval_secs() -> u64 {
    DEFAULT_MAX_RETRY_INTERVAL_SECS
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            calendar_dir: default_calendar_dir(),
            time_zone: None,
            create_if_missing: true,
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            client_secret: None,
            redirect_port: DEFAULT_REDIRECT_PORT,
            max_retry_interval_secs: DEFAULT_MAX_RETRY_INTERVAL_SECS,
        }
    }
}

impl RemoteSettings {
    /// Longest total wait spent retrying one remote call.
    pub fn max_retry_interval(&self) -> Duration {
        Duration::from_secs(self.max_retry_interval_secs)
    }
}

impl CalbridgeConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("calbridge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load ~/.config/calbridge/config.toml, writing a commented default first
    /// if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Calendar directory with `~` expanded.
    pub fn calendar_dir(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.local.calendar_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// The configured zone, else the device zone, else UTC.
    pub fn resolve_time_zone(&self) -> Result<Tz, ConfigError> {
        if let Some(name) = &self.local.time_zone {
            return Tz::from_str(name)
                .map_err(|_| ConfigError::Invalid(format!("Unknown time zone '{}'", name)));
        }

        match iana_time_zone::get_timezone() {
            Ok(name) => Ok(Tz::from_str(&name).unwrap_or_else(|_| {
                tracing::warn!(zone = %name, "device time zone not recognized, using UTC");
                chrono_tz::UTC
            })),
            Err(e) => {
                tracing::warn!(error = %e, "could not read device time zone, using UTC");
                Ok(chrono_tz::UTC)
            }
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let contents = format!(
            "\
# calbridge configuration

[local]
# Where the local calendar store keeps its events:
# calendar_dir = \"{}\"

# Time zone used for wall-clock times (defaults to the device zone):
# time_zone = \"Europe/Berlin\"

# Create the calendar directory on first access:
# create_if_missing = true

[remote]
# OAuth client secret for the client id used to sign in:
# client_secret = \"...\"

# Local port the sign-in redirect comes back to:
# redirect_port = {}

# Upper bound, in seconds, on waiting between retries of transient failures:
# max_retry_interval_secs = {}
",
            DEFAULT_CALENDAR_DIR, DEFAULT_REDIRECT_PORT, DEFAULT_MAX_RETRY_INTERVAL_SECS
        );

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        std::fs::write(path, contents).map_err(write_err)
    }
}
