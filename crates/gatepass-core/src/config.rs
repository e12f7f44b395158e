//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file (optional unless a path is given explicitly)
//! 3. Environment variables prefixed with `GATEPASS_`, using `__` between
//!    section and key (e.g. `GATEPASS_SERVER__PORT=8080`)
//!
//! The merged result is validated before it is returned.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expiry::{ExpiryPolicy, DEFAULT_MULTIDAY_DAYS};
use crate::storage::default_data_dir;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "GATEPASS";

/// Default number of pass ids tried before registration gives up.
pub const DEFAULT_ID_ATTEMPTS: u32 = 3;

/// Longest allowed default multi-day validity, in days.
pub const MAX_MULTIDAY_DAYS: u32 = 365;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A configuration source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// A single field failed validation.
    #[error("Invalid {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("Configuration has {} errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Site-wide settings.
    pub site: SiteConfig,
    /// Pass issuing settings.
    pub passes: PassesConfig,
    /// Record store settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::ValidationError {
            field: "server.host".to_string(),
            message: format!("'{}' is not an IP address", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// IANA timezone used for every calendar-day boundary.
    pub timezone: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl SiteConfig {
    /// Parsed timezone, falling back to UTC if the name is unknown.
    #[must_use]
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

/// Pass issuing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassesConfig {
    /// Days added to today for multi-day passes without a requested date.
    pub multiday_default_days: u32,
    /// Pass ids tried before registration fails on collisions.
    pub id_attempts: u32,
}

impl Default for PassesConfig {
    fn default() -> Self {
        Self {
            multiday_default_days: DEFAULT_MULTIDAY_DAYS,
            id_attempts: DEFAULT_ID_ATTEMPTS,
        }
    }
}

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file in the data directory.
    #[default]
    Json,
    /// Process memory only.
    Memory,
}

/// Record store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: StorageBackend,
    /// Data directory for the JSON backend; platform default when unset.
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured data directory, or the platform default.
    #[must_use]
    pub fn effective_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when neither `RUST_LOG` nor
    /// `GATEPASS_LOG_LEVEL` is set.
    pub level: String,
    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,
    /// Directory for production log files; `<data_dir>/logs` when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
            dir: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `path = None` the platform default path is used if it exists.
    /// An explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                config::File::from(path).format(config::FileFormat::Toml)
            }
            None => config::File::from(default_config_path())
                .format(config::FileFormat::Toml)
                .required(false),
        };

        let loaded: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the single failure, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.server.socket_addr() {
            errors.push(e);
        }
        if self.server.port == 0 {
            errors.push(invalid("server.port", "must be between 1 and 65535"));
        }
        if self.site.timezone.parse::<Tz>().is_err() {
            errors.push(invalid(
                "site.timezone",
                &format!("'{}' is not an IANA timezone", self.site.timezone),
            ));
        }
        if !(1..=MAX_MULTIDAY_DAYS).contains(&self.passes.multiday_default_days) {
            errors.push(invalid(
                "passes.multiday_default_days",
                &format!("must be between 1 and {MAX_MULTIDAY_DAYS}"),
            ));
        }
        if self.passes.id_attempts == 0 {
            errors.push(invalid("passes.id_attempts", "must be at least 1"));
        }
        if self.logging.level.trim().is_empty() {
            errors.push(invalid("logging.level", "must not be empty"));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Directory for production log files.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| self.storage.effective_data_dir().join("logs"))
    }

    /// Expiration policy derived from the site and pass settings.
    #[must_use]
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.site.tz(), self.passes.multiday_default_days)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Get the default configuration file path.
///
/// On Linux: `/etc/gatepass/config.toml`
/// Elsewhere: the platform config directory for `gatepass`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/gatepass/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "gatepass")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
