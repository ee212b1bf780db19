//! Process configuration read from environment variables.
//!
//! Values are right-trimmed; a blank required variable counts as missing.

use std::str::FromStr;
use std::time::Duration;

use camino::Utf8PathBuf;
use parc_core::quality::QualityOptions;
use parc_data::portal::PollSettings;
use parc_data::{DatabaseCredentials, PortalCredentials, Secret};
use thiserror::Error;

/// CityWide database host.
pub const ENV_PG_HOST: &str = "PG_HOST_CW";
/// CityWide database port.
pub const ENV_PG_PORT: &str = "PG_PORT_CW";
/// CityWide database name.
pub const ENV_PG_DATABASE: &str = "PG_DATABASE_CW";
/// CityWide database role.
pub const ENV_PG_USER: &str = "PG_USER_CW";
/// CityWide database password.
pub const ENV_PG_PASSWORD: &str = "PG_PASSWORD_CW";
/// Portal host.
pub const ENV_AGO_HOST: &str = "AGO_HOST";
/// Portal named user.
pub const ENV_AGO_USERNAME: &str = "AGO_USERNAME_DSS";
/// Portal password.
pub const ENV_AGO_PASSWORD: &str = "AGO_PASSWORD_DSS";
/// Directory receiving local copies of published documents.
pub const ENV_OUTPUT_DIR: &str = "PARC_OUTPUT_DIR";
/// HTTP request timeout in seconds.
pub const ENV_HTTP_TIMEOUT: &str = "PARC_HTTP_TIMEOUT_SECS";
/// Delay between publish status checks in seconds.
pub const ENV_POLL_SECS: &str = "PARC_PUBLISH_POLL_SECS";
/// Maximum publish status checks.
pub const ENV_MAX_POLLS: &str = "PARC_PUBLISH_MAX_POLLS";
/// Boundary polygon used by the quality check.
pub const ENV_BOUNDARY: &str = "PARC_BOUNDARY_GEOJSON";
/// Output path of the quality report.
pub const ENV_QUALITY_REPORT: &str = "PARC_QUALITY_REPORT";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable {name}")]
    MissingVariable {
        /// Variable name.
        name: &'static str,
    },
    /// A numeric variable did not parse.
    #[error("environment variable {name} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Settings of the publishing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// CityWide database credentials.
    pub database: DatabaseCredentials,
    /// Portal credentials.
    pub portal: PortalCredentials,
    /// Optional directory for local GeoJSON copies.
    pub output_dir: Option<Utf8PathBuf>,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// Publish job polling limits.
    pub poll: PollSettings,
}

impl PipelineConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`PipelineConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] naming the first absent
    /// required variable, or [`ConfigError::InvalidNumber`] for a malformed
    /// numeric setting.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = PollSettings::default();
        Ok(Self {
            database: database_credentials(&env)?,
            portal: PortalCredentials {
                host: env.required(ENV_AGO_HOST)?,
                username: env.required(ENV_AGO_USERNAME)?,
                password: Secret::new(env.required(ENV_AGO_PASSWORD)?),
            },
            output_dir: env.optional(ENV_OUTPUT_DIR).map(Utf8PathBuf::from),
            http_timeout: Duration::from_secs(
                env.number(ENV_HTTP_TIMEOUT)?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            poll: PollSettings {
                interval: env
                    .number(ENV_POLL_SECS)?
                    .map_or(defaults.interval, Duration::from_secs),
                max_polls: env.number(ENV_MAX_POLLS)?.unwrap_or(defaults.max_polls),
            },
        })
    }
}

/// Settings of the coordinate quality check.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    /// CityWide database credentials.
    pub database: DatabaseCredentials,
    /// GeoJSON file holding the province boundary.
    pub boundary: Utf8PathBuf,
    /// Optional report destination.
    pub report: Option<Utf8PathBuf>,
    /// Distance threshold and rounding.
    pub options: QualityOptions,
}

impl QualityConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`QualityConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] naming the first absent
    /// required variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        Ok(Self {
            database: database_credentials(&env)?,
            boundary: Utf8PathBuf::from(env.required(ENV_BOUNDARY)?),
            report: env.optional(ENV_QUALITY_REPORT).map(Utf8PathBuf::from),
            options: QualityOptions::default(),
        })
    }
}

fn database_credentials<F>(env: &Env<F>) -> Result<DatabaseCredentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(DatabaseCredentials {
        host: env.required(ENV_PG_HOST)?,
        port: env
            .number(ENV_PG_PORT)?
            .ok_or(ConfigError::MissingVariable { name: ENV_PG_PORT })?,
        database: env.required(ENV_PG_DATABASE)?,
        user: env.required(ENV_PG_USER)?,
        password: Secret::new(env.required(ENV_PG_PASSWORD)?),
    })
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim_end().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or(ConfigError::MissingVariable { name })
    }

    fn number<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.optional(name)
            .map(|value| {
                value
                    .trim_start()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { name, value })
            })
            .transpose()
    }
}
