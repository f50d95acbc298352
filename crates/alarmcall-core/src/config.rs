//! Shared configuration for Alarm Call.
//!
//! Locates the state directory and reads runtime settings from the
//! environment.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.alarm-call/
//! ├── db/           # SQLite database (calls.db)
//! └── config/       # .env.local with secrets
//! ```
//!
//! # Environment Variables
//!
//! - `ALARMCALL_STATE_DIR`: Override the base state directory
//! - `ALARMCALL_DB_DIR`: Override the database directory
//! - `ALARMCALL_CONFIG_DIR`: Override the config directory
//! - `ZVONOK_API_TOKEN`: Zvonok public API key
//! - `ZVONOK_CAMPAIGN_ID`: Zvonok campaign ID
//! - `ZVONOK_API_URI`: Override the Zvonok API base for the selected environment
//! - `ALARMCALL_ALERT_CHANNELS`: Comma separated channel IDs whose posts trigger calls
//! - `ALARMCALL_MAX_CALL_HOURS`: Longest call window a user may open
//! - `ALARMCALL_ZVONOK_MAX_ATTEMPTS`: Attempts per provider request, retries included

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, warn};

use crate::call_command::DEFAULT_MAX_CALL_HOURS;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "ALARMCALL_STATE_DIR";

/// Environment variable for custom database directory.
pub const DB_DIR_ENV: &str = "ALARMCALL_DB_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "ALARMCALL_CONFIG_DIR";

pub const ZVONOK_API_TOKEN_ENV: &str = "ZVONOK_API_TOKEN";
pub const ZVONOK_CAMPAIGN_ID_ENV: &str = "ZVONOK_CAMPAIGN_ID";
pub const ZVONOK_API_URI_ENV: &str = "ZVONOK_API_URI";
pub const ALERT_CHANNELS_ENV: &str = "ALARMCALL_ALERT_CHANNELS";
pub const MAX_CALL_HOURS_ENV: &str = "ALARMCALL_MAX_CALL_HOURS";
pub const ZVONOK_MAX_ATTEMPTS_ENV: &str = "ALARMCALL_ZVONOK_MAX_ATTEMPTS";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".alarm-call";

const DB_SUBDIR: &str = "db";
const CONFIG_SUBDIR: &str = "config";

/// Database file name inside the database directory.
const DATABASE_FILE: &str = "calls.db";

const DEFAULT_CAMPAIGN_ID: &str = "270119321";
const DEFAULT_ALERT_CHANNELS: &[i64] = &[-1002194118218];
const DEFAULT_ZVONOK_MAX_ATTEMPTS: u32 = 3;

const PRODUCTION_API_URI: &str = "https://zvonok.com";
const TESTING_API_URI: &str = "http://127.0.0.1:8080";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Errors raised while reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Get the Alarm Call state directory.
///
/// The state directory is determined by:
/// 1. `ALARMCALL_STATE_DIR` environment variable if set
/// 2. `~/.alarm-call` if home directory is available
/// 3. `.alarm-call` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the database directory.
///
/// Defaults to `~/.alarm-call/db/` or `ALARMCALL_DB_DIR` env var.
pub fn db_dir() -> PathBuf {
    std::env::var(DB_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(DB_SUBDIR))
}

/// Get the user config directory.
///
/// Defaults to `~/.alarm-call/config/` or `ALARMCALL_CONFIG_DIR` env var.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Path of the SQLite database holding phones and call windows.
pub fn database_file() -> PathBuf {
    db_dir().join(DATABASE_FILE)
}

/// Get the .env.local file path.
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory and its subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(db_dir())?;
    std::fs::create_dir_all(config_dir())?;
    Ok(())
}

/// Env files applied by [`load_env_files`].
///
/// Loading happens before logging is configured, so the outcome is kept
/// here and reported through [`EnvFilesReport::log`] afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvFilesReport {
    pub loaded: Vec<PathBuf>,
    /// Path and parse error for each file that exists but could not be applied.
    pub failed: Vec<(PathBuf, String)>,
}

impl EnvFilesReport {
    pub fn log(&self) {
        for path in &self.loaded {
            debug!(path = %path.display(), "Loaded env file");
        }
        for (path, error) in &self.failed {
            warn!(path = %path.display(), error = %error, "Failed to load env file");
        }
    }
}

/// Load `.env` style files: the config directory first, then `.env.local`
/// (or `.env` when absent) in the working directory.
///
/// Variables already present in the process environment are never overridden.
pub fn load_env_files() -> EnvFilesReport {
    let local = PathBuf::from(".env.local");
    let working_dir = if local.exists() {
        local
    } else {
        PathBuf::from(".env")
    };
    load_env_files_from(&[env_file(), working_dir])
}

/// Apply each existing file in order. Missing files are skipped.
pub fn load_env_files_from(paths: &[PathBuf]) -> EnvFilesReport {
    let mut report = EnvFilesReport::default();
    for path in paths.iter().filter(|p| p.exists()) {
        match dotenvy::from_path(path) {
            Ok(()) => report.loaded.push(path.clone()),
            Err(e) => report.failed.push((path.clone(), e.to_string())),
        }
    }
    report
}

/// Deployment profile the bot runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Environment {
    /// Local provider stub, verbose logging.
    #[default]
    Testing,
    /// Real Zvonok endpoint.
    Production,
}

impl Environment {
    /// Zvonok API base used when `ZVONOK_API_URI` is not set.
    pub fn default_api_uri(self) -> &'static str {
        match self {
            Environment::Testing => TESTING_API_URI,
            Environment::Production => PRODUCTION_API_URI,
        }
    }

    pub fn is_debug(self) -> bool {
        matches!(self, Environment::Testing)
    }
}

/// Runtime settings for the bot and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub environment: Environment,
    /// Zvonok public key. Absence is rejected when the call client is built.
    pub zvonok_api_token: Option<String>,
    pub zvonok_campaign_id: String,
    pub zvonok_api_uri: String,
    pub zvonok_max_attempts: u32,
    /// Channels whose new posts trigger calls.
    pub alert_channels: HashSet<i64>,
    /// Inclusive upper bound for `/call N`.
    pub max_call_hours: u32,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(environment, |name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(environment: Environment, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let alert_channels = match get(ALERT_CHANNELS_ENV) {
            Some(raw) => parse_channels(&raw)?,
            None => DEFAULT_ALERT_CHANNELS.iter().copied().collect(),
        };

        Ok(Self {
            environment,
            zvonok_api_token: get(ZVONOK_API_TOKEN_ENV),
            zvonok_campaign_id: get(ZVONOK_CAMPAIGN_ID_ENV)
                .unwrap_or_else(|| DEFAULT_CAMPAIGN_ID.to_string()),
            zvonok_api_uri: get(ZVONOK_API_URI_ENV)
                .unwrap_or_else(|| environment.default_api_uri().to_string()),
            zvonok_max_attempts: parse_positive(
                ZVONOK_MAX_ATTEMPTS_ENV,
                get(ZVONOK_MAX_ATTEMPTS_ENV),
                DEFAULT_ZVONOK_MAX_ATTEMPTS,
            )?,
            alert_channels,
            max_call_hours: parse_positive(
                MAX_CALL_HOURS_ENV,
                get(MAX_CALL_HOURS_ENV),
                DEFAULT_MAX_CALL_HOURS,
            )?,
        })
    }
}

fn parse_channels(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                var: ALERT_CHANNELS_ENV,
                value: raw.to_string(),
            })
        })
        .collect()
}

fn parse_positive(
    var: &'static str,
    value: Option<String>,
    default: u32,
) -> Result<u32, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidValue { var, value: v }),
        },
    }
}
