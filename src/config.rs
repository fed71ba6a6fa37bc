//! Configuration types, read from environment variables.
//!
//! Each section has a `from_env()` constructor built on `from_lookup()`,
//! which takes the variable source as a closure so tests need not touch the
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::registration::session::ExternalIdentity;

const DEFAULT_DB_PATH: &str = "./data/registrations.db";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WORKSHEET: &str = "main";
const DEFAULT_CLI_USER_ID: i64 = 1;

/// Read `key`, treating blank values as unset.
fn var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `key` if set, or fall back to `default`.
fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(lookup, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Primary database settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Upper bound on any single store or mirror call.
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = var(&lookup, "REGBOT_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let timeout_secs: u64 =
            parsed(&lookup, "REGBOT_STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REGBOT_STORE_TIMEOUT_SECS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            db_path: PathBuf::from(db_path),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Spreadsheet mirror settings.
#[derive(Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub access_token: SecretString,
    pub worksheet: String,
}

impl SheetsConfig {
    /// `None` unless both the spreadsheet id and the access token are set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let spreadsheet_id = var(&lookup, "GOOGLE_SHEETS_SPREADSHEET_ID")?;
        let access_token = var(&lookup, "GOOGLE_SHEETS_ACCESS_TOKEN")?;
        let worksheet =
            var(&lookup, "GOOGLE_SHEETS_WORKSHEET").unwrap_or_else(|| DEFAULT_WORKSHEET.into());

        Some(Self {
            spreadsheet_id,
            access_token: SecretString::from(access_token),
            worksheet,
        })
    }
}

/// Where conversations come from.
#[derive(Debug)]
pub enum TransportConfig {
    Telegram { bot_token: SecretString },
    /// Local stdin/stdout REPL as a single fixed user.
    Cli { user_id: ExternalIdentity },
}

/// Full bot configuration.
#[derive(Debug)]
pub struct BotConfig {
    pub transport: TransportConfig,
    pub store: StoreConfig,
    pub sheets: Option<SheetsConfig>,
    /// Port for the read-only HTTP API; disabled when unset.
    pub http_port: Option<u16>,
    /// Directory for daily log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cli_mode = matches!(
            var(&lookup, "REGBOT_CLI").as_deref(),
            Some("1" | "true" | "yes")
        );

        let transport = if cli_mode {
            let user_id: i64 = parsed(&lookup, "REGBOT_CLI_USER_ID", DEFAULT_CLI_USER_ID)?;
            TransportConfig::Cli {
                user_id: ExternalIdentity(user_id),
            }
        } else {
            let token = var(&lookup, "BOT_TOKEN")
                .ok_or_else(|| ConfigError::MissingEnvVar("BOT_TOKEN".into()))?;
            TransportConfig::Telegram {
                bot_token: SecretString::from(token),
            }
        };

        let http_port = match var(&lookup, "REGBOT_HTTP_PORT") {
            Some(_) => Some(parsed(&lookup, "REGBOT_HTTP_PORT", 0u16)?),
            None => None,
        };

        Ok(Self {
            transport,
            store: StoreConfig::from_lookup(&lookup)?,
            sheets: SheetsConfig::from_lookup(&lookup),
            http_port,
            log_dir: var(&lookup, "REGBOT_LOG_DIR").map(PathBuf::from),
        })
    }
}
