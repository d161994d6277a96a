use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

/// Application-level constants
pub const APP_NAME: &str = "Zappoint";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
/// Ten years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;
pub const DEFAULT_CLINIC_NAME: &str = "Medical Center";
pub const DEFAULT_PDF_FOOTER: &str =
    "This document is system-generated and does not require a signature.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Cannot determine home directory; set ZAPPOINT_DB_PATH")]
    NoHomeDir,
}

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub db_path: PathBuf,
    pub token_ttl_hours: i64,
    pub cors_origin: Option<String>,
    pub clinic_name: String,
    pub pdf_footer: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let port = match var("ZAPPOINT_PORT").or_else(|| var("PORT")) {
            Some(raw) => parse("ZAPPOINT_PORT", &raw)?,
            None => {
                info!("ZAPPOINT_PORT not set, using default: {DEFAULT_PORT}");
                DEFAULT_PORT
            }
        };

        let db_path = match var("ZAPPOINT_DB_PATH") {
            Some(raw) => PathBuf::from(raw),
            None => {
                let path = default_db_path()?;
                info!("ZAPPOINT_DB_PATH not set, using default: {}", path.display());
                path
            }
        };

        let token_ttl_hours = check_token_ttl(try_load(
            "ZAPPOINT_TOKEN_TTL_HOURS",
            DEFAULT_TOKEN_TTL_HOURS,
        )?)?;

        Ok(Self {
            bind: try_load("ZAPPOINT_BIND", IpAddr::from([0, 0, 0, 0]))?,
            port,
            db_path,
            token_ttl_hours,
            cors_origin: var("ZAPPOINT_CORS_ORIGIN"),
            clinic_name: var("ZAPPOINT_CLINIC_NAME").unwrap_or_else(|| DEFAULT_CLINIC_NAME.into()),
            pdf_footer: var("ZAPPOINT_PDF_FOOTER").unwrap_or_else(|| DEFAULT_PDF_FOOTER.into()),
        })
    }

    /// Configuration for tests and embedded use: in-memory friendly defaults.
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            db_path,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origin: None,
            clinic_name: DEFAULT_CLINIC_NAME.into(),
            pdf_footer: DEFAULT_PDF_FOOTER.into(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key: key.into(),
            reason: e.to_string(),
        }
    })
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match var(key) {
        Some(raw) => parse(key, &raw),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// Session lifetime must be positive and at most `MAX_TOKEN_TTL_HOURS`.
fn check_token_ttl(hours: i64) -> Result<i64, ConfigError> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            key: "ZAPPOINT_TOKEN_TTL_HOURS".into(),
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
        });
    }
    Ok(hours)
}

/// Get the application data directory: ~/Zappoint/
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("zappoint.db"))
}

pub fn default_log_filter() -> &'static str {
    "zappoint=info,tower_http=info"
}
