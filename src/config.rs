use std::env;
use std::fmt;

use crate::telegram::client::{check_limit, OffsetPolicy, DEFAULT_API_URL, DEFAULT_LIMIT};
use crate::telegram::{Result, TelegramError};

/// Client settings read from the environment.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub debug: bool,
    pub limit: u32,
    pub timeout: u32,
    pub offset_policy: OffsetPolicy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("debug", &self.debug)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("offset_policy", &self.offset_policy)
            .finish()
    }
}

impl Config {
    /// Reads `TELEGRAM_TOKEN` (required), `TELEGRAM_API_URL`,
    /// `TELEGRAM_DEBUG`, `TELEGRAM_LIMIT`, `TELEGRAM_TIMEOUT` and
    /// `TELEGRAM_OFFSET_POLICY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                TelegramError::ConfigError("TELEGRAM_TOKEN environment variable is required".to_string())
            })?;

        let api_url = lookup("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let debug = match lookup("TELEGRAM_DEBUG") {
            Some(v) => parse_flag("TELEGRAM_DEBUG", &v)?,
            None => false,
        };

        let limit = match lookup("TELEGRAM_LIMIT") {
            Some(v) => check_limit(parse_number("TELEGRAM_LIMIT", &v)?)?,
            None => DEFAULT_LIMIT,
        };

        let timeout = match lookup("TELEGRAM_TIMEOUT") {
            Some(v) => parse_number("TELEGRAM_TIMEOUT", &v)?,
            None => 0,
        };

        let offset_policy = match lookup("TELEGRAM_OFFSET_POLICY") {
            Some(v) => v.parse()?,
            None => OffsetPolicy::default(),
        };

        Ok(Self {
            token,
            api_url,
            debug,
            limit,
            timeout,
            offset_policy,
        })
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(TelegramError::ConfigError(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| TelegramError::ConfigError(format!("{key} must be a number: {e}")))
}
