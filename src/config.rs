use std::env;

use chrono::Duration;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL: &str = "7d";
pub const DEFAULT_DATABASE_NAME: &str = "ecommerce";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub database_url: Option<String>,
    pub database_name: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let ttl_raw = get("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_TOKEN_TTL.to_string());
        let token_ttl = parse_ttl(&ttl_raw).ok_or(ConfigError::Invalid {
            name: "JWT_EXPIRES_IN",
            value: ttl_raw.clone(),
        })?;

        Ok(Config {
            jwt_secret,
            token_ttl,
            database_url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

/// Accepts `<n>` (seconds) or `<n>` followed by one of `s`, `m`, `h`, `d`.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&raw[..i], Some(c)),
        _ => (raw, None),
    };
    let n: i64 = digits.parse().ok().filter(|n| *n > 0)?;
    match unit {
        None | Some('s') => Some(Duration::seconds(n)),
        Some('m') => Some(Duration::minutes(n)),
        Some('h') => Some(Duration::hours(n)),
        Some('d') => Some(Duration::days(n)),
        Some(_) => None,
    }
}
