//! Runtime configuration read from the environment (and `.env`, if present).

use std::{collections::HashMap, env};

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} env var is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    /// Shared secret of the auth provider, used to verify bearer tokens.
    pub jwt_secret: SecretString,

    pub resend_api_key: Option<SecretString>,
    pub resend_api_url: Option<String>,
    pub email_from: Option<String>,

    pub anthropic_api_key: Option<SecretString>,
    pub anthropic_model: Option<String>,

    /// Public origin of this server, e.g. `https://followups.example.com`.
    /// Enables the open-tracking pixel in outgoing emails.
    pub tracking_base_url: Option<String>,
}

/// Load `.env` (when present) and read the process environment.
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    Config::from_env()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset.
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = var("AUTH_JWT_SECRET")
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?;

        let tracking_base_url = match var("TRACKING_BASE_URL") {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(ConfigError::Invalid {
                    name: "TRACKING_BASE_URL",
                    value: url,
                });
            }
            other => other,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret,
            resend_api_key: var("RESEND_API_KEY").map(SecretString::from),
            resend_api_url: var("RESEND_API_URL"),
            email_from: var("EMAIL_FROM"),
            anthropic_api_key: var("ANTHROPIC_API_KEY").map(SecretString::from),
            anthropic_model: var("ANTHROPIC_MODEL"),
            tracking_base_url,
        })
    }
}
