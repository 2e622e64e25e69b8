// src/config.rs
use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub allowed_origin: String,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url: database_url(&lookup)?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            allowed_origin: lookup("ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// `DATABASE_URL` wins; otherwise the discrete `DB_*` variables are composed.
fn database_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        return Ok(url);
    }

    let host = lookup("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL"))?;
    let user = lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let password = lookup("DB_PASSWORD").unwrap_or_default();
    let name = lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let port: u16 = parse_or(lookup, "DB_PORT", 5432)?;

    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}
