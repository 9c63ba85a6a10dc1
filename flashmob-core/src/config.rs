use std::{env, str::FromStr};

use chrono::Duration;
use thiserror::Error;

/// The configuration of a flashmob instance
#[derive(Debug, Clone)]
pub struct Config {
    /// The port the HTTP server listens on
    pub server_port: u16,
    /// Postgres connection string. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// How many days a login token stays valid
    pub token_lifetime_days: i64,
    /// The most sessions a nearby search returns
    pub nearby_limit: usize,
    /// Search radius in miles used when the caller gives none
    pub default_search_radius: f64,
}

#[derive(Debug, Error)]
#[error("{key} has an invalid value: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl Config {
    pub const SERVER_PORT_VAR: &'static str = "FLASHMOB_SERVER_PORT";
    pub const DATABASE_URL_VAR: &'static str = "FLASHMOB_DATABASE_URL";
    pub const TOKEN_LIFETIME_VAR: &'static str = "FLASHMOB_TOKEN_LIFETIME_DAYS";
    pub const NEARBY_LIMIT_VAR: &'static str = "FLASHMOB_NEARBY_LIMIT";
    pub const SEARCH_RADIUS_VAR: &'static str = "FLASHMOB_DEFAULT_SEARCH_RADIUS";
    /// Read by the logger, before the rest of the configuration
    pub const LOG_LEVEL_VAR: &'static str = "FLASHMOB_LOG";

    /// Reads the configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());

        let config = Self {
            server_port: parse(Self::SERVER_PORT_VAR, read(Self::SERVER_PORT_VAR))?
                .unwrap_or(defaults.server_port),
            database_url: read(Self::DATABASE_URL_VAR),
            token_lifetime_days: parse(Self::TOKEN_LIFETIME_VAR, read(Self::TOKEN_LIFETIME_VAR))?
                .unwrap_or(defaults.token_lifetime_days),
            nearby_limit: parse(Self::NEARBY_LIMIT_VAR, read(Self::NEARBY_LIMIT_VAR))?
                .unwrap_or(defaults.nearby_limit),
            default_search_radius: parse(Self::SEARCH_RADIUS_VAR, read(Self::SEARCH_RADIUS_VAR))?
                .unwrap_or(defaults.default_search_radius),
        };

        if config.token_lifetime_days < 1 {
            return Err(ConfigError {
                key: Self::TOKEN_LIFETIME_VAR,
                value: config.token_lifetime_days.to_string(),
            });
        }

        Ok(config)
    }

    /// How long a login token stays valid
    pub fn token_lifetime(&self) -> Duration {
        Duration::days(self.token_lifetime_days)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 9050,
            database_url: None,
            // Users stay logged in for a week
            token_lifetime_days: 7,
            nearby_limit: 20,
            default_search_radius: 5.0,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.trim().parse::<T>().map_err(|_| ConfigError { key, value: v }))
        .transpose()
}
