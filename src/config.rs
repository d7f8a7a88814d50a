//! # Configuration Module
//!
//! Runtime settings read from the environment (and `.env` through `dotenv`).

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;

// Constants for configuration defaults
pub const DEFAULT_API_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration structure for the storefront process
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Telegram bot token; the bot is not started without it
    pub telegram_bot_token: Option<String>,
    /// Address the REST API listens on
    pub api_bind_addr: SocketAddr,
    /// Upper bound of the database pool
    pub database_max_connections: u32,
    pub log_format: LogFormat,
}

impl Config {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = non_empty("DATABASE_URL").context("DATABASE_URL must be set")?;

        let api_bind_addr = non_empty("API_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_API_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("API_BIND_ADDR must be a socket address such as 0.0.0.0:8000")?;

        let database_max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be a positive integer");
        }

        let log_format = match non_empty("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be `text` or `json`, got `{other}`"),
        };

        Ok(Self {
            database_url,
            telegram_bot_token: non_empty("TELEGRAM_BOT_TOKEN"),
            api_bind_addr,
            database_max_connections,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/shop");
        assert_eq!(config.telegram_bot_token, None);
        assert_eq!(config.api_bind_addr.to_string(), DEFAULT_API_BIND_ADDR);
        assert_eq!(config.database_max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_all_values() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("API_BIND_ADDR", "0.0.0.0:9000"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.api_bind_addr.port(), 9000);
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let db = ("DATABASE_URL", "postgres://db/shop");
        assert!(config_from(&[db, ("API_BIND_ADDR", "localhost")]).is_err());
        assert!(config_from(&[db, ("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(config_from(&[db, ("DATABASE_MAX_CONNECTIONS", "many")]).is_err());
        assert!(config_from(&[db, ("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_empty_token_disables_bot() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("TELEGRAM_BOT_TOKEN", ""),
        ])
        .unwrap();
        assert_eq!(config.telegram_bot_token, None);
    }
}
