use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;
use tracing::info;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_POOL_SIZE: &str = "5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable '{0}' must be set")]
    Missing(&'static str),

    #[error("environment variable '{key}' has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub pool_size: u32,
}

impl Config {
    /// Reads the environment, after loading `.env` if there is one.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let pool_size: u32 = parse_or(&lookup, "DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_POOL_SIZE",
                value: pool_size.to_string(),
                reason: String::from("must be at least 1"),
            });
        }

        Ok(Self {
            addr: parse_or(&lookup, "POLL_SERVER_ADDR", DEFAULT_ADDR)?,
            database_url,
            pool_size,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/polls")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.database_url, "postgres://localhost/polls");
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(load(&[("DATABASE_URL", "  ")]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/polls"),
            ("POLL_SERVER_ADDR", "127.0.0.1:8080"),
            ("DATABASE_POOL_SIZE", "12"),
        ]).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.pool_size, 12);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = load(&[("DATABASE_URL", "postgres://db"), ("DATABASE_POOL_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_POOL_SIZE", .. }));

        let err = load(&[("DATABASE_URL", "postgres://db"), ("DATABASE_POOL_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_POOL_SIZE", .. }));

        let err = load(&[("DATABASE_URL", "postgres://db"), ("POLL_SERVER_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_SERVER_ADDR", .. }));
    }
}
