use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// Public host (and port) clients reach the API on.
    pub base_url: String,
    /// Scheme used in `public_url`, `http` or `https`.
    pub tls: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub allowed_origin: String,
    pub shutdown_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let base_url = lookup("BASE_URL").unwrap_or_else(|| format!("{}:{}", server_host, server_port));

        let tls = lookup("TLS").unwrap_or_else(|| "http".to_string());
        if tls != "http" && tls != "https" {
            return Err(ConfigError::Invalid {
                name: "TLS",
                value: tls,
            });
        }

        let bcrypt_cost: u32 = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            server_host,
            server_port,
            base_url,
            tls,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            token_ttl_minutes: parse_or(&lookup, "TOKEN_TTL_MINUTES", 300)?,
            bcrypt_cost,
            allowed_origin: lookup("ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            shutdown_timeout_secs: parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10)?,
        })
    }

    pub fn server_addr(&self) -> (String, u16) {
        (self.server_host.clone(), self.server_port)
    }

    pub fn public_url(&self) -> String {
        format!("{}://{}", self.tls, self.base_url)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse();
            parsed.map_err(|_| ConfigError::Invalid { name, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://test"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.server_addr(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(config.public_url(), "http://127.0.0.1:8080");
        assert_eq!(config.token_ttl_minutes, 300);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.allowed_origin, "http://localhost:3000");
        assert_eq!(config.shutdown_timeout_secs, 10);
    }

    #[test]
    fn test_custom_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("TLS", "https"),
            ("BASE_URL", "bikes.example.com"),
            ("TOKEN_TTL_MINUTES", "15"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.server_addr(), ("0.0.0.0".to_string(), 3000));
        assert_eq!(config.public_url(), "https://bikes.example.com");
        assert_eq!(config.token_ttl(), chrono::Duration::minutes(15));
    }

    #[test]
    fn test_missing_required() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TLS", "ftp"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TLS", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BCRYPT_COST", "2"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BCRYPT_COST", .. }));
    }
}
