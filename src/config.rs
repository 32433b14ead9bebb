use std::env;
use std::time::Duration;

use thiserror::Error;

/// Shortest HS256 secret accepted, in bytes (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,
}

/// Settings of the token subsystem. Built once at startup and handed to the
/// issuer, validator and store; nothing reads the environment after that.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub store_timeout: Duration,
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Defaults for everything except the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            issuer: "taskkeeper".to_string(),
            audience: "taskkeeper-client".to_string(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            store_timeout: Duration::from_millis(500),
            secure_cookies: true,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let mut auth = AuthConfig::with_secret(jwt_secret);
        auth.issuer = or_default("JWT_ISSUER", &auth.issuer);
        auth.audience = or_default("JWT_AUDIENCE", &auth.audience);
        auth.access_ttl_secs = parse(&lookup, "ACCESS_TOKEN_TTL_SECS", auth.access_ttl_secs)?;
        auth.refresh_ttl_secs = parse(&lookup, "REFRESH_TOKEN_TTL_SECS", auth.refresh_ttl_secs)?;
        auth.store_timeout = Duration::from_millis(parse(&lookup, "STORE_TIMEOUT_MS", 500u64)?);
        auth.secure_cookies = parse(&lookup, "COOKIE_SECURE", true)?;

        for (key, ttl) in [
            ("ACCESS_TOKEN_TTL_SECS", auth.access_ttl_secs),
            ("REFRESH_TOKEN_TTL_SECS", auth.refresh_ttl_secs),
        ] {
            if ttl <= 0 {
                return Err(ConfigError::Invalid {
                    key,
                    value: ttl.to_string(),
                });
            }
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: or_default("REDIS_URL", "redis://127.0.0.1:6379"),
            server_port: parse(&lookup, "SERVER_PORT", 8080)?,
            server_host: or_default("SERVER_HOST", "127.0.0.1"),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            auth,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
