use std::env;
use std::str::FromStr;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Signing secrets and lifetimes for the two token kinds.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 8,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_name: String,
    pub tokens: TokenConfig,
    pub hashing: HashingConfig,
    pub starting_balance: Decimal,
    pub admin_emails: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let server_host = optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or("PORT", 3000u16)?;
        let store_backend = parse_or("STORE_BACKEND", StoreBackend::Mongo)?;
        let database_url = optional("DB_CONNECTION");
        if store_backend == StoreBackend::Mongo && database_url.is_none() {
            return Err(ConfigError::Missing("DB_CONNECTION"));
        }
        let database_name = optional("DB_NAME").unwrap_or_else(|| "ticket_sales".to_string());

        let access_secret = optional("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let refresh_secret =
            optional("REFRESH_JWT_SECRET").ok_or(ConfigError::Missing("REFRESH_JWT_SECRET"))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid {
                name: "REFRESH_JWT_SECRET",
                reason: "must differ from JWT_SECRET".to_string(),
            });
        }
        let tokens = TokenConfig {
            access_secret,
            refresh_secret,
            access_ttl: ttl_from_secs(
                "ACCESS_TOKEN_TTL_SECS",
                parse_or("ACCESS_TOKEN_TTL_SECS", 2 * 60 * 60i64)?,
            )?,
            refresh_ttl: ttl_from_secs(
                "REFRESH_TOKEN_TTL_SECS",
                parse_or("REFRESH_TOKEN_TTL_SECS", 24 * 60 * 60i64)?,
            )?,
        };

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or("HASH_PARALLELISM", defaults.parallelism)?,
        };

        let starting_balance = parse_or("STARTING_BALANCE", Decimal::from(100))?;
        if starting_balance.is_sign_negative() {
            return Err(ConfigError::Invalid {
                name: "STARTING_BALANCE",
                reason: "must not be negative".to_string(),
            });
        }

        let admin_emails = optional("ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        tracing::info!(
            backend = ?store_backend,
            port = server_port,
            admins = admin_emails.len(),
            "Application configuration loaded"
        );

        Ok(Self {
            server_host,
            server_port,
            store_backend,
            database_url,
            database_name,
            tokens,
            hashing,
            starting_balance,
            admin_emails,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Token lifetimes must be positive and still representable once added to the
/// current time.
fn ttl_from_secs(name: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    };
    if secs <= 0 {
        return Err(invalid("must be a positive number of seconds"));
    }
    let ttl = Duration::try_seconds(secs).ok_or_else(|| invalid("out of range"))?;
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| invalid("out of range"))?;
    Ok(ttl)
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
