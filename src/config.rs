use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;

/// Where server-side sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Postgres,
    Memory,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown session store '{other}' (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub backend: SessionBackend,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub session: SessionConfig,
}

/// Longest session lifetime accepted from the environment (ten years).
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from `var`, which returns the raw value of a variable if set.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let session = SessionConfig {
            secret: var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            issuer: var("SESSION_ISSUER").unwrap_or_else(|| "coursefeedback".into()),
            audience: var("SESSION_AUDIENCE").unwrap_or_else(|| "coursefeedback-web".into()),
            ttl_minutes: parse_or(&var, "SESSION_TTL_MINUTES", 60 * 24 * 7)?,
            cookie_name: var("SESSION_COOKIE_NAME").unwrap_or_else(|| "session".into()),
            cookie_secure: parse_or(&var, "SESSION_COOKIE_SECURE", false)?,
            backend: parse_or(&var, "SESSION_STORE", SessionBackend::Postgres)?,
            purge_interval_secs: parse_or(&var, "SESSION_PURGE_INTERVAL_SECS", 600)?,
        };
        anyhow::ensure!(!session.secret.is_empty(), "SESSION_SECRET must not be empty");
        anyhow::ensure!(
            (1..=MAX_SESSION_TTL_MINUTES).contains(&session.ttl_minutes),
            "SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}"
        );

        let bind_addr: SocketAddr = format!(
            "{}:{}",
            var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            var("APP_PORT").unwrap_or_else(|| "8080".into())
        )
        .parse()
        .context("APP_HOST/APP_PORT do not form a socket address")?;

        Ok(Self {
            database_url,
            max_db_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            bind_addr,
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            session,
        })
    }
}

/// Reads `key` and parses it, falling back to `default` when the variable is unset.
/// A variable that is set but unparsable is a startup error.
fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}
