use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Ten years; longer lifetimes are rejected at load time.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Knobs for the authentication workflow itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Whether `userId` is part of the response payload.
    pub include_user_id: bool,
    /// Deadline applied to each collaborator call.
    pub call_timeout_ms: u64,
}

impl AuthConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            include_user_id: true,
            call_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (env, map, ...).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "authflow".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "authflow-users".into()),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parse_or(&lookup, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            include_user_id: parse_or(&lookup, "AUTH_INCLUDE_USER_ID", defaults.include_user_id)?,
            call_timeout_ms: parse_or(&lookup, "AUTH_CALL_TIMEOUT_MS", defaults.call_timeout_ms)?,
        };

        if jwt.ttl_minutes <= 0 || jwt.refresh_ttl_minutes <= 0 {
            anyhow::bail!("JWT lifetimes must be positive");
        }
        if jwt.ttl_minutes > MAX_TTL_MINUTES || jwt.refresh_ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!("JWT lifetimes must not exceed {MAX_TTL_MINUTES} minutes");
        }

        Ok(Self {
            database_url,
            database_max_connections,
            jwt,
            auth,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
