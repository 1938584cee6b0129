//! Process configuration read from the environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use castle_auth::token::MAX_TTL_SECS;
use castle_auth::TokenTtls;

pub const DEFAULT_PUBLIC_HOST: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_SECRET: &str = "not-secret-secret-anymore";
pub const DEFAULT_JWT_EXP: i64 = 600;
pub const DEFAULT_REFRESH_TOKEN_EXP: i64 = 86_400;
pub const DEFAULT_REVOCATION_SWEEP_SECS: u64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("{var}={value} is outside 1..={max} seconds")]
    TtlOutOfRange { var: &'static str, value: i64, max: i64 },
}

/// Immutable after startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub public_host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_secret_defaulted: bool,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub revocation_sweep_secs: u64,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("public_host", &self.public_host)
            .field("port", &self.port)
            .field("jwt_secret_defaulted", &self.jwt_secret_defaulted)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("revocation_sweep_secs", &self.revocation_sweep_secs)
            .field("use_persistent_stores", &self.use_persistent_stores)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_host: DEFAULT_PUBLIC_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_secret_defaulted: true,
            access_ttl_secs: DEFAULT_JWT_EXP,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_EXP,
            revocation_sweep_secs: DEFAULT_REVOCATION_SWEEP_SECS,
            use_persistent_stores: false,
            database_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparsable numbers keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty());
        let jwt_secret_defaulted = jwt_secret.is_none();
        if jwt_secret_defaulted {
            warn!("JWT_SECRET not set; using insecure default");
        }

        let use_persistent_stores = lookup("USE_PERSISTENT_STORES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let access_ttl_secs = ttl_in_range("JWT_EXP", parse_or(lookup("JWT_EXP"), defaults.access_ttl_secs))?;
        let refresh_ttl_secs = ttl_in_range(
            "REFRESH_TOKEN_EXP",
            parse_or(lookup("REFRESH_TOKEN_EXP"), defaults.refresh_ttl_secs),
        )?;

        Ok(Self {
            public_host: lookup("PUBLIC_HOST").unwrap_or(defaults.public_host),
            port: parse_or(lookup("PORT"), defaults.port),
            jwt_secret: jwt_secret.unwrap_or(defaults.jwt_secret),
            jwt_secret_defaulted,
            access_ttl_secs,
            refresh_ttl_secs,
            revocation_sweep_secs: parse_or(lookup("REVOCATION_SWEEP_SECS"), defaults.revocation_sweep_secs),
            use_persistent_stores,
            database_url,
        })
    }

    pub fn token_ttls(&self) -> TokenTtls {
        TokenTtls::from_secs(self.access_ttl_secs, self.refresh_ttl_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.revocation_sweep_secs)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn ttl_in_range(var: &'static str, value: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_TTL_SECS).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::TtlOutOfRange {
            var,
            value,
            max: MAX_TTL_SECS,
        })
    }
}
