use anyhow::Context;
use serde::Deserialize;
use url::Url;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

/// Which backend holds the records of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    fn from_env() -> Self {
        match std::env::var("STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub store: StoreKind,
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl IdentityConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreKind::from_env();
        let database_url = database_url(store)?;
        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "moviereview-identity".into()),
            ttl_minutes: ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref())?,
        };
        Ok(Self {
            store,
            database_url,
            jwt,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub store: StoreKind,
    pub database_url: String,
    /// Base URL of the identity provider, e.g. `http://localhost:5001/`.
    pub identity_url: Url,
    pub identity_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl CatalogConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreKind::from_env();
        let database_url = database_url(store)?;
        let raw = std::env::var("IDENTITY_URL").context("IDENTITY_URL must be set")?;
        let identity_url =
            Url::parse(&raw).with_context(|| format!("IDENTITY_URL is not a valid url: {raw}"))?;
        Ok(Self {
            store,
            database_url,
            identity_url,
            identity_timeout_secs: std::env::var("IDENTITY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        })
    }
}

/// Token lifetime from `JWT_TTL_MINUTES`; 60 when unset.
fn ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(60);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("JWT_TTL_MINUTES is not a number: {raw}"))?;
    anyhow::ensure!(
        (1..=MAX_TTL_MINUTES).contains(&minutes),
        "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {minutes}"
    );
    Ok(minutes)
}

fn database_url(store: StoreKind) -> anyhow::Result<String> {
    match store {
        StoreKind::Postgres => std::env::var("DATABASE_URL").context("DATABASE_URL must be set"),
        StoreKind::Memory => Ok(std::env::var("DATABASE_URL").unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_to_an_hour() {
        assert_eq!(ttl_minutes(None).unwrap(), 60);
        assert_eq!(ttl_minutes(Some(" 15 ")).unwrap(), 15);
        assert_eq!(ttl_minutes(Some("525600")).unwrap(), MAX_TTL_MINUTES);
    }

    #[test]
    fn bad_ttl_fails_startup() {
        for raw in ["sixty", "", "0", "-5", "525601", "9223372036854775807"] {
            assert!(ttl_minutes(Some(raw)).is_err(), "{raw} was accepted");
        }
    }
}
