use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{
    config::{JwtConfig, MAX_TTL_MINUTES},
    state::IdentityState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("The authentication token has expired")]
    Expired,
    #[error("The authentication token is invalid")]
    Invalid,
}

/// Identity claims carried by a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub username: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Signing and verification keys for identity tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl: Duration::from_secs(config.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }

    pub fn issue(&self, username: &str) -> anyhow::Result<String> {
        self.issue_at(username, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, username: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now
            .checked_add(TimeDuration::seconds(self.ttl.as_secs() as i64))
            .ok_or_else(|| anyhow::anyhow!("token expiry is out of range"))?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(username = %username, "jwt signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<TokenSubject, TokenError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature and structure first, then expiry against `now`.
    /// A token is still valid at exactly its expiry second.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<TokenSubject, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                TokenError::Invalid
            })?
            .claims;

        let issued_at =
            OffsetDateTime::from_unix_timestamp(claims.iat).map_err(|_| TokenError::Invalid)?;
        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| TokenError::Invalid)?;
        if now.unix_timestamp() > claims.exp {
            debug!(username = %claims.sub, "jwt expired");
            return Err(TokenError::Expired);
        }

        debug!(username = %claims.sub, "jwt verified");
        Ok(TokenSubject {
            username: claims.sub,
            issued_at,
            expires_at,
        })
    }
}

impl FromRef<IdentityState> for JwtKeys {
    fn from_ref(state: &IdentityState) -> Self {
        state.keys.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            ttl_minutes: 60,
        })
    }

    #[test]
    fn issue_and_validate() {
        let keys = make_keys("dev-secret");
        let token = keys.issue("alice").expect("issue");
        let subject = keys.validate(&token).expect("validate");
        assert_eq!(subject.username, "alice");
        assert_eq!(
            (subject.expires_at - subject.issued_at).whole_seconds(),
            60 * 60
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = make_keys("dev-secret");
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = keys.issue_at("alice", issued).expect("issue");
        assert_eq!(keys.validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let keys = make_keys("dev-secret");
        let issued = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let token = keys.issue_at("alice", issued).expect("issue");
        let exp = issued + TimeDuration::hours(1);

        assert!(keys.validate_at(&token, exp).is_ok());
        assert_eq!(
            keys.validate_at(&token, exp + TimeDuration::seconds(1)).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn foreign_secret_is_invalid_even_when_expired() {
        let good = make_keys("good-secret");
        let other = make_keys("other-secret");

        let fresh = other.issue("alice").expect("issue");
        assert_eq!(good.validate(&fresh).unwrap_err(), TokenError::Invalid);

        let stale = other
            .issue_at("alice", OffsetDateTime::now_utc() - TimeDuration::days(1))
            .expect("issue");
        assert_eq!(good.validate(&stale).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "test-issuer".into(),
            ttl_minutes: i64::MAX,
        });
        assert_eq!(keys.ttl.as_secs(), MAX_TTL_MINUTES as u64 * 60);
        let token = keys.issue("alice").expect("issue");
        assert!(keys.validate(&token).is_ok());
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = make_keys("dev-secret");
        assert_eq!(keys.validate("garbage").unwrap_err(), TokenError::Invalid);
        assert_eq!(keys.validate("").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let keys = make_keys("same-secret");
        let mut other = make_keys("same-secret");
        other.issuer = "someone-else".into();
        let token = other.issue("alice").expect("issue");
        assert_eq!(keys.validate(&token).unwrap_err(), TokenError::Invalid);
    }
}
