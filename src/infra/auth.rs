//! Admin session tokens (HS256 JWT).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign session token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("session token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
    #[error("session token subject `{0}` is not an admin id")]
    Subject(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, admin_id: Uuid) -> Result<String, TokenError> {
        self.issue_at(admin_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, admin_id: Uuid, now: OffsetDateTime) -> Result<String, TokenError> {
        let claims = AdminClaims {
            sub: admin_id.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<AdminClaims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::Rejected)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Subject(data.claims.sub))
    }
}

/// Pull a bearer token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_admin() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(7));
        let admin = Uuid::new_v4();

        let token = issuer.issue(admin).expect("sign");
        assert_eq!(issuer.verify(&token).expect("verify"), admin);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let ours = TokenIssuer::new("ours", Duration::days(7));
        let theirs = TokenIssuer::new("theirs", Duration::days(7));
        let token = theirs.issue(Uuid::new_v4()).expect("sign");

        assert!(matches!(ours.verify(&token), Err(TokenError::Rejected(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(7));
        let long_ago = OffsetDateTime::now_utc() - Duration::days(30);
        let token = issuer.issue_at(Uuid::new_v4(), long_ago).expect("sign");

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
