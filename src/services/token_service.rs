// src/services/token_service.rs - HS256 identity tokens
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Claims carried by every token: who the caller is, plus issue/expiry
/// timestamps in seconds since the epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, id: Uuid, email: &str) -> Result<String, TokenError> {
        self.issue_at(id, email, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit clock.
    pub fn issue_at(&self, id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Encode)
    }

    /// Signature and expiry must both check out.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let svc = TokenService::new("test-secret");
        let id = Uuid::new_v4();
        let token = svc.issue(id, "ada@example.com").unwrap();

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenService::new("secret-a").issue(Uuid::new_v4(), "a@example.com").unwrap();
        assert!(matches!(
            TokenService::new("secret-b").verify(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("test-secret");
        let issued = Utc::now() - Duration::hours(25);
        let token = svc.issue_at(Uuid::new_v4(), "a@example.com", issued).unwrap();
        assert!(svc.verify(&token).is_err());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = TokenService::new("test-secret");
        let token = svc.issue(Uuid::new_v4(), "a@example.com").unwrap();
        let other = svc.issue(Uuid::new_v4(), "b@example.com").unwrap();

        // header.payload.signature: splice the second payload under the first signature
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(svc.verify(&forged).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let svc = TokenService::new("test-secret");
        assert!(svc.verify("").is_err());
        assert!(svc.verify("not.a.jwt").is_err());
        assert!(svc.verify("abc").is_err());
    }
}
