//! Password hashing, token issuance and the authenticated-principal extractor.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use toolkit_types::{AUTH_HEADER, UserId};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user: ClaimsUser,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaimsUser {
    id: i64,
}

/// Signs and verifies HS256 session tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, user: UserId) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            user: ClaimsUser { id: user.0 },
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                ApiError::InvalidToken
            })?;
        Ok(UserId(data.claims.user.id))
    }
}

/// Hash `password` into a PHC string. Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// Check `password` against a stored PHC string. Runs on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ApiError::Internal(format!("stored hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// The principal behind the `x-auth-token` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::MissingToken)?;

        state.tokens.verify(token).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let keys = TokenKeys::new(b"secret", Duration::days(7));
        let token = keys.issue(UserId(42)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), UserId(42));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = TokenKeys::new(b"secret", Duration::hours(-2));
        let token = keys.issue(UserId(1)).unwrap();
        assert!(matches!(keys.verify(&token), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = TokenKeys::new(b"one", Duration::days(1));
        let verifier = TokenKeys::new(b"two", Duration::days(1));
        let token = issuer.issue(UserId(1)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[tokio::test]
    async fn test_password_hash_verifies() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }
}
