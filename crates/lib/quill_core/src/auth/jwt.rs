//! JWT token generation and verification.
//!
//! Access and refresh tokens are signed with independent secrets, so a
//! leaked secret for one class cannot be used to forge the other.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::auth::{AccessClaims, RefreshClaims};

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 7 days. Also the TTL of the liveness entry.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// Signing and verification keys for both token classes.
#[derive(Clone)]
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }
}

/// HS256 only, `exp` required, no clock leeway.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, ServiceError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|e| {
        tracing::error!(error = %e, "jwt encode failed");
        ServiceError::Internal("token generation failed".into())
    })
}

/// Generate a signed access token (HS256, 1 hour expiry).
pub fn generate_access_token(
    user_id: Uuid,
    username: &str,
    keys: &TokenKeys,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = AccessClaims {
        user_id,
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS)).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, &keys.access_encoding)
}

/// Generate a signed refresh token (HS256, 7 day expiry).
pub fn generate_refresh_token(user_id: Uuid, keys: &TokenKeys) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS)).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    sign(&claims, &keys.refresh_encoding)
}

/// Verify an access token, returning the claims on success.
pub fn verify_access_token(token: &str, keys: &TokenKeys) -> Option<AccessClaims> {
    decode::<AccessClaims>(token, &keys.access_decoding, &validation())
        .ok()
        .map(|data| data.claims)
}

/// Verify a refresh token's signature and expiry. Liveness is checked separately.
pub fn verify_refresh_token(token: &str, keys: &TokenKeys) -> Option<RefreshClaims> {
    decode::<RefreshClaims>(token, &keys.refresh_decoding, &validation())
        .ok()
        .map(|data| data.claims)
}

/// Resolve a signing secret: env var `var` → persisted file `file_name`.
///
/// When neither exists a random secret is generated and persisted, so each
/// token class gets its own independent secret.
pub fn resolve_secret(var: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), var, "generated new signing secret");
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
        .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(b"access-secret", b"refresh-secret")
    }

    #[test]
    fn access_token_roundtrip_preserves_identity() {
        let id = Uuid::new_v4();
        let token = generate_access_token(id, "alice", &keys()).unwrap();
        let claims = verify_access_token(&token, &keys()).expect("valid token");
        assert_eq!(claims.user_id, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_EXPIRY_SECS);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let id = Uuid::new_v4();
        let refresh = generate_refresh_token(id, &keys()).unwrap();
        assert!(verify_access_token(&refresh, &keys()).is_none());
        let access = generate_access_token(id, "alice", &keys()).unwrap();
        assert!(verify_refresh_token(&access, &keys()).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(Uuid::new_v4(), "alice", &keys()).unwrap();
        let other = TokenKeys::new(b"other", b"refresh-secret");
        assert!(verify_access_token(&token, &other).is_none());
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            iat: now - 7200,
            exp: now - 10,
            jti: "x".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();
        assert!(verify_access_token(&token, &keys()).is_none());
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            iat: now,
            exp: now + 60,
            jti: "x".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();
        assert!(verify_access_token(&token, &keys()).is_none());
    }

    #[test]
    fn refresh_tokens_minted_together_are_distinct() {
        let id = Uuid::new_v4();
        let a = generate_refresh_token(id, &keys()).unwrap();
        let b = generate_refresh_token(id, &keys()).unwrap();
        assert_ne!(a, b);
    }
}
