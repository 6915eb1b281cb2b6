//! Token models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Owning user. The only field authorization decisions may use.
    pub user_id: Uuid,
    /// Username at issue time. Display hint only; it can go stale.
    pub username: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

/// JWT claims embedded in refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject: the user id (standard JWT `sub` claim).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// An access/refresh token pair handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
