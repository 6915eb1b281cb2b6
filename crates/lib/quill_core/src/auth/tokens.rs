//! Login, access verification and single-use refresh rotation.
//!
//! A refresh token is live while the key-value store holds
//! `refresh_token:<sha256 hex of token>` mapping to the owner's id. Refresh
//! consumes that entry atomically before anything else happens, so a token
//! can be redeemed at most once even under concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::jwt::{
    REFRESH_TOKEN_EXPIRY_SECS, TokenKeys, generate_access_token, generate_refresh_token,
    verify_access_token, verify_refresh_token,
};
use super::password::verify_password;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::kv::KeyValueStore;
use crate::models::auth::{AccessClaims, TokenPair};
use crate::models::user::UserRecord;
use crate::users::UserStore;

const REFRESH_KEY_PREFIX: &str = "refresh_token:";

/// Liveness key for a refresh token. The raw token never reaches the store.
pub fn refresh_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{REFRESH_KEY_PREFIX}{hex}")
}

pub struct TokenService {
    users: Arc<dyn UserStore>,
    kv: Arc<dyn KeyValueStore>,
    keys: TokenKeys,
}

impl TokenService {
    pub fn new(users: Arc<dyn UserStore>, kv: Arc<dyn KeyValueStore>, keys: TokenKeys) -> Self {
        Self { users, kv, keys }
    }

    /// Mint an access/refresh pair and record the refresh token as live.
    pub async fn issue_tokens(&self, user_id: Uuid, username: &str) -> ServiceResult<TokenPair> {
        let access_token = generate_access_token(user_id, username, &self.keys)?;
        let refresh_token = generate_refresh_token(user_id, &self.keys)?;

        self.kv
            .set(
                &refresh_key(&refresh_token),
                &user_id.to_string(),
                Duration::from_secs(REFRESH_TOKEN_EXPIRY_SECS as u64),
            )
            .await
            .map_err(|e| {
                error!(error = %e, %user_id, "failed to record refresh token");
                ServiceError::Internal("could not persist refresh token".into())
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<TokenPair> {
        let user = match self.users.find_by_username(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                debug!(username, "login for unknown user");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(ServiceError::from_store("user", e)),
        };

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let pair = self.issue_tokens(user.id, &user.username).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(pair)
    }

    /// Check an access token. Pure signature and expiry check, no I/O.
    pub fn verify_access(&self, token: &str) -> ServiceResult<AccessClaims> {
        verify_access_token(token, &self.keys).ok_or(ServiceError::Unauthorized)
    }

    /// Redeem a refresh token for a fresh pair. The presented token is spent
    /// whether or not the rest of the exchange succeeds.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        if verify_refresh_token(refresh_token, &self.keys).is_none() {
            return Err(ServiceError::InvalidRefreshToken);
        }

        let stored = self
            .kv
            .take(&refresh_key(refresh_token))
            .await
            .map_err(|e| {
                error!(error = %e, "refresh token lookup failed");
                ServiceError::Internal("refresh token store unavailable".into())
            })?
            .ok_or_else(|| {
                warn!("refresh token already used or revoked");
                ServiceError::InvalidRefreshToken
            })?;

        let user = self.owner(&stored).await?;
        let pair = self.issue_tokens(user.id, &user.username).await?;
        debug!(user_id = %user.id, "refresh token rotated");
        Ok(pair)
    }

    /// Revoke a refresh token. Returns whether it was still live.
    pub async fn revoke(&self, refresh_token: &str) -> ServiceResult<bool> {
        let removed = self
            .kv
            .delete(&refresh_key(refresh_token))
            .await
            .map_err(|e| ServiceError::Internal(format!("refresh token store: {e}")))?;
        if removed {
            info!("refresh token revoked");
        }
        Ok(removed)
    }

    async fn owner(&self, stored_id: &str) -> ServiceResult<UserRecord> {
        let id = Uuid::parse_str(stored_id).map_err(|_| ServiceError::InvalidRefreshToken)?;
        match self.users.find_by_id(id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(ServiceError::InvalidRefreshToken),
            Err(e) => Err(ServiceError::from_store("user", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::auth::password::hash_password;
    use crate::kv::MemoryStore;
    use crate::models::user::NewUser;
    use crate::testing::MemoryUserStore;

    struct Fixture {
        tokens: Arc<TokenService>,
        users: Arc<MemoryUserStore>,
        kv: Arc<MemoryStore>,
        alice: Uuid,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let alice = users
            .create(NewUser {
                username: "alice".into(),
                name: Some("Alice".into()),
                password_hash: hash_password("pw1234567").unwrap(),
            })
            .await
            .unwrap()
            .id;
        let kv = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenService::new(
            users.clone(),
            kv.clone(),
            TokenKeys::new(b"access-secret", b"refresh-secret"),
        ));
        Fixture {
            tokens,
            users,
            kv,
            alice,
        }
    }

    #[tokio::test]
    async fn login_issues_verifiable_access_token() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();
        let claims = f.tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.user_id, f.alice);
        assert_eq!(claims.username, "alice");
        assert_eq!(f.kv.len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let f = fixture().await;
        let unknown = f.tokens.login("nobody", "pw1234567").await.unwrap_err();
        let wrong = f.tokens.login("alice", "not-the-password").await.unwrap_err();
        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();

        let rotated = f.tokens.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        let claims = f.tokens.verify_access(&rotated.access_token).unwrap();
        assert_eq!(claims.user_id, f.alice);

        let err = f.tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRefreshToken));

        f.tokens.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refresh_has_one_winner() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();

        let (a, b) = tokio::join!(
            f.tokens.refresh(&pair.refresh_token),
            f.tokens.refresh(&pair.refresh_token)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(ServiceError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();
        let err = f.tokens.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRefreshToken));
        assert!(f.tokens.verify_access(&pair.refresh_token).is_err());
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_fails() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();
        f.users.delete(f.alice).await.unwrap();
        let err = f.tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn revoked_token_cannot_refresh() {
        let f = fixture().await;
        let pair = f.tokens.login("alice", "pw1234567").await.unwrap();
        assert!(f.tokens.revoke(&pair.refresh_token).await.unwrap());
        assert!(!f.tokens.revoke(&pair.refresh_token).await.unwrap());
        let err = f.tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRefreshToken));
    }

    #[test]
    fn refresh_key_hides_token() {
        let key = refresh_key("abc.def.ghi");
        assert!(key.starts_with(REFRESH_KEY_PREFIX));
        assert!(!key.contains("abc"));
        assert_eq!(key.len(), REFRESH_KEY_PREFIX.len() + 64);
    }

    /// In-memory store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyWrites {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for FlakyWrites {
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::KeyValue("write refused".into()));
            }
            self.inner.set(key, value, ttl).await
        }
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }
        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(key).await
        }
        async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.take(key).await
        }
        async fn delete_matching(&self, pattern: &str) -> Result<u64, StoreError> {
            self.inner.delete_matching(pattern).await
        }
    }

    #[tokio::test]
    async fn failed_rotation_still_spends_token() {
        let users = Arc::new(MemoryUserStore::new());
        users
            .create(NewUser {
                username: "alice".into(),
                name: None,
                password_hash: hash_password("pw1234567").unwrap(),
            })
            .await
            .unwrap();
        let kv = Arc::new(FlakyWrites::default());
        let tokens = TokenService::new(
            users,
            kv.clone(),
            TokenKeys::new(b"access-secret", b"refresh-secret"),
        );
        let pair = tokens.login("alice", "pw1234567").await.unwrap();

        kv.fail_writes.store(true, Ordering::SeqCst);
        let err = tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        kv.fail_writes.store(false, Ordering::SeqCst);
        let err = tokens.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRefreshToken));
    }
}
