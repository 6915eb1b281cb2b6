//! User registration and self-service account management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::UserStore;
use crate::articles::ArticleCache;
use crate::auth::password::hash_password;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::models::user::{NewUser, User, UserPatch};
use crate::policy;

const ENTITY: &str = "user";

const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=50;
const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 8..=100;

fn validate_username(username: &str) -> ServiceResult<()> {
    let len = username.chars().count();
    if !USERNAME_CHARS.contains(&len) || username.chars().any(char::is_whitespace) {
        return Err(ServiceError::Validation(format!(
            "Username must be {}-{} characters without spaces",
            USERNAME_CHARS.start(),
            USERNAME_CHARS.end()
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if !PASSWORD_CHARS.contains(&password.chars().count()) {
        return Err(ServiceError::Validation(format!(
            "Password must be {}-{} characters",
            PASSWORD_CHARS.start(),
            PASSWORD_CHARS.end()
        )));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    /// Cached articles embed their author's profile.
    article_cache: ArticleCache,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, article_cache: ArticleCache) -> Self {
        Self {
            users,
            article_cache,
        }
    }

    /// Register a new account.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> ServiceResult<User> {
        validate_username(username)?;
        validate_password(password)?;

        match self.users.find_by_username(username).await {
            Ok(_) => return Err(ServiceError::Conflict("Username already taken".into())),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(ServiceError::from_store(ENTITY, e)),
        }

        let password_hash = hash_password(password)?;
        let record = self
            .users
            .create(NewUser {
                username: username.to_string(),
                name: name.filter(|n| !n.is_empty()).map(str::to_string),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::Conflict(_) => ServiceError::Conflict("Username already taken".into()),
                other => ServiceError::from_store(ENTITY, other),
            })?;

        info!(user_id = %record.id, username, "user registered");
        Ok(record.into_user())
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let records = self
            .users
            .find_all()
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;
        Ok(records.into_iter().map(User::from).collect())
    }

    pub async fn get_user(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(id)
            .await
            .map(User::from)
            .map_err(|e| ServiceError::from_store(ENTITY, e))
    }

    /// Partial update of the actor's own account.
    pub async fn update_user(&self, actor: Uuid, id: Uuid, patch: UserPatch) -> ServiceResult<User> {
        policy::ensure_self(actor, id)?;

        let mut record = self
            .users
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;

        if let Some(username) = non_empty(patch.username) {
            validate_username(&username)?;
            record.username = username;
        }
        if let Some(name) = non_empty(patch.name) {
            record.name = Some(name);
        }
        if let Some(password) = non_empty(patch.password) {
            validate_password(&password)?;
            record.password_hash = hash_password(&password)?;
        }

        let updated = self.users.update(&record).await.map_err(|e| match e {
            StoreError::Conflict(_) => ServiceError::Conflict("Username already taken".into()),
            other => ServiceError::from_store(ENTITY, other),
        })?;

        self.article_cache.invalidate_all().await;
        info!(user_id = %id, "user updated");
        Ok(updated.into_user())
    }

    /// Delete the actor's own account. Their articles go with it.
    pub async fn delete_user(&self, actor: Uuid, id: Uuid) -> ServiceResult<()> {
        policy::ensure_self(actor, id)?;
        self.users
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;
        self.article_cache.invalidate_all().await;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::kv::MemoryStore;
    use crate::testing::MemoryUserStore;

    fn service() -> (UserService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let cache = ArticleCache::new(Arc::new(MemoryStore::new()));
        (UserService::new(store.clone(), cache), store)
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let (svc, store) = service();
        let user = svc.create_user("alice", "pw1234567", Some("Alice")).await.unwrap();
        assert_eq!(user.username, "alice");
        let record = store.find_by_id(user.id).await.unwrap();
        assert_ne!(record.password_hash, "pw1234567");
        assert!(verify_password("pw1234567", &record.password_hash));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (svc, _) = service();
        svc.create_user("alice", "pw1234567", None).await.unwrap();
        let err = svc.create_user("alice", "other-pass", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (svc, _) = service();
        for (username, password) in [("al", "pw1234567"), ("alice", "short"), ("a b c", "pw1234567")] {
            let err = svc.create_user(username, password, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{username}/{password}");
        }
    }

    #[tokio::test]
    async fn only_owner_may_update() {
        let (svc, _) = service();
        let alice = svc.create_user("alice", "pw1234567", None).await.unwrap();
        let bob = svc.create_user("bobby", "pw1234567", None).await.unwrap();

        let patch = UserPatch {
            name: Some("Mallory".into()),
            ..Default::default()
        };
        let err = svc.update_user(bob.id, alice.id, patch.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        let updated = svc.update_user(alice.id, alice.id, patch).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("Mallory"));
        assert_eq!(updated.username, "alice");
    }

    #[tokio::test]
    async fn rename_onto_taken_username_conflicts() {
        let (svc, _) = service();
        let alice = svc.create_user("alice", "pw1234567", None).await.unwrap();
        svc.create_user("bobby", "pw1234567", None).await.unwrap();
        let err = svc
            .update_user(
                alice.id,
                alice.id,
                UserPatch {
                    username: Some("bobby".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn only_owner_may_delete() {
        let (svc, _) = service();
        let alice = svc.create_user("alice", "pw1234567", None).await.unwrap();
        let bob = svc.create_user("bobby", "pw1234567", None).await.unwrap();

        let err = svc.delete_user(bob.id, alice.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        svc.delete_user(alice.id, alice.id).await.unwrap();
        let err = svc.get_user(alice.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
