//! Credential store port, its PostgreSQL adapter, and the user service.

mod queries;
pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::user::{NewUser, UserRecord};

pub use self::queries::PgUserStore;
pub use self::service::UserService;

/// Persistence contract for user records.
///
/// Lookups return [`StoreError::NotFound`] when no row matches and
/// [`StoreError::Conflict`] when a username is already taken.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError>;
    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError>;
    /// Persist username, name and password hash of `user`; bumps `updated_at`.
    async fn update(&self, user: &UserRecord) -> Result<UserRecord, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
