//! Error kinds shared by the stores and the services built on top of them.

use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors raised by the persistence and key-value adapters.
///
/// `NotFound` and `Conflict` are domain signals; everything else is a
/// transport or storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("key-value store error: {0}")]
    KeyValue(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db)
                if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) =>
            {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(ref db)
                if db.code().as_deref() == Some(PG_FOREIGN_KEY_VIOLATION) =>
            {
                StoreError::Conflict("referenced record does not exist".into())
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::KeyValue(e.to_string())
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        StoreError::KeyValue(format!("pool: {e}"))
    }
}

/// Closed set of failure kinds surfaced by the services.
///
/// Callers map these by variant, never by message text.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired access token")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Translate a store error, naming the entity for not-found signals.
    pub fn from_store(entity: &str, e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServiceError::NotFound(entity.to_string()),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Internal(format!("{entity} store: {other}")),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::from_store("record", e)
    }
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let e = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(e, StoreError::NotFound));
    }

    #[test]
    fn store_not_found_names_entity() {
        let e = ServiceError::from_store("article", StoreError::NotFound);
        assert!(matches!(e, ServiceError::NotFound(ref s) if s == "article"));
        assert_eq!(e.to_string(), "article not found");
    }

    #[test]
    fn transport_errors_become_internal() {
        let e = ServiceError::from_store("user", StoreError::KeyValue("down".into()));
        match e {
            ServiceError::Internal(msg) => assert!(msg.contains("user store")),
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[test]
    fn conflict_is_preserved() {
        let e: ServiceError = StoreError::Conflict("username taken".into()).into();
        assert!(matches!(e, ServiceError::Conflict(_)));
    }
}
