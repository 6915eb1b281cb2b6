//! Ownership checks gating mutations.
//!
//! Decisions use the immutable user id from verified access claims, never the
//! username embedded alongside it.

use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::article::Article;

/// The acting user may only modify their own account.
pub fn ensure_self(actor: Uuid, target_user_id: Uuid) -> Result<(), ServiceError> {
    if actor == target_user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// The acting user may only modify articles they wrote.
///
/// `article` must be a fresh read from the store, taken before the write.
pub fn ensure_author(actor: Uuid, article: &Article) -> Result<(), ServiceError> {
    if actor == article.author_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article_by(author_id: Uuid) -> Article {
        Article {
            id: Uuid::new_v4(),
            title: "t".into(),
            body: "b".into(),
            author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author: None,
        }
    }

    #[test]
    fn self_check() {
        let me = Uuid::new_v4();
        assert!(ensure_self(me, me).is_ok());
        assert!(matches!(
            ensure_self(me, Uuid::new_v4()),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn author_check() {
        let me = Uuid::new_v4();
        assert!(ensure_author(me, &article_by(me)).is_ok());
        assert!(matches!(
            ensure_author(Uuid::new_v4(), &article_by(me)),
            Err(ServiceError::Forbidden)
        ));
    }
}
