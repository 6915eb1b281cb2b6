//! Article store port, its PostgreSQL adapter, the read-through cache and
//! the article service.

pub mod cache;
mod queries;
pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::article::{Article, ListArticlesParams, NewArticle};

pub use self::cache::ArticleCache;
pub use self::queries::PgArticleStore;
pub use self::service::ArticleService;

/// Persistence contract for articles. Reads return hydrated articles with
/// the author view attached.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create(&self, article: NewArticle) -> Result<Article, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Article, StoreError>;
    /// One window of the filtered listing, newest first.
    async fn find_page(&self, params: &ListArticlesParams) -> Result<Vec<Article>, StoreError>;
    /// Total rows matching the listing filters, ignoring the window.
    async fn count(&self, params: &ListArticlesParams) -> Result<i64, StoreError>;
    /// Persist title and body of `article`; bumps `updated_at`.
    async fn update(&self, article: &Article) -> Result<Article, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
