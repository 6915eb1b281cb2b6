//! Article CRUD orchestration: validation, ownership, caching.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{ArticleCache, ArticleStore};
use crate::error::{ServiceError, ServiceResult};
use crate::models::article::{Article, ArticlePage, ArticlePatch, ListArticlesParams, NewArticle};
use crate::policy;

const ENTITY: &str = "article";

/// Longest accepted title, in characters.
const MAX_TITLE_CHARS: usize = 255;

pub struct ArticleService {
    articles: Arc<dyn ArticleStore>,
    cache: ArticleCache,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("Title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::Validation(format!(
            "Title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleStore>, cache: ArticleCache) -> Self {
        Self { articles, cache }
    }

    pub async fn create_article(
        &self,
        author_id: Uuid,
        title: &str,
        body: &str,
    ) -> ServiceResult<Article> {
        validate_title(title)?;
        if body.trim().is_empty() {
            return Err(ServiceError::Validation("Body cannot be empty".into()));
        }

        let article = self
            .articles
            .create(NewArticle {
                id: Uuid::now_v7(),
                title: title.to_string(),
                body: body.to_string(),
                author_id,
            })
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;

        self.cache.invalidate_all().await;
        info!(article_id = %article.id, %author_id, "article created");
        Ok(article)
    }

    /// Page and total are fetched concurrently; either failing fails the call.
    pub async fn list_articles(&self, params: &ListArticlesParams) -> ServiceResult<ArticlePage> {
        let (data, total) = tokio::try_join!(
            self.articles.find_page(params),
            self.articles.count(params)
        )
        .map_err(|e| ServiceError::from_store(ENTITY, e))?;
        Ok(ArticlePage::new(data, total, params))
    }

    pub async fn get_article(&self, id: Uuid) -> ServiceResult<Article> {
        self.cache
            .get_or_load(id, || self.articles.find_by_id(id))
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))
    }

    /// Fetch from the store (not the cache), check authorship, then write.
    pub async fn update_article(
        &self,
        actor: Uuid,
        id: Uuid,
        patch: ArticlePatch,
    ) -> ServiceResult<Article> {
        let mut article = self
            .articles
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;
        policy::ensure_author(actor, &article)?;

        if let Some(title) = non_empty(patch.title) {
            validate_title(&title)?;
            article.title = title;
        }
        if let Some(body) = non_empty(patch.body) {
            article.body = body;
        }

        let updated = self
            .articles
            .update(&article)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;

        self.cache.invalidate_all().await;
        info!(article_id = %id, "article updated");
        Ok(updated)
    }

    pub async fn delete_article(&self, actor: Uuid, id: Uuid) -> ServiceResult<()> {
        let article = self
            .articles
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;
        policy::ensure_author(actor, &article)?;

        self.articles
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_store(ENTITY, e))?;

        self.cache.invalidate_all().await;
        info!(article_id = %id, "article deleted");
        Ok(())
    }
}
