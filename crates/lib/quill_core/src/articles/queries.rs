//! Article queries against PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::ArticleStore;
use crate::error::StoreError;
use crate::models::article::{Article, ArticleRow, ListArticlesParams, NewArticle};

/// Hydrated projection; `a` may be the table or a CTE of it.
const HYDRATED_COLUMNS: &str = "a.id, a.title, a.body, a.author_id, a.created_at, a.updated_at, \
     u.username AS author_username, u.name AS author_name, \
     u.created_at AS author_created_at, u.updated_at AS author_updated_at";

/// [`ArticleStore`] backed by the `articles` table.
#[derive(Debug, Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the `WHERE` clause shared by the page and count queries.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &ListArticlesParams) {
    let mut sep = " WHERE ";
    if let Some(author) = &params.author {
        builder
            .push(sep)
            .push("LOWER(u.name) = LOWER(")
            .push_bind(author.clone())
            .push(")");
        sep = " AND ";
    }
    if let Some(query) = &params.query {
        builder
            .push(sep)
            .push("a.search_vector @@ plainto_tsquery('english', ")
            .push_bind(query.clone())
            .push(")");
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn create(&self, article: NewArticle) -> Result<Article, StoreError> {
        let sql = format!(
            "WITH a AS ( \
                 INSERT INTO articles (id, title, body, author_id) VALUES ($1, $2, $3, $4) \
                 RETURNING id, title, body, author_id, created_at, updated_at \
             ) \
             SELECT {HYDRATED_COLUMNS} FROM a JOIN users u ON a.author_id = u.id"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(article.id)
            .bind(&article.title)
            .bind(&article.body)
            .bind(article.author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Article, StoreError> {
        let sql = format!(
            "SELECT {HYDRATED_COLUMNS} FROM articles a JOIN users u ON a.author_id = u.id \
             WHERE a.id = $1"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Article::from)
            .ok_or(StoreError::NotFound)
    }

    async fn find_page(&self, params: &ListArticlesParams) -> Result<Vec<Article>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {HYDRATED_COLUMNS} FROM articles a JOIN users u ON a.author_id = u.id"
        ));
        push_filters(&mut builder, params);
        builder
            .push(" ORDER BY a.created_at DESC LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn count(&self, params: &ListArticlesParams) -> Result<i64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM articles a JOIN users u ON a.author_id = u.id",
        );
        push_filters(&mut builder, params);
        let total: i64 = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn update(&self, article: &Article) -> Result<Article, StoreError> {
        let sql = format!(
            "WITH a AS ( \
                 UPDATE articles SET title = $2, body = $3, updated_at = now() WHERE id = $1 \
                 RETURNING id, title, body, author_id, created_at, updated_at \
             ) \
             SELECT {HYDRATED_COLUMNS} FROM a JOIN users u ON a.author_id = u.id"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(article.id)
            .bind(&article.title)
            .bind(&article.body)
            .fetch_optional(&self.pool)
            .await?
            .map(Article::from)
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
