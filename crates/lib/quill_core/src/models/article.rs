//! Article domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized author data attached to an article on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully hydrated article, as served and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<AuthorView>,
}

/// Flat row shape of the `articles JOIN users` projection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_name: Option<String>,
    pub author_created_at: DateTime<Utc>,
    pub author_updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            title: row.title,
            body: row.body,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: Some(AuthorView {
                id: row.author_id,
                username: row.author_username,
                name: row.author_name,
                created_at: row.author_created_at,
                updated_at: row.author_updated_at,
            }),
        }
    }
}

/// Values needed to insert an article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
}

/// Partial article update. `None` and empty strings leave the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Filters and offset window for a listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArticlesParams {
    /// Free-text search over title and body.
    pub query: Option<String>,
    /// Case-insensitive match on the author's display name.
    pub author: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListArticlesParams {
    /// Build the offset window from 1-based `page` and `limit`.
    ///
    /// Missing or non-positive values fall back to page 1 and
    /// [`DEFAULT_PAGE_SIZE`]; `limit` is capped at [`MAX_PAGE_SIZE`].
    pub fn paged(
        query: Option<String>,
        author: Option<String>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        let page = match page {
            Some(p) if p > 0 => p,
            _ => 1,
        };
        Self {
            query: query.filter(|q| !q.trim().is_empty()),
            author: author.filter(|a| !a.trim().is_empty()),
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticlePage {
    pub data: Vec<Article>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl ArticlePage {
    /// Assemble a page, deriving `page` and `total_pages` from the offset window.
    pub fn new(data: Vec<Article>, total: i64, params: &ListArticlesParams) -> Self {
        let limit = params.limit;
        let total_pages = if total > 0 && limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        let page = if limit > 0 { params.offset / limit + 1 } else { 1 };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: i64, offset: i64) -> ListArticlesParams {
        ListArticlesParams {
            limit,
            offset,
            ..Default::default()
        }
    }

    #[test]
    fn paged_defaults() {
        let p = ListArticlesParams::paged(None, None, None, None);
        assert_eq!(p.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset, 0);

        let p = ListArticlesParams::paged(None, None, Some(0), Some(-5));
        assert_eq!(p.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn paged_offset_and_cap() {
        let p = ListArticlesParams::paged(None, None, Some(3), Some(20));
        assert_eq!(p.offset, 40);
        let p = ListArticlesParams::paged(None, None, Some(1), Some(1000));
        assert_eq!(p.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn blank_filters_are_dropped() {
        let p = ListArticlesParams::paged(Some("  ".into()), Some(String::new()), None, None);
        assert!(p.query.is_none());
        assert!(p.author.is_none());
    }

    #[test]
    fn page_math_rounds_total_pages_up() {
        let page = ArticlePage::new(Vec::new(), 21, &params(10, 20));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page = ArticlePage::new(Vec::new(), 0, &params(10, 0));
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        let page = ArticlePage::new(Vec::new(), 30, &params(10, 10));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
    }
}
