//! In-memory store doubles for service and HTTP tests.
//!
//! They follow the PostgreSQL adapters' contracts: unique usernames,
//! inner-join hydration of the author view, newest-first listing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::articles::ArticleStore;
use crate::error::StoreError;
use crate::models::article::{Article, AuthorView, ListArticlesParams, NewArticle};
use crate::models::user::{NewUser, UserRecord};
use crate::users::UserStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user whose password can never match.
    pub async fn insert_user(&self, username: &str, name: Option<&str>) -> UserRecord {
        self.create(NewUser {
            username: username.to_string(),
            name: name.map(str::to_string),
            password_hash: "!".to_string(),
        })
        .await
        .expect("username is free")
    }

    fn author_view(&self, id: Uuid) -> Option<AuthorView> {
        lock(&self.users).get(&id).map(|u| AuthorView {
            id: u.id,
            username: u.username.clone(),
            name: u.name.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username already exists".into()));
        }
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        lock(&self.users).get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        lock(&self.users)
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut all: Vec<UserRecord> = lock(&self.users).values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let mut users = lock(&self.users);
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Conflict("username already exists".into()));
        }
        let existing = users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        existing.username = user.username.clone();
        existing.name = user.name.clone();
        existing.password_hash = user.password_hash.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        lock(&self.users)
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Debug)]
pub struct MemoryArticleStore {
    users: Arc<MemoryUserStore>,
    articles: Mutex<Vec<Article>>,
}

impl MemoryArticleStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            users,
            articles: Mutex::new(Vec::new()),
        }
    }

    /// Attach the author view; articles whose author is gone drop out.
    fn hydrate(&self, mut article: Article) -> Option<Article> {
        article.author = Some(self.users.author_view(article.author_id)?);
        Some(article)
    }

    fn matching(&self, params: &ListArticlesParams) -> Vec<Article> {
        let terms: Vec<String> = params
            .query
            .as_deref()
            .map(|q| q.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();
        let mut found: Vec<Article> = lock(&self.articles)
            .iter()
            .cloned()
            .filter_map(|a| self.hydrate(a))
            .filter(|a| match &params.author {
                Some(author) => a
                    .author
                    .as_ref()
                    .and_then(|v| v.name.as_deref())
                    .is_some_and(|name| name.eq_ignore_ascii_case(author)),
                None => true,
            })
            .filter(|a| {
                let text = format!("{} {}", a.title, a.body).to_lowercase();
                terms.iter().all(|t| text.contains(t.as_str()))
            })
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create(&self, article: NewArticle) -> Result<Article, StoreError> {
        let now = Utc::now();
        let stored = Article {
            id: article.id,
            title: article.title,
            body: article.body,
            author_id: article.author_id,
            created_at: now,
            updated_at: now,
            author: None,
        };
        // Foreign key on author_id.
        let hydrated = self
            .hydrate(stored.clone())
            .ok_or_else(|| StoreError::Conflict("referenced record does not exist".into()))?;
        lock(&self.articles).push(stored);
        Ok(hydrated)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Article, StoreError> {
        let found = lock(&self.articles).iter().find(|a| a.id == id).cloned();
        found
            .and_then(|a| self.hydrate(a))
            .ok_or(StoreError::NotFound)
    }

    async fn find_page(&self, params: &ListArticlesParams) -> Result<Vec<Article>, StoreError> {
        Ok(self
            .matching(params)
            .into_iter()
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, params: &ListArticlesParams) -> Result<i64, StoreError> {
        Ok(self.matching(params).len() as i64)
    }

    async fn update(&self, article: &Article) -> Result<Article, StoreError> {
        let updated = {
            let mut articles = lock(&self.articles);
            let existing = articles
                .iter_mut()
                .find(|a| a.id == article.id)
                .ok_or(StoreError::NotFound)?;
            existing.title = article.title.clone();
            existing.body = article.body.clone();
            existing.updated_at = Utc::now();
            existing.clone()
        };
        self.hydrate(updated).ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut articles = lock(&self.articles);
        let before = articles.len();
        articles.retain(|a| a.id != id);
        if articles.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
