//! Read-through cache of hydrated articles.
//!
//! Entries live under `article:{id}` for [`ARTICLE_CACHE_TTL`]. A hit is
//! trusted without checking the store, so reads may be stale until the TTL
//! runs out or a mutation clears the whole `article:*` namespace.
//!
//! Clearing the namespace rather than one key keeps author views consistent
//! too: a user rename changes every article they wrote.
//!
//! A read that loaded before a mutation must not write its result back after
//! the invalidation. Each invalidation bumps a generation counter and a
//! load only writes back if the counter is unchanged. The counter is per
//! process, so with a shared Redis a reader on another instance can still
//! store a pre-update value; it then lives for at most one TTL.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::kv::KeyValueStore;
use crate::models::article::Article;

/// Lifetime of a cached article.
pub const ARTICLE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const KEY_PREFIX: &str = "article:";
const KEY_PATTERN: &str = "article:*";

#[derive(Clone)]
pub struct ArticleCache {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
    /// Bumped by every invalidation. Shared by clones.
    generation: Arc<AtomicU64>,
}

impl ArticleCache {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            ttl: ARTICLE_CACHE_TTL,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the entry lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(id: Uuid) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Return the cached article or fall through to `load`.
    ///
    /// Cache failures and undecodable entries count as misses. A successful
    /// load is written back unless an invalidation started while it ran; a
    /// failed write-back is logged and ignored.
    ///
    /// There is still a narrow window between that check and the write in
    /// which an invalidation can land first, leaving the stale entry for one
    /// TTL.
    pub async fn get_or_load<F, Fut>(&self, id: Uuid, load: F) -> Result<Article, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Article, StoreError>>,
    {
        let key = Self::key(id);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Article>(&raw) {
                Ok(article) => {
                    debug!(%id, "article cache hit");
                    return Ok(article);
                }
                Err(e) => warn!(%id, error = %e, "undecodable article cache entry"),
            },
            Ok(None) => debug!(%id, "article cache miss"),
            Err(e) => warn!(%id, error = %e, "article cache read failed"),
        }

        let generation = self.generation.load(Ordering::Acquire);
        let article = load().await?;
        if self.generation.load(Ordering::Acquire) == generation {
            self.put(&key, &article).await;
        } else {
            debug!(%id, "skipping write-back, cache invalidated during load");
        }
        Ok(article)
    }

    async fn put(&self, key: &str, article: &Article) {
        let raw = match serde_json::to_string(article) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "article cache encode failed");
                return;
            }
        };
        if let Err(e) = self.kv.set(key, &raw, self.ttl).await {
            warn!(key, error = %e, "article cache write failed");
        }
    }

    /// Drop every cached article.
    ///
    /// Runs after the mutation has committed, so a failure is logged rather
    /// than returned; affected entries then age out with the TTL.
    pub async fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match self.kv.delete_matching(KEY_PATTERN).await {
            Ok(n) => debug!(removed = n, "article cache invalidated"),
            Err(e) => error!(error = %e, "article cache invalidation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::kv::MemoryStore;

    fn article(id: Uuid, title: &str) -> Article {
        Article {
            id,
            title: title.into(),
            body: "body".into(),
            author_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author: None,
        }
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ArticleCache::new(kv.clone());
        let id = Uuid::new_v4();
        let loads = AtomicU32::new(0);

        for _ in 0..2 {
            let got = cache
                .get_or_load(id, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(article(id, "first"))
                })
                .await
                .unwrap();
            assert_eq!(got.title, "first");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(kv.get(&ArticleCache::key(id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_entry_falls_through_and_is_replaced() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ArticleCache::new(kv.clone());
        let id = Uuid::new_v4();
        kv.set(&ArticleCache::key(id), "{not json", ARTICLE_CACHE_TTL)
            .await
            .unwrap();

        let got = cache
            .get_or_load(id, || async { Ok(article(id, "fresh")) })
            .await
            .unwrap();
        assert_eq!(got.title, "fresh");
        let raw = kv.get(&ArticleCache::key(id)).await.unwrap().unwrap();
        assert!(raw.contains("fresh"));
    }

    #[tokio::test]
    async fn not_found_is_not_cached() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ArticleCache::new(kv.clone());
        let id = Uuid::new_v4();
        let err = cache
            .get_or_load(id, || async { Err(StoreError::NotFound) })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_article() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ArticleCache::new(kv.clone());
        for _ in 0..3 {
            let id = Uuid::new_v4();
            cache
                .get_or_load(id, || async { Ok(article(id, "t")) })
                .await
                .unwrap();
        }
        kv.set("refresh_token:x", "u", ARTICLE_CACHE_TTL).await.unwrap();
        cache.invalidate_all().await;
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test]
    async fn load_racing_an_invalidation_is_not_cached() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ArticleCache::new(kv.clone());
        let id = Uuid::new_v4();

        let got = cache
            .get_or_load(id, || async {
                // A writer commits and invalidates while this read is loading.
                cache.invalidate_all().await;
                Ok(article(id, "pre-update"))
            })
            .await
            .unwrap();
        assert_eq!(got.title, "pre-update");
        assert!(kv.get(&ArticleCache::key(id)).await.unwrap().is_none());

        // Later reads cache normally again.
        cache
            .get_or_load(id, || async { Ok(article(id, "post-update")) })
            .await
            .unwrap();
        assert!(kv.get(&ArticleCache::key(id)).await.unwrap().is_some());
    }

    /// Store whose every call fails.
    struct DownStore;

    #[async_trait]
    impl KeyValueStore for DownStore {
        async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::KeyValue("down".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::KeyValue("down".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::KeyValue("down".into()))
        }
        async fn take(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::KeyValue("down".into()))
        }
        async fn delete_matching(&self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::KeyValue("down".into()))
        }
    }

    #[tokio::test]
    async fn unavailable_cache_does_not_fail_reads() {
        let cache = ArticleCache::new(Arc::new(DownStore));
        let id = Uuid::new_v4();
        let got = cache
            .get_or_load(id, || async { Ok(article(id, "from store")) })
            .await
            .unwrap();
        assert_eq!(got.title, "from store");
        cache.invalidate_all().await;
    }
}
