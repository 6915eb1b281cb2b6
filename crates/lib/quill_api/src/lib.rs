//! # quill_api
//!
//! HTTP API library for Quill.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use quill_core::articles::{ArticleCache, ArticleService, ArticleStore};
use quill_core::auth::{TokenKeys, TokenService};
use quill_core::kv::KeyValueStore;
use quill_core::users::{UserService, UserStore};

use crate::config::ApiConfig;
use crate::handlers::{articles, auth, health, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub articles: Arc<ArticleService>,
    pub tokens: Arc<TokenService>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the services over the given stores.
    ///
    /// `kv` holds both refresh-token liveness entries and cached articles.
    pub fn new(
        user_store: Arc<dyn UserStore>,
        article_store: Arc<dyn ArticleStore>,
        kv: Arc<dyn KeyValueStore>,
        config: ApiConfig,
    ) -> Self {
        let cache = ArticleCache::new(kv.clone());
        let keys = TokenKeys::new(
            config.jwt_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
        );
        Self {
            users: Arc::new(UserService::new(user_store.clone(), cache.clone())),
            articles: Arc::new(ArticleService::new(article_store, cache)),
            tokens: Arc::new(TokenService::new(user_store, kv, keys)),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `quill_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    quill_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = TimeoutLayer::new(state.config.request_timeout);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::USERS,
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(routes::USERS_ID, get(users::get_user_handler))
        .route(routes::ARTICLES, get(articles::list_articles_handler))
        .route(routes::ARTICLES_ID, get(articles::get_article_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            routes::USERS_ID,
            axum::routing::put(users::update_user_handler).delete(users::delete_user_handler),
        )
        .route(routes::ARTICLES, post(articles::create_article_handler))
        .route(
            routes::ARTICLES_ID,
            axum::routing::put(articles::update_article_handler)
                .delete(articles::delete_article_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(timeout)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
