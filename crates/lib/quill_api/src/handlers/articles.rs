//! Article request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use quill_core::models::article::{ArticlePatch, ListArticlesParams};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ArticlePageResponse, ArticleResponse, CreateArticleRequest, ListArticlesQuery,
    UpdateArticleRequest,
};

/// `GET /articles?query=&author=&page=&limit=`
pub async fn list_articles_handler(
    State(state): State<AppState>,
    Query(q): Query<ListArticlesQuery>,
) -> AppResult<Json<ArticlePageResponse>> {
    let (page, limit) = (q.page(), q.limit());
    let params = ListArticlesParams::paged(q.query, q.author, page, limit);
    let page = state.articles.list_articles(&params).await?;
    Ok(Json(page.into()))
}

/// `GET /articles/{id}`: served from the cache when possible.
pub async fn get_article_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArticleResponse>> {
    let article = state.articles.get_article(id).await?;
    Ok(Json(article.into()))
}

/// `POST /articles`: the caller becomes the author.
pub async fn create_article_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<CreateArticleRequest>,
) -> AppResult<(StatusCode, Json<ArticleResponse>)> {
    let article = state
        .articles
        .create_article(user.0.user_id, &body.title, &body.body)
        .await?;
    Ok((StatusCode::CREATED, Json(article.into())))
}

/// `PUT /articles/{id}`: author only.
pub async fn update_article_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateArticleRequest>,
) -> AppResult<Json<ArticleResponse>> {
    let patch = ArticlePatch {
        title: body.title,
        body: body.body,
    };
    let article = state
        .articles
        .update_article(user.0.user_id, id, patch)
        .await?;
    Ok(Json(article.into()))
}

/// `DELETE /articles/{id}`: author only.
pub async fn delete_article_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.articles.delete_article(user.0.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
