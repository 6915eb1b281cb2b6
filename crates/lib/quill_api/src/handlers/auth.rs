//! Authentication request handlers.

use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::Json;
use crate::models::{LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, TokenResponse};

/// `POST /auth/login`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state.tokens.login(&body.username, &body.password).await?;
    Ok(Json(pair.into()))
}

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
/// The presented token is spent.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state.tokens.refresh(&body.refresh_token).await?;
    Ok(Json(pair.into()))
}

/// `POST /auth/logout`: revoke a refresh token. Idempotent.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<LogoutResponse>> {
    state.tokens.revoke(&body.refresh_token).await?;
    Ok(Json(LogoutResponse { success: true }))
}
