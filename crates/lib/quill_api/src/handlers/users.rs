//! User account request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use quill_core::models::user::UserPatch;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserRequest, UpdateUserRequest, UserResponse};

/// `POST /users`: register a new account.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .users
        .create_user(&body.username, &body.password, body.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// `GET /users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.get_user(id).await?;
    Ok(Json(user.into()))
}

/// `PUT /users/{id}`: owner only.
pub async fn update_user_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let patch = UserPatch {
        username: body.username,
        name: body.name,
        password: body.password,
    };
    let updated = state.users.update_user(user.0.user_id, id, patch).await?;
    Ok(Json(updated.into()))
}

/// `DELETE /users/{id}`: owner only. Removes the user's articles too.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.users.delete_user(user.0.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
