/*
 * Responsibility
 * - /users 系 CRUD handler (pipeline の terminal stage)
 * - Path/Json を extractor で受け、DTO validation → repo 呼び出し
 * - 認証は middleware 側で済んでいる前提 (AuthCtx は監査ログ用)
 */
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    api::v1::{
        dto::users::{UserRequest, UserResponse},
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    state::AppState,
};

const RESOURCE: &str = "User";

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let rows = state.users.list().await?;
    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserResponse>, AppError> {
    let row = state
        .users
        .get(user_id)
        .await?
        .ok_or(AppError::not_found(RESOURCE))?;

    Ok(Json(row.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Json(req): Json<UserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate().map_err(AppError::bad_request)?;

    let row = state.users.insert(&req.name, &req.email).await?;
    tracing::info!(user_id = row.id, actor = ?ctx.subject, "user created");

    let location = format!("/users/{}", row.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(UserResponse::from(row)),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(user_id): Path<u64>,
    Json(req): Json<UserRequest>,
) -> Result<StatusCode, AppError> {
    // Validation runs before the lookup: a bad body on a missing id is a 400.
    req.validate().map_err(AppError::bad_request)?;

    state
        .users
        .update(user_id, &req.name, &req.email)
        .await?
        .ok_or(AppError::not_found(RESOURCE))?;
    tracing::info!(user_id, actor = ?ctx.subject, "user updated");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(user_id): Path<u64>,
) -> Result<StatusCode, AppError> {
    if !state.users.delete(user_id).await? {
        return Err(AppError::not_found(RESOURCE));
    }
    tracing::info!(user_id, actor = ?ctx.subject, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}
