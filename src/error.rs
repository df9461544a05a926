/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / plain-text body)
 * - RepoError などを統一的に変換
 * - 500 は相関 ID だけをクライアントに返し、詳細はサーバーログにのみ出す
 */
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::repos::error::RepoError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or missing token.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{resource} not found.")]
    NotFound { resource: &'static str },
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal(error.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            AppError::Unauthorized => {
                let mut res = (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE).into_response();
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                res
            }
            AppError::Internal(err) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %format!("{err:#}"),
                    "unhandled failure"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal server error (ref: {correlation_id})"),
                )
                    .into_response()
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::internal(e)
    }
}
