use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::state::AppState;

use super::AuthCtx;

/// Handler で `AuthCtx` (token の `sub` / `jti`) を受け取るための extractor
/// middleware::auth::access が検証後に extensions へ insert している前提
/// 見つからない場合は 401 (bearer 認証の stage を通っていない route)
pub struct AuthCtxExtractor(pub AuthCtx);

impl FromRequestParts<AppState> for AuthCtxExtractor {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<AuthCtx>().cloned().ok_or_else(|| {
            tracing::warn!("AuthCtx missing from request extensions");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthCtxExtractor(ctx))
    }
}
