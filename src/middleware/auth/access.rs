//! Bearer token 検証 → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <token>` を取り出し、`TokenValidator` で検証する。
//! - ヘッダ欠落 / 形式不正 / 検証失敗はすべて 401 (固定 body) で打ち切り、後続は呼ばない。
//! - 成功時は `AuthCtx` を extensions に載せ、後続の response をそのまま返す。
//! - 認証失敗はリトライしない (クライアントが正しい token で再送する)。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

/// Install bearer authentication on every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::warn!("missing or malformed bearer credential");
        AppError::Unauthorized
    })?;

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "access token verification failed");
            return Err(AppError::Unauthorized);
        }
    };

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::from(claims));

    Ok(next.run(req).await)
}

/// `Bearer <token>` only: scheme is case-insensitive, token must be a single non-empty word.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
