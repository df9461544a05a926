/*
 * Responsibility
 * - v1 の URL 構造を定義 (/users)
 * - 認証や監査ログは routes ではなく middleware::pipeline で掛ける
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::users::{create_user, delete_user, get_user, list_users, update_user};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
