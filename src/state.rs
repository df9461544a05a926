/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - users: UserStore, tokens: TokenValidator, audit: AuditPolicy
 * - Clone 前提で持つ (内部は Arc/Copy で cheap)
 */
use std::sync::Arc;

use crate::middleware::audit::AuditPolicy;
use crate::repos::user_repo::UserStore;
use crate::services::auth::TokenValidator;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenValidator>,
    pub audit: AuditPolicy,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenValidator>, audit: AuditPolicy) -> Self {
        Self {
            users,
            tokens,
            audit,
        }
    }
}
