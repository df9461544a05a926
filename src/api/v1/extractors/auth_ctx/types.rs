/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - token の検証ロジックは middleware/services 側の責務
 * - ここは「型（契約）」として固定化する
 */
use crate::services::auth::TokenClaims;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `subject` は token の `sub` (無い token も受け付けるので Option)
/// - `jti` は監査/相関用
#[derive(Debug, Clone, Default)]
pub struct AuthCtx {
    pub subject: Option<String>,
    pub jti: Option<String>,
}

impl From<TokenClaims> for AuthCtx {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            jti: claims.jti,
        }
    }
}
