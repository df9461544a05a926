/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - 「見つからない」は Option / bool で返すので、ここには載せない
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("user id space exhausted")]
    IdSpaceExhausted,
}
