/*
 * Responsibility
 * - middleware の公開インターフェース
 * - pipeline: 設定された順序で interceptor (audit / auth) を組み立てる
 * - http: request-id / body limit / timeout / panic → 500 など transport 寄りの層
 */
pub mod audit;
pub mod auth;
pub mod capture;
pub mod http;
pub mod pipeline;
