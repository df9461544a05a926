/*
 * Responsibility
 * - handler / middleware から使う domain 寄りの service 群
 */
pub mod auth;
