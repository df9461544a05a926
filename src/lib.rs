//! Users API: an in-memory `/users` resource behind an ordered interceptor
//! pipeline (audit logging → bearer authentication → handlers).

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
