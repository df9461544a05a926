/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (panic → 500 / pipeline (audit + bearer) / HTTP 層)
 * - axum::serve() で起動 (Ctrl-C / SIGTERM で graceful shutdown)
 */
use std::{panic, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};
use crate::middleware::{self, http::HttpSettings, pipeline::Stage};
use crate::repos::user_repo::InMemoryUserStore;
use crate::services::auth::build_token_validator;
use crate::{api, state::AppState};

fn init_tracing(format: LogFormat) {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,user_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn init_panic_hook() {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        // Handler panics are turned into 500s by `middleware::http::catch_panics`.
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    // .env must be loaded before tracing reads RUST_LOG / LOG_FORMAT.
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());
    init_panic_hook();

    let config = Config::from_env()?;

    tracing::info!(
        "starting API in {:?} mode on {} (auth: {:?})",
        config.app_env,
        config.addr,
        config.auth_mode
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config.pipeline_stages, &config.http);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // Build process-level services here and inject them into the shared application state.
    let tokens = build_token_validator(config)?;
    let users = Arc::new(InMemoryUserStore::new());

    Ok(AppState::new(users, tokens, config.audit))
}

/// Terminal routes wrapped, inside out, by the panic catcher, the configured
/// interceptor stages, and the HTTP layer.
pub fn build_router(state: AppState, stages: &[Stage], http: &HttpSettings) -> Router {
    let router = api::v1::routes();
    let router = middleware::http::catch_panics(router);
    let router = middleware::pipeline::apply(router, &state, stages);

    middleware::http::apply(router.with_state(state), http)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
