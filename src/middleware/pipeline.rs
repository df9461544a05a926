//! Interceptor pipeline composition.
//!
//! Every interceptor is an axum `from_fn_with_state` middleware: it owns the
//! request, may answer on its own (short-circuit), or hands the request to
//! `Next::run` and post-processes the response. `Next::run` takes `self`, so
//! the rest of the chain runs at most once per request.
//!
//! The order is fixed when the router is built. The first stage in the list is
//! the outermost: with the default `[Logging, Authentication]`, the audit log
//! records every request, including the ones authentication rejects.

use std::fmt;
use std::str::FromStr;

use axum::Router;

use crate::config::ConfigError;
use crate::middleware::{audit, auth::access};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Logging,
    Authentication,
}

pub const DEFAULT_STAGES: [Stage; 2] = [Stage::Logging, Stage::Authentication];

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logging" => Ok(Stage::Logging),
            "authentication" | "auth" => Ok(Stage::Authentication),
            _ => Err(ConfigError::Invalid("PIPELINE_STAGES")),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Logging => f.write_str("logging"),
            Stage::Authentication => f.write_str("authentication"),
        }
    }
}

/// Parse a comma-separated stage list, outermost first.
///
/// Unknown or repeated stages are rejected, and authentication can not be
/// left out.
pub fn parse_stages(list: &str) -> Result<Vec<Stage>, ConfigError> {
    let mut stages = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let stage: Stage = name.parse()?;
        if stages.contains(&stage) {
            return Err(ConfigError::Invalid("PIPELINE_STAGES"));
        }
        stages.push(stage);
    }

    if !stages.contains(&Stage::Authentication) {
        return Err(ConfigError::Invalid("PIPELINE_STAGES"));
    }
    Ok(stages)
}

/// Wrap the terminal `router` in `stages`, outermost first.
pub fn apply(router: Router<AppState>, state: &AppState, stages: &[Stage]) -> Router<AppState> {
    tracing::debug!(
        stages = %stages.iter().map(Stage::to_string).collect::<Vec<_>>().join(" -> "),
        "composing request pipeline"
    );

    // A later `.layer()` wraps an earlier one, so install innermost first.
    stages.iter().rev().fold(router, |router, stage| match stage {
        Stage::Logging => audit::apply(router, state.clone()),
        Stage::Authentication => access::apply(router, state.clone()),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, Bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::middleware::audit::AuditPolicy;
    use crate::repos::user_repo::InMemoryUserStore;
    use crate::services::auth::TokenValidator;

    fn bearer() -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let exp = chrono::Utc::now().timestamp() + 300;
        let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
        format!("Bearer {header}.{payload}.")
    }

    fn echo_app(stages: &[Stage], policy: AuditPolicy) -> Router {
        let state = AppState::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(TokenValidator::unverified()),
            policy,
        );
        let terminal = Router::new().route("/echo", post(|body: Bytes| async move { body }));
        apply(terminal, &state, stages).with_state(state)
    }

    async fn echo(app: Router, body: Body) -> (StatusCode, Bytes) {
        let req = Request::post("/echo")
            .header(header::AUTHORIZATION, bearer())
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        (status, res.into_body().collect().await.unwrap().to_bytes())
    }

    #[test]
    fn parses_stage_lists() {
        assert_eq!(parse_stages("logging,authentication").unwrap(), DEFAULT_STAGES.to_vec());
        assert_eq!(
            parse_stages(" Auth , LOGGING ").unwrap(),
            vec![Stage::Authentication, Stage::Logging]
        );
        assert_eq!(parse_stages("authentication").unwrap(), vec![Stage::Authentication]);
    }

    #[test]
    fn unknown_stage_name_is_config_error() {
        assert_eq!("Logging".parse::<Stage>(), Ok(Stage::Logging));
        assert_eq!(
            "metrics".parse::<Stage>(),
            Err(ConfigError::Invalid("PIPELINE_STAGES"))
        );
    }

    #[test]
    fn rejects_bad_stage_lists() {
        for list in ["", "logging", "logging,metrics,authentication", "auth,authentication"] {
            assert_eq!(
                parse_stages(list),
                Err(ConfigError::Invalid("PIPELINE_STAGES")),
                "list {list:?}"
            );
        }
    }

    #[tokio::test]
    async fn bodies_are_identical_with_and_without_logging() {
        let payload = Bytes::from_static("{\"name\":\"Ada\",\"email\":\"ada@example.com\"}".as_bytes());

        let (plain_status, plain) = echo(
            echo_app(&[Stage::Authentication], AuditPolicy::default()),
            Body::from(payload.clone()),
        )
        .await;
        let (logged_status, logged) =
            echo(echo_app(&DEFAULT_STAGES, AuditPolicy::default()), Body::from(payload.clone())).await;

        assert_eq!(plain_status, StatusCode::OK);
        assert_eq!(logged_status, StatusCode::OK);
        assert_eq!(plain, payload);
        assert_eq!(logged, payload);
    }

    #[tokio::test]
    async fn large_bodies_pass_through_logging_unchanged() {
        let payload = Bytes::from(vec![b'x'; 10_000]);
        let policy = AuditPolicy {
            capture_max_bytes: 1024,
            log_max_body_bytes: 64,
        };

        let (status, body) = echo(echo_app(&DEFAULT_STAGES, policy), Body::from(payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn either_order_rejects_unauthenticated_requests() {
        for stages in [DEFAULT_STAGES.to_vec(), vec![Stage::Authentication, Stage::Logging]] {
            let res = echo_app(&stages, AuditPolicy::default())
                .oneshot(Request::post("/echo").body(Body::from("hi")).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn broken_body_without_token_is_still_unauthorized() {
        for stages in [vec![Stage::Authentication], DEFAULT_STAGES.to_vec()] {
            // Declares 3 bytes but carries 10: reading it fails.
            let body = Body::new(http_body_util::Limited::new(Body::from("0123456789"), 3));
            let res = echo_app(&stages, AuditPolicy::default())
                .oneshot(Request::post("/echo").body(body).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "stages {stages:?}");
        }
    }
}
