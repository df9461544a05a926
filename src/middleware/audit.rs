//! Request/response audit logging.
//!
//! Emits exactly one `http request` and one `http response` event per request,
//! bodies included. Bodies are captured through [`super::capture`], so what the
//! handler reads and what the client receives are the same bytes that would
//! flow without this layer.
//!
//! Capture problems only degrade the record (metadata without body); they never
//! fail the business request. A request body stream that breaks while being
//! read is handed on as the frames already read followed by the same error, so
//! the next stage decides what to answer, exactly as without this layer.

use std::time::Instant;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
};
use uuid::Uuid;

use crate::middleware::capture::{self, RequestCapture};
use crate::state::AppState;

const TRUNCATED_MARKER: &str = "…(truncated)";

/// Size limits for audit capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPolicy {
    /// Bodies up to this size are buffered for the log.
    pub capture_max_bytes: usize,
    /// Body text in a log record is cut at this many bytes.
    pub log_max_body_bytes: usize,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            capture_max_bytes: 64 * 1024,
            log_max_body_bytes: 4 * 1024,
        }
    }
}

impl AuditPolicy {
    fn render(&self, body: &Bytes, truncated: bool) -> String {
        let cut = body.len().min(self.log_max_body_bytes);
        let mut text = String::from_utf8_lossy(&body[..cut]).into_owned();
        if truncated || cut < body.len() {
            text.push_str(TRUNCATED_MARKER);
        }
        text
    }
}

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, audit_middleware))
}

async fn audit_middleware(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let policy = state.audit;
    let started = Instant::now();

    let request_id = request_id(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or_default().to_owned();

    let response = match capture::capture_request(req, policy.capture_max_bytes).await {
        RequestCapture::Captured { request, body } => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                query = %query,
                body = %policy.render(&body, false),
                "http request"
            );
            next.run(request).await
        }
        RequestCapture::Skipped { request, reason } => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                query = %query,
                body_error = %reason,
                "http request"
            );
            next.run(request).await
        }
        RequestCapture::Failed { request, reason } => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                query = %query,
                body_error = %reason,
                "http request"
            );
            next.run(request).await
        }
    };

    let (response, captured) = capture::capture_response(response, policy.capture_max_bytes).await;
    let status = response.status();
    let body = policy.render(&captured.body, captured.truncated);
    let latency_ms = started.elapsed().as_millis() as u64;

    if let Some(err) = &captured.error {
        tracing::error!(
            request_id = %request_id,
            status = status.as_u16(),
            body = %body,
            body_error = %err,
            latency_ms = latency_ms,
            "http response"
        );
        return response;
    }

    match status.as_u16() {
        500..=599 => tracing::error!(
            request_id = %request_id,
            status = status.as_u16(),
            body = %body,
            latency_ms = latency_ms,
            "http response"
        ),
        400..=499 => tracing::warn!(
            request_id = %request_id,
            status = status.as_u16(),
            body = %body,
            latency_ms = latency_ms,
            "http response"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            status = status.as_u16(),
            body = %body,
            latency_ms = latency_ms,
            "http response"
        ),
    }

    response
}

// Prefer the id set by the HTTP layer so audit records correlate with traces.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
