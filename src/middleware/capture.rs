//! Buffered body capture.
//!
//! HTTP bodies are read-once streams. These helpers let an interceptor look at
//! a body and then hand an equivalent, unconsumed body to whoever comes next:
//!
//! - Request side: read the whole body into memory (only when its length is
//!   known and within the limit) and rebuild the request with a fresh body
//!   holding the same bytes. If the stream fails part way, the next stage gets
//!   a body that yields the frames already read and then the same error.
//! - Response side: take the body out of the response, buffer it, and put a
//!   body with the same bytes back. Oversized bodies are replayed as the
//!   buffered prefix followed by the untouched rest of the stream. If the
//!   stream fails part way, the bytes already buffered are still forwarded.
//!
//! Status and headers are never touched, so removing the capture produces
//! byte-identical bodies at both ends.

use std::iter;

use axum::{
    BoxError,
    body::{Body, Bytes, HttpBody},
    http::{Request, Response},
};
use bytes::BytesMut;
use futures_util::{StreamExt, stream};
use http_body_util::{BodyExt, StreamBody};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("body is streamed without a declared length")]
    NotReplayable,
    #[error("body length {declared} exceeds capture limit {limit}")]
    TooLarge { declared: u64, limit: usize },
    #[error("body stream failed after {received} bytes: {message}")]
    Interrupted { received: usize, message: String },
    #[error("failed to read body: {0}")]
    Read(#[source] axum::Error),
}

pub enum RequestCapture {
    /// Body buffered; `request` carries a fresh body with the same bytes.
    Captured { request: Request<Body>, body: Bytes },
    /// Body not captured and left untouched.
    Skipped {
        request: Request<Body>,
        reason: CaptureError,
    },
    /// The stream failed while buffering. `request` replays what was read,
    /// then fails with the original error.
    Failed {
        request: Request<Body>,
        reason: CaptureError,
    },
}

pub async fn capture_request(request: Request<Body>, limit: usize) -> RequestCapture {
    // hyper derives an exact size hint from Content-Length; chunked bodies have none.
    let declared = request.body().size_hint().exact();

    match declared {
        Some(0) => RequestCapture::Captured {
            request,
            body: Bytes::new(),
        },
        None => RequestCapture::Skipped {
            request,
            reason: CaptureError::NotReplayable,
        },
        Some(n) if n > limit as u64 => RequestCapture::Skipped {
            request,
            reason: CaptureError::TooLarge { declared: n, limit },
        },
        Some(_) => {
            let (parts, mut body) = request.into_parts();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();

            loop {
                match body.frame().await {
                    None => {
                        let bytes = buf.freeze();
                        return RequestCapture::Captured {
                            request: Request::from_parts(parts, Body::from(bytes.clone())),
                            body: bytes,
                        };
                    }
                    Some(Ok(frame)) => {
                        if let Some(data) = frame.data_ref() {
                            buf.extend_from_slice(data);
                        }
                        frames.push(frame);
                    }
                    Some(Err(err)) => {
                        let reason = CaptureError::Interrupted {
                            received: buf.len(),
                            message: err.to_string(),
                        };
                        // `Body::new` wraps the error once, as it did for the original body,
                        // so extractors still recognise e.g. a length-limit failure.
                        let replay = frames
                            .into_iter()
                            .map(Ok)
                            .chain(iter::once(Err::<_, BoxError>(err.into_inner())));
                        let body = Body::new(StreamBody::new(stream::iter(replay)));
                        return RequestCapture::Failed {
                            request: Request::from_parts(parts, body),
                            reason,
                        };
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ResponseCapture {
    /// Up to `limit` bytes of the body, as sent.
    pub body: Bytes,
    /// The body was longer than the capture limit.
    pub truncated: bool,
    /// The downstream stream failed after `body` was written.
    pub error: Option<CaptureError>,
}

pub async fn capture_response(response: Response<Body>, limit: usize) -> (Response<Body>, ResponseCapture) {
    let (parts, mut body) = response.into_parts();
    let mut buf = BytesMut::new();

    loop {
        match body.frame().await {
            None => {
                let bytes = buf.freeze();
                let capture = ResponseCapture {
                    body: bytes.clone(),
                    ..Default::default()
                };
                return (Response::from_parts(parts, Body::from(bytes)), capture);
            }
            Some(Ok(frame)) => {
                // Trailers carry no body bytes.
                let Ok(data) = frame.into_data() else {
                    continue;
                };

                if buf.len() + data.len() > limit {
                    buf.extend_from_slice(&data);
                    let head = buf.freeze();
                    let capture = ResponseCapture {
                        body: head.slice(..limit),
                        truncated: true,
                        error: None,
                    };
                    let replay = stream::iter([Ok::<_, axum::Error>(head)])
                        .chain(body.into_data_stream());
                    return (Response::from_parts(parts, Body::from_stream(replay)), capture);
                }

                buf.extend_from_slice(&data);
            }
            Some(Err(err)) => {
                // Forward what was produced before the failure rather than dropping it.
                let bytes = buf.freeze();
                let capture = ResponseCapture {
                    body: bytes.clone(),
                    truncated: false,
                    error: Some(CaptureError::Read(err)),
                };
                return (Response::from_parts(parts, Body::from(bytes)), capture);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::{LengthLimitError, Limited};

    fn failing_stream(prefix: &'static str) -> Body {
        Body::from_stream(stream::iter([
            Ok(Bytes::from_static(prefix.as_bytes())),
            Err(std::io::Error::other("connection reset")),
        ]))
    }

    fn chunked(chunks: &[&'static str]) -> Body {
        let chunks: Vec<Result<Bytes, std::io::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Body::from_stream(stream::iter(chunks))
    }

    async fn collect(body: Body) -> Bytes {
        body.collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn request_body_is_replayed_byte_for_byte() {
        let payload = r#"{"name":"Ada","email":"ada@example.com"}"#;
        let req = Request::post("/users").body(Body::from(payload)).unwrap();

        let RequestCapture::Captured { request, body } = capture_request(req, 1024).await else {
            panic!("expected capture");
        };
        assert_eq!(body, payload.as_bytes());
        assert_eq!(collect(request.into_body()).await, payload.as_bytes());
    }

    #[tokio::test]
    async fn empty_request_body_is_empty_capture() {
        let req = Request::get("/users").body(Body::empty()).unwrap();
        let RequestCapture::Captured { body, .. } = capture_request(req, 1024).await else {
            panic!("expected capture");
        };
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn oversized_request_body_is_skipped_untouched() {
        let req = Request::post("/users").body(Body::from("0123456789")).unwrap();

        let RequestCapture::Skipped { request, reason } = capture_request(req, 4).await else {
            panic!("expected skip");
        };
        assert!(matches!(reason, CaptureError::TooLarge { declared: 10, limit: 4 }));
        assert_eq!(collect(request.into_body()).await, "0123456789".as_bytes());
    }

    #[tokio::test]
    async fn streamed_request_body_is_not_replayable() {
        let req = Request::post("/users").body(chunked(&["ab", "cd"])).unwrap();

        let RequestCapture::Skipped { request, reason } = capture_request(req, 1024).await else {
            panic!("expected skip");
        };
        assert!(matches!(reason, CaptureError::NotReplayable));
        assert_eq!(collect(request.into_body()).await, "abcd".as_bytes());
    }

    #[tokio::test]
    async fn response_body_is_restored_after_capture() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/1")
            .body(chunked(&["{\"id\":", "1}"]))
            .unwrap();

        let (res, capture) = capture_response(res, 1024).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["location"], "/users/1");
        assert_eq!(capture.body, "{\"id\":1}".as_bytes());
        assert!(!capture.truncated);
        assert!(capture.error.is_none());
        assert_eq!(collect(res.into_body()).await, "{\"id\":1}".as_bytes());
    }

    #[tokio::test]
    async fn oversized_response_is_truncated_in_capture_only() {
        let res = Response::new(chunked(&["abc", "def", "ghi"]));

        let (res, capture) = capture_response(res, 4).await;
        assert!(capture.truncated);
        assert_eq!(capture.body, "abcd".as_bytes());
        assert_eq!(collect(res.into_body()).await, "abcdefghi".as_bytes());
    }

    #[tokio::test]
    async fn partial_response_is_flushed_when_stream_fails() {
        let res = Response::new(failing_stream("partial"));

        let (res, capture) = capture_response(res, 1024).await;
        assert!(matches!(capture.error, Some(CaptureError::Read(_))));
        assert_eq!(capture.body, "partial".as_bytes());
        assert_eq!(collect(res.into_body()).await, "partial".as_bytes());
    }

    #[tokio::test]
    async fn failed_request_read_is_replayed_with_same_error() {
        // Declares 3 bytes but carries 10: the limit trips on the first frame.
        let body = Body::new(Limited::new(Body::from("0123456789"), 3));
        let req = Request::post("/users").body(body).unwrap();

        let RequestCapture::Failed { request, reason } = capture_request(req, 1024).await else {
            panic!("expected failure");
        };
        assert!(matches!(reason, CaptureError::Interrupted { received: 0, .. }));

        let err = request.into_body().collect().await.unwrap_err();
        assert!(err.into_inner().is::<LengthLimitError>());
    }
}
