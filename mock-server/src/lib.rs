use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Json,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// JSON result envelope returned by the non-streaming routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Body accepted by `/stream`: the exact chunks to emit and an optional
/// delay before each one.
#[derive(Debug, Deserialize)]
pub struct StreamPlan {
    pub chunks: Vec<String>,
    #[serde(default)]
    pub delay_ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/stream", post(stream_chunks))
        .route("/stream/split-utf8", post(stream_split_utf8))
        .route("/stream/invalid-utf8", post(stream_invalid_utf8))
        .route("/stream/truncated-utf8", post(stream_truncated_utf8))
        .route("/stream/echo-auth", post(stream_echo_auth))
        .route("/envelope/ok", post(envelope_ok))
        .route("/envelope/fail", post(envelope_fail))
        .route("/fail", post(server_error))
        .route("/empty", post(empty_body))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn sse_response(chunks: Vec<Bytes>, delay: Duration) -> impl IntoResponse {
    let stream = async_stream::stream! {
        for chunk in chunks {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            yield Ok::<Bytes, Infallible>(chunk);
        }
    };
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
}

/// Streams back exactly the chunks the request asked for.
async fn stream_chunks(Json(plan): Json<StreamPlan>) -> impl IntoResponse {
    let chunks: Vec<Bytes> = plan.chunks.into_iter().map(Bytes::from).collect();
    sse_response(chunks, Duration::from_millis(plan.delay_ms))
}

/// Splits a multi-byte UTF-8 character ("é", 0xC3 0xA9) across two raw
/// chunks to exercise client-side chunk-boundary decoding.
async fn stream_split_utf8() -> impl IntoResponse {
    let chunks = vec![
        Bytes::from_static(b"data: caf\xC3"),
        Bytes::from_static(b"\xA9\n"),
    ];
    sse_response(chunks, Duration::ZERO)
}

/// Emits one valid frame, then bytes that can never form UTF-8, to exercise
/// the client's mid-stream decode failure path.
async fn stream_invalid_utf8() -> impl IntoResponse {
    let chunks = vec![
        Bytes::from_static(b"data: ok\n"),
        Bytes::from_static(b"\xFF\xFE"),
    ];
    sse_response(chunks, Duration::from_millis(20))
}

/// Ends the stream with a dangling half of a multi-byte character ("é"
/// missing its second byte).
async fn stream_truncated_utf8() -> impl IntoResponse {
    let chunks = vec![Bytes::from_static(b"data: caf\xC3")];
    sse_response(chunks, Duration::ZERO)
}

/// Streams the request's `Authorization` header back as a single SSE frame,
/// so clients can verify what they actually attached.
async fn stream_echo_auth(headers: HeaderMap) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let chunks = vec![Bytes::from(format!("data: {auth}\n"))];
    sse_response(chunks, Duration::ZERO)
}

async fn envelope_ok() -> Json<Envelope> {
    Json(Envelope {
        code: 200,
        message: "ok".to_string(),
        data: Some(serde_json::json!({"ignored": true})),
    })
}

async fn envelope_fail() -> Json<Envelope> {
    Json(Envelope {
        code: 1,
        message: "bad request".to_string(),
        data: None,
    })
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "server exploded")
}

async fn empty_body() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "")
}
