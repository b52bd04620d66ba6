//! The streaming request client.
//!
//! # Design
//! `SseClient` holds a base URL, a `reqwest` transport, and the injected
//! collaborators; one call to [`SseClient::request`] owns one request from
//! dispatch to a terminal state. The request runs on a spawned task whose
//! send and reads are raced against a cancellation token with `select!`, so
//! an abort drops the in-flight future instead of being inferred from error
//! text. The task is the only writer of the published state; callers observe
//! it through the returned [`SseHandle`].

use std::sync::{Arc, LazyLock, Mutex};

use futures_util::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::decode::Utf8ChunkDecoder;
use crate::envelope::ResultEnvelope;
use crate::error::StreamError;
use crate::handle::{CancelHandle, SseHandle};
use crate::hooks::{EnvelopeObserver, ErrorSink, NoToken, NoopObserver, TokenProvider, TracingSink};
use crate::options::{RequestOptions, Transform};

/// Default chunk transform: strip SSE `data:` markers (with their optional
/// following space) and newlines, leaving the payload text.
static DATA_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data: ?|\n").expect("static pattern compiles"));

pub(crate) fn default_delimiters() -> &'static Regex {
    &DATA_DELIMITERS
}

/// Performs the terminal transition when the request task exits — dropping
/// the token reference and settling the loading flag. Implemented as a drop
/// guard so it also runs when a caller-supplied transform or callback
/// unwinds out of the task; no exit may leave `loading` stuck true.
struct TerminalGuard {
    slot: Arc<Mutex<Option<CancellationToken>>>,
    loading: Arc<watch::Sender<bool>>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.take();
        }
        self.loading.send_replace(false);
    }
}

/// Generic streaming-request client.
///
/// Issues an HTTP request, classifies the response as an SSE stream or a
/// single JSON envelope, and for streams incrementally decodes, transforms,
/// and accumulates chunks while exposing live state and a cancellation
/// handle. Each [`request`](Self::request) call is independent; nothing is
/// shared between invocations.
#[derive(Clone)]
pub struct SseClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    envelopes: Arc<dyn EnvelopeObserver>,
    errors: Arc<dyn ErrorSink>,
}

impl SseClient {
    /// Client against `base_url` with a default transport, no token source,
    /// a no-op envelope observer, and a tracing-backed error sink.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens: Arc::new(NoToken),
            envelopes: Arc::new(NoopObserver),
            errors: Arc::new(TracingSink),
        }
    }

    /// Replace the HTTP transport (timeouts, proxies, etc. are configured on
    /// the `reqwest::Client` by the caller).
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_token_provider(mut self, tokens: impl TokenProvider + 'static) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    pub fn with_envelope_observer(mut self, observer: impl EnvelopeObserver + 'static) -> Self {
        self.envelopes = Arc::new(observer);
        self
    }

    pub fn with_error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.errors = Arc::new(sink);
        self
    }

    /// Issue a streaming request with the default delimiter-stripping
    /// transform. Must be called from within a tokio runtime.
    pub fn request(&self, options: RequestOptions) -> SseHandle {
        self.request_with_delimiters(options, default_delimiters().clone())
    }

    /// Like [`request`](Self::request), but chunks are cleaned with the given
    /// pattern instead of the default one. A `process_data` transform on the
    /// options still takes precedence over the pattern.
    pub fn request_with_delimiters(&self, options: RequestOptions, delimiters: Regex) -> SseHandle {
        let (data_tx, data_rx) = watch::channel(String::new());
        let (loading_tx, loading_rx) = watch::channel(true);
        let loading_tx = Arc::new(loading_tx);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        for (name, value) in &options.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid request header"),
            }
        }

        if options.need_auth {
            let auth = self
                .tokens
                .token()
                .and_then(|t| HeaderValue::from_str(&t).ok());
            match auth {
                Some(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                None => {
                    // Fail closed: absent credentials yield an inert handle,
                    // not an error. No network call is made.
                    tracing::debug!(path = %options.path, "no token available, request not dispatched");
                    loading_tx.send_replace(false);
                    let cancel = CancelHandle::inert(loading_tx);
                    return SseHandle::new(data_rx, loading_rx, cancel);
                }
            }
        }

        let url = format!("{}{}", self.base_url, options.path);
        let transform: Transform = options.process_data.clone().unwrap_or_else(|| {
            Arc::new(move |text: &str| delimiters.replace_all(text, "").into_owned())
        });

        let token = CancellationToken::new();
        let (cancel, slot) = CancelHandle::new(token.clone(), Arc::clone(&loading_tx));

        let client = self.clone();
        tokio::spawn(async move {
            let _terminal = TerminalGuard {
                slot,
                loading: loading_tx,
            };
            let RequestOptions {
                method,
                body,
                show_error_log,
                on_success,
                on_error,
                on_complete,
                ..
            } = options;

            tokio::select! {
                _ = token.cancelled() => {
                    // Expected cancellation path: no callbacks, no logging.
                    tracing::debug!(%url, "streaming request cancelled");
                }
                result = client.drive(
                    method.as_reqwest(),
                    &url,
                    headers,
                    body,
                    &transform,
                    on_success.as_deref(),
                    on_complete.as_deref(),
                    &data_tx,
                ) => {
                    if let Err(err) = result {
                        if show_error_log {
                            client.errors.report(&err.to_string());
                        }
                        if let Some(cb) = on_error.as_deref() {
                            cb(&err);
                        }
                    }
                }
            }
        });

        SseHandle::new(data_rx, loading_rx, cancel)
    }

    /// Send the request and run it to a terminal state. Cancellation is
    /// handled by the caller dropping this future mid-await.
    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: HeaderMap,
        body: Option<serde_json::Value>,
        transform: &Transform,
        on_success: Option<&(dyn Fn(&str) + Send + Sync)>,
        on_complete: Option<&(dyn Fn() + Send + Sync)>,
        data_tx: &watch::Sender<String>,
    ) -> Result<(), StreamError> {
        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = &body {
            request = request.json(body);
        }
        tracing::debug!(%url, "dispatching streaming request");

        let response = request
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "streaming request failed");
            return Err(StreamError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));
        if !is_event_stream {
            return self.consume_envelope(response).await;
        }

        let apply = transform.as_ref();
        let mut stream = response.bytes_stream();
        let mut decoder = Utf8ChunkDecoder::new();
        let mut accumulated = String::new();

        while let Some(next) = stream.next().await {
            let chunk = next.map_err(|e| StreamError::Transport(e.to_string()))?;
            let text = decoder
                .feed(&chunk)
                .map_err(|e| StreamError::Decode(e.to_string()))?;
            let increment = apply(&text);
            accumulated.push_str(&increment);
            data_tx.send_replace(accumulated.clone());
            if let Some(cb) = on_success {
                cb(&increment);
            }
        }
        decoder
            .finish()
            .map_err(|e| StreamError::Decode(e.to_string()))?;

        if let Some(cb) = on_complete {
            cb();
        }
        Ok(())
    }

    /// Non-streaming branch: the whole body is one JSON envelope. A success
    /// code completes silently; the payload, if any, is discarded.
    async fn consume_envelope(&self, response: reqwest::Response) -> Result<(), StreamError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(StreamError::EmptyBody);
        }
        let text =
            std::str::from_utf8(&bytes).map_err(|e| StreamError::Decode(e.to_string()))?;
        let envelope: ResultEnvelope =
            serde_json::from_str(text).map_err(|e| StreamError::Parse(e.to_string()))?;

        if envelope.is_success() {
            tracing::debug!("envelope response completed");
            Ok(())
        } else {
            self.envelopes.on_failure(&envelope);
            Err(StreamError::Envelope {
                code: envelope.code,
                message: envelope.message,
            })
        }
    }
}

impl std::fmt::Debug for SseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
