//! End-to-end scenarios against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and exercises every response
//! branch of the client over real HTTP: ordered chunk accumulation, the
//! JSON-envelope paths, transport failures, mid-stream cancellation, and
//! UTF-8 chunk-boundary decoding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use sse_core::{
    EnvelopeObserver, ErrorSink, RequestOptions, ResultEnvelope, SseClient, StaticToken,
};

const TOKEN: &str = "token-123";

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        mock_server::run(listener).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> SseClient {
    let base = start_server().await;
    SseClient::new(&base).with_token_provider(StaticToken(TOKEN.to_string()))
}

/// Records every callback invocation for later assertions.
#[derive(Default)]
struct Probe {
    increments: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    completions: AtomicUsize,
}

impl Probe {
    fn attach(probe: &Arc<Self>, options: RequestOptions) -> RequestOptions {
        let on_success = Arc::clone(probe);
        let on_error = Arc::clone(probe);
        let on_complete = Arc::clone(probe);
        options
            .on_success(move |chunk| {
                on_success.increments.lock().unwrap().push(chunk.to_string());
            })
            .on_error(move |err| {
                on_error.errors.lock().unwrap().push(err.to_string());
            })
            .on_complete(move || {
                on_complete.completions.fetch_add(1, Ordering::SeqCst);
            })
    }

    fn increments(&self) -> Vec<String> {
        self.increments.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<String>>>);

impl ErrorSink for RecordingSink {
    fn report(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

#[derive(Clone, Default)]
struct RecordingObserver(Arc<Mutex<Vec<ResultEnvelope>>>);

impl EnvelopeObserver for RecordingObserver {
    fn on_failure(&self, envelope: &ResultEnvelope) {
        self.0.lock().unwrap().push(envelope.clone());
    }
}

fn stream_body(chunks: &[&str], delay_ms: u64) -> serde_json::Value {
    json!({ "chunks": chunks, "delay_ms": delay_ms })
}

// --- streaming ---

#[tokio::test]
async fn accumulates_transformed_chunks_in_order() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let options = Probe::attach(
        &probe,
        RequestOptions::new("/stream")
            .body(stream_body(&["data: one\n", "data: two\n", "data: three\n"], 20)),
    );
    let handle = client.request(options);
    handle.finished().await;

    assert_eq!(handle.data(), "onetwothree");
    assert_eq!(probe.increments(), vec!["one", "two", "three"]);
    assert_eq!(probe.completions(), 1);
    assert!(probe.errors().is_empty());
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn default_transform_strips_sse_markers() {
    let client = client().await;
    let handle = client.request(
        RequestOptions::new("/stream").body(stream_body(&["data: hello\n"], 0)),
    );
    handle.finished().await;
    assert_eq!(handle.data(), "hello");
}

#[tokio::test]
async fn custom_process_data_takes_precedence_over_pattern() {
    let client = client().await;
    let handle = client.request(
        RequestOptions::new("/stream")
            .body(stream_body(&["data: a\n"], 0))
            .process_data(|text| text.to_uppercase()),
    );
    handle.finished().await;
    // The delimiter pattern never ran; the raw chunk was only uppercased.
    assert_eq!(handle.data(), "DATA: A\n");
}

#[tokio::test]
async fn caller_supplied_delimiter_pattern_is_used() {
    let client = client().await;
    let digits = regex::Regex::new(r"[0-9]").unwrap();
    let handle = client.request_with_delimiters(
        RequestOptions::new("/stream").body(stream_body(&["a1b2\n"], 0)),
        digits,
    );
    handle.finished().await;
    assert_eq!(handle.data(), "ab\n");
}

#[tokio::test]
async fn multibyte_char_split_across_chunks_decodes_intact() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/stream/split-utf8")));
    handle.finished().await;

    assert_eq!(handle.data(), "café");
    assert_eq!(probe.completions(), 1);
    assert!(probe.errors().is_empty());
}

#[tokio::test]
async fn authorization_header_is_attached() {
    let client = client().await;
    let handle = client.request(RequestOptions::new("/stream/echo-auth"));
    handle.finished().await;
    assert_eq!(handle.data(), TOKEN);
}

// --- cancellation ---

#[tokio::test]
async fn cancel_mid_stream_freezes_state_without_callbacks() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let options = Probe::attach(
        &probe,
        RequestOptions::new("/stream").body(stream_body(
            &["data: a\n", "data: b\n", "data: c\n", "data: d\n", "data: e\n"],
            60,
        )),
    );
    let handle = client.request(options);

    // Wait until exactly two chunks have been published, then cancel.
    let mut data = handle.data_watch();
    data.wait_for(|d| d == "ab").await.unwrap();
    handle.cancel();
    handle.cancel(); // idempotent

    // Give the remaining chunks ample time to arrive if cancellation leaked.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(handle.data(), "ab");
    assert!(probe.errors().is_empty());
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn cancel_after_completion_is_a_no_op() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(
        Probe::attach(&probe, RequestOptions::new("/stream").body(stream_body(&["data: x\n"], 0))),
    );
    handle.finished().await;
    assert_eq!(probe.completions(), 1);

    handle.cancel();
    handle.cancel();

    assert_eq!(handle.data(), "x");
    assert_eq!(probe.completions(), 1);
    assert!(probe.errors().is_empty());
    assert!(!handle.is_loading());
}

// --- error paths ---

#[tokio::test]
async fn invalid_utf8_mid_stream_fails_and_freezes_state() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/stream/invalid-utf8")));
    handle.finished().await;

    // The valid first frame was accumulated; the bad bytes ended the stream
    // in a failed terminal state.
    assert_eq!(handle.data(), "ok");
    let errors = probe.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("invalid UTF-8 in response"), "{errors:?}");
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn truncated_utf8_at_end_of_stream_is_a_decode_failure() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/stream/truncated-utf8")));
    handle.finished().await;

    assert_eq!(handle.data(), "caf");
    let errors = probe.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("stream ended mid UTF-8 sequence"), "{errors:?}");
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn panicking_transform_still_reaches_a_terminal_state() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let options = Probe::attach(
        &probe,
        RequestOptions::new("/stream")
            .body(stream_body(&["data: a\n"], 0))
            .process_data(|_| panic!("transform blew up")),
    );
    let handle = client.request(options);

    // Even an unwinding transform must settle the loading flag.
    tokio::time::timeout(Duration::from_secs(2), handle.finished())
        .await
        .expect("request must reach a terminal state");

    assert!(!handle.is_loading());
    assert_eq!(handle.data(), "");
    assert_eq!(probe.completions(), 0);

    // The handle is a permanent no-op afterwards.
    handle.cancel();
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn http_error_invokes_on_error_once_and_reports() {
    let base = start_server().await;
    let sink = RecordingSink::default();
    let client = SseClient::new(&base)
        .with_token_provider(StaticToken(TOKEN.to_string()))
        .with_error_sink(sink.clone());
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/fail")));
    handle.finished().await;

    assert_eq!(probe.errors(), vec!["request failed, please retry later"]);
    assert_eq!(probe.completions(), 0);
    assert_eq!(handle.data(), "");
    assert!(!handle.is_loading());
    assert_eq!(sink.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn show_error_log_false_silences_the_sink() {
    let base = start_server().await;
    let sink = RecordingSink::default();
    let client = SseClient::new(&base)
        .with_token_provider(StaticToken(TOKEN.to_string()))
        .with_error_sink(sink.clone());
    let probe = Arc::new(Probe::default());

    let handle =
        client.request(Probe::attach(&probe, RequestOptions::new("/fail").show_error_log(false)));
    handle.finished().await;

    // The error callback still fires; only the sink is gated.
    assert_eq!(probe.errors().len(), 1);
    assert!(sink.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn envelope_failure_notifies_observer_and_on_error() {
    let base = start_server().await;
    let observer = RecordingObserver::default();
    let client = SseClient::new(&base)
        .with_token_provider(StaticToken(TOKEN.to_string()))
        .with_envelope_observer(observer.clone());
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/envelope/fail")));
    handle.finished().await;

    assert_eq!(probe.errors(), vec!["bad request"]);
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());

    let seen = observer.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].code, 1);
    assert_eq!(seen[0].message, "bad request");
}

#[tokio::test]
async fn envelope_success_completes_silently() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/envelope/ok")));
    handle.finished().await;

    // Fire and forget: no callbacks, no state mutation.
    assert_eq!(handle.data(), "");
    assert!(probe.increments().is_empty());
    assert!(probe.errors().is_empty());
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());
}

#[tokio::test]
async fn empty_body_is_a_failure() {
    let client = client().await;
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/empty")));
    handle.finished().await;

    assert_eq!(probe.errors(), vec!["streaming response body is empty"]);
    assert_eq!(probe.completions(), 0);
    assert!(!handle.is_loading());
}

// --- credentials ---

#[tokio::test]
async fn missing_token_makes_no_network_call() {
    // No token provider configured; default need_auth short-circuits.
    let base = start_server().await;
    let client = SseClient::new(&base);
    let probe = Arc::new(Probe::default());

    let handle = client.request(Probe::attach(&probe, RequestOptions::new("/stream")));

    assert!(!handle.is_loading());
    assert_eq!(handle.data(), "");
    handle.cancel(); // safe no-op

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(probe.increments().is_empty());
    assert!(probe.errors().is_empty());
    assert_eq!(probe.completions(), 0);
}
