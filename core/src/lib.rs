//! Generic streaming-request client core.
//!
//! # Overview
//! Issues an HTTP request and classifies the response once, on its headers:
//! `text/event-stream` responses are consumed chunk by chunk — decoded,
//! transformed, accumulated, and published live — while anything else is
//! read whole and parsed as a JSON result envelope. The caller gets back an
//! [`SseHandle`] with the accumulated text, a loading flag, and an
//! idempotent cancellation handle.
//!
//! # Design
//! - One `request()` call owns one request; nothing is shared across calls.
//! - Ambient collaborators (token source, envelope observer, error sink) are
//!   injected trait objects, not process-wide singletons.
//! - Cancellation is raced structurally against the in-flight send/read with
//!   `tokio::select!`; an abort is an expected outcome, never an error.
//! - Chunk decoding buffers partial multi-byte UTF-8 tails across chunk
//!   boundaries instead of decoding lossily.

pub mod client;
pub mod decode;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod options;

pub use client::SseClient;
pub use envelope::{ResultEnvelope, SUCCESS_CODE};
pub use error::StreamError;
pub use handle::{CancelHandle, SseHandle};
pub use hooks::{EnvelopeObserver, ErrorSink, NoToken, StaticToken, TokenProvider};
pub use options::{Method, RequestOptions};
