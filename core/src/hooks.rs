//! Injected collaborators: token source, envelope observer, error sink.
//!
//! # Design
//! Ambient state the original relied on globally (token store, response
//! validator, user-facing error toast) is injected into the client as trait
//! objects, so tests swap them without touching process-wide state. All
//! defaults are inert except the error sink, which routes to `tracing`.

use crate::envelope::ResultEnvelope;

/// Supplies the current authorization token, if any. No refresh or retry
/// logic lives behind this trait.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A provider that never has a token. With the default `need_auth`, every
/// request short-circuits to an inert handle.
#[derive(Debug, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// A fixed token, handy for tests and CLI use.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Observes envelope-level failures on the non-streaming branch, e.g. to
/// force a logout on a session-expired code. Invoked once per failure,
/// before the error callback.
pub trait EnvelopeObserver: Send + Sync {
    fn on_failure(&self, envelope: &ResultEnvelope);
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl EnvelopeObserver for NoopObserver {
    fn on_failure(&self, _envelope: &ResultEnvelope) {}
}

/// Receives user-facing failure text. Gated by `show_error_log`; never
/// invoked for cancellation.
pub trait ErrorSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Default sink: forwards to `tracing::error!`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, message: &str) {
        tracing::error!(target: "sse_core", "{message}");
    }
}
