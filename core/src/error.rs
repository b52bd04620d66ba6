//! Error types for the streaming request client.
//!
//! # Design
//! One variant per condition callers distinguish. `HttpStatus` keeps the raw
//! status and body for logging but displays a deliberately generic retry
//! message; `Envelope` displays the server's own message. Cancellation is not
//! represented here at all — an aborted request never surfaces as an error.

use thiserror::Error;

/// Errors delivered to the `on_error` callback of a streaming request.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The server answered with a non-2xx status. The body is retained for
    /// diagnostics; the display text stays generic.
    #[error("request failed, please retry later")]
    HttpStatus { status: u16, body: String },

    /// HTTP 2xx, but the non-streaming response carried no body at all.
    #[error("streaming response body is empty")]
    EmptyBody,

    /// The JSON envelope parsed cleanly but its code signals a domain
    /// failure. Displays the server-provided message.
    #[error("{message}")]
    Envelope { code: i64, message: String },

    /// Network-level failure from the transport (connect, send, or read).
    #[error("network error: {0}")]
    Transport(String),

    /// The response bytes were not valid UTF-8.
    #[error("invalid UTF-8 in response: {0}")]
    Decode(String),

    /// The non-streaming body was not a valid JSON envelope.
    #[error("malformed response payload: {0}")]
    Parse(String),
}
