//! Request description for one streaming call.
//!
//! # Design
//! `RequestOptions` is plain data plus the caller's callbacks, immutable once
//! handed to [`SseClient::request`](crate::SseClient::request). Callbacks are
//! ordinary function objects invoked synchronously from the task that owns
//! the stream; there is no event bus. Only GET and POST exist in this
//! protocol, so the method enum stays that small.

use std::fmt;
use std::sync::Arc;

use crate::error::StreamError;

/// HTTP method for a streaming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

pub(crate) type SuccessCallback = Box<dyn Fn(&str) + Send + Sync>;
pub(crate) type ErrorCallback = Box<dyn Fn(&StreamError) + Send + Sync>;
pub(crate) type CompleteCallback = Box<dyn Fn() + Send + Sync>;
pub(crate) type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options for one call to [`SseClient::request`](crate::SseClient::request).
///
/// Defaults: POST, no body, no extra headers, authorization required,
/// error logging enabled.
pub struct RequestOptions {
    pub(crate) path: String,
    pub(crate) method: Method,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) need_auth: bool,
    pub(crate) show_error_log: bool,
    pub(crate) process_data: Option<Transform>,
    pub(crate) on_success: Option<SuccessCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_complete: Option<CompleteCallback>,
}

impl RequestOptions {
    /// Start building options for `path` (relative to the client's base URL).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Post,
            body: None,
            headers: Vec::new(),
            need_auth: true,
            show_error_log: true,
            process_data: None,
            on_success: None,
            on_error: None,
            on_complete: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// JSON request body. Absent means no body field at all, which is
    /// distinct from an empty body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Extra request header. Caller-supplied headers win over the defaults
    /// on key collision.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether an `Authorization` header must be attached (default true).
    pub fn need_auth(mut self, need_auth: bool) -> Self {
        self.need_auth = need_auth;
        self
    }

    /// Whether failures are forwarded to the error sink (default true).
    pub fn show_error_log(mut self, show: bool) -> Self {
        self.show_error_log = show;
        self
    }

    /// Custom chunk transform. Takes precedence over the delimiter pattern.
    pub fn process_data(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.process_data = Some(Arc::new(f));
        self
    }

    /// Called once per chunk with the transformed increment.
    pub fn on_success(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called once on any failure. Never called for cancellation.
    pub fn on_error(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called once when the stream ends naturally.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("need_auth", &self.need_auth)
            .field("show_error_log", &self.show_error_log)
            .finish_non_exhaustive()
    }
}
