//! The JSON result envelope returned on non-streaming responses.
//!
//! # Design
//! Defined independently from the mock-server crate; integration tests catch
//! schema drift. The envelope is only consumed on the non-streaming branch:
//! a 2xx response whose content type is not `text/event-stream` must parse
//! into this shape, and any `code` other than [`SUCCESS_CODE`] is a domain
//! failure even though the HTTP transport succeeded.

use serde::{Deserialize, Serialize};

/// The distinguished success value of the envelope code space.
pub const SUCCESS_CODE: i64 = 200;

/// Status-code + message + optional payload envelope used by non-streaming
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResultEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}
