//! Response module
//!
//! Normalises handler output into wire responses:
//! - `payload`: handler results and the `DataClass` contract
//! - `envelope`: the standard envelope and error detail
//! - `Response`: status, headers and body handed back to the host

mod envelope;
mod payload;

pub use envelope::{ErrorDetail, ResponseEnvelope};
pub use payload::{DataClass, DataClassConfig, HandlerResult, Payload, SerdeData, USE_ENVELOPE_KEY};

use serde_json::Value;
use tracing::error;

use crate::config::RouterConfig;
use crate::error::RouterError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// How the body of a response is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    /// Passthrough body; the host picks the content type
    Raw,
}

/// Transport-independent response produced for every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub kind: BodyKind,
}

impl Response {
    pub fn json(status: u16, body: &Value, pretty: bool) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: encode(body, pretty),
            kind: BodyKind::Json,
        }
    }

    pub const fn raw(body: String) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            kind: BodyKind::Raw,
        }
    }

    /// Map any failure to its error envelope
    pub fn from_error(err: &RouterError, config: &RouterConfig) -> Self {
        let envelope =
            ResponseEnvelope::failure(err, config.show_stack_trace, config.suppress_nulls);
        let body = Value::Object(envelope.expose(config.suppress_nulls));
        Self::json(err.status_code(), &body, config.pretty_print)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Serialize a JSON body, falling back to a minimal error document
fn encode(body: &Value, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(body)
    } else {
        serde_json::to_string(body)
    };
    encoded.unwrap_or_else(|e| {
        error!("Failed to serialize response: {e}");
        r#"{"statusCode":500,"isError":true,"errorDetail":{"message":"Internal server error"}}"#
            .to_string()
    })
}
