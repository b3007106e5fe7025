//! Standard response envelope
//!
//! Wraps payloads for named-method controllers and every error response:
//!
//! ```json
//! {
//!   "elapsedSeconds": 0,
//!   "statusCode": 200,
//!   "payload": { ... },
//!   "isError": false
//! }
//! ```

use serde_json::{Map, Value};

use super::payload::{DataClass, DataClassConfig};
use crate::error::{RouterError, TraceFrame};

/// Failure description carried by error envelopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    /// Present only when stack-trace disclosure is enabled
    pub stack_trace: Option<Vec<TraceFrame>>,
}

impl ErrorDetail {
    pub fn from_error(err: &RouterError, show_stack_trace: bool) -> Self {
        Self {
            message: err.to_string(),
            stack_trace: show_stack_trace.then(|| err.frames()),
        }
    }
}

impl DataClass for ErrorDetail {
    fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("message".to_string(), Value::String(self.message.clone()));
        let trace = self
            .stack_trace
            .as_ref()
            .and_then(|frames| serde_json::to_value(frames).ok())
            .unwrap_or(Value::Null);
        fields.insert("stackTrace".to_string(), trace);
        fields
    }
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub elapsed_seconds: u64,
    pub status_code: u16,
    pub payload: Option<Value>,
    pub is_error: bool,
    pub error_detail: Option<ErrorDetail>,
    pub development_messages: Option<Vec<Value>>,
    null_policy: DataClassConfig,
}

impl ResponseEnvelope {
    /// Successful envelope around a payload, always status 200
    pub fn success(elapsed_seconds: u64, payload: Value, suppress_nulls: bool) -> Self {
        Self {
            elapsed_seconds,
            status_code: 200,
            payload: Some(payload),
            is_error: false,
            error_detail: None,
            development_messages: None,
            null_policy: DataClassConfig::suppressing(suppress_nulls),
        }
    }

    /// Error envelope; errors report no elapsed time
    pub fn failure(err: &RouterError, show_stack_trace: bool, suppress_nulls: bool) -> Self {
        Self {
            elapsed_seconds: 0,
            status_code: err.status_code(),
            payload: None,
            is_error: true,
            error_detail: Some(ErrorDetail::from_error(err, show_stack_trace)),
            development_messages: None,
            null_policy: DataClassConfig::suppressing(suppress_nulls),
        }
    }

    /// Attach developer messages; an empty list attaches nothing
    #[must_use]
    pub fn with_development_messages(mut self, messages: Vec<Value>) -> Self {
        if !messages.is_empty() {
            self.development_messages = Some(messages);
        }
        self
    }

    fn suppress_nulls(&self) -> bool {
        self.null_policy.suppress_nulls.unwrap_or(true)
    }
}

impl DataClass for ResponseEnvelope {
    fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("elapsedSeconds".to_string(), Value::from(self.elapsed_seconds));
        fields.insert("statusCode".to_string(), Value::from(self.status_code));
        fields.insert(
            "payload".to_string(),
            self.payload.clone().unwrap_or(Value::Null),
        );
        fields.insert("isError".to_string(), Value::Bool(self.is_error));
        fields.insert(
            "errorDetail".to_string(),
            self.error_detail.as_ref().map_or(Value::Null, |detail| {
                Value::Object(detail.expose(self.suppress_nulls()))
            }),
        );
        fields.insert(
            "developmentMessages".to_string(),
            self.development_messages
                .clone()
                .map_or(Value::Null, Value::Array),
        );
        fields
    }

    fn data_config(&self) -> DataClassConfig {
        self.null_policy
    }
}
