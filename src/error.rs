//! Router error taxonomy
//!
//! Every failure the core can produce is a `RouterError`. Each variant carries
//! the HTTP status it surfaces as, and `Response::from_error` is the single
//! place where one is turned into a wire response.

use serde::Serialize;
use thiserror::Error;

/// Message used for every routing miss
pub const NOT_FOUND_MESSAGE: &str = "Not found.";

#[derive(Debug, Error)]
pub enum RouterError {
    /// Unresolved controller, method or REST verb, or a malformed path
    #[error("{0}")]
    NotFound(String),

    /// Setup-time failure, raised before any request is served
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Uncaught failure from a controller, or a request that produced no result
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        cause: Option<anyhow::Error>,
    },

    /// Unclassified failure raised by a filter
    #[error("Filter '{filter}' failed: {message}")]
    Filter {
        filter: String,
        message: String,
        #[source]
        cause: Option<anyhow::Error>,
    },

    /// Failure with an explicit status set by a controller or filter author
    #[error("{message}")]
    Status { code: u16, message: String },
}

/// One entry of an error trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFrame {
    pub depth: usize,
    pub message: String,
}

impl RouterError {
    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap an unclassified handler failure, keeping it as the cause
    pub fn wrap(cause: anyhow::Error) -> Self {
        Self::Internal {
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// HTTP status this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Configuration(_) | Self::Internal { .. } | Self::Filter { .. } => 500,
            Self::Status { code, .. } if (100..=599).contains(code) => *code,
            Self::Status { .. } => 500,
        }
    }

    /// Trace of this error followed by every error in its source chain
    pub fn frames(&self) -> Vec<TraceFrame> {
        let mut frames = vec![TraceFrame {
            depth: 0,
            message: self.to_string(),
        }];

        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let message = err.to_string();
            // wrapped causes repeat the message of the error wrapping them
            if frames.last().map(|f| f.message.as_str()) != Some(message.as_str()) {
                frames.push(TraceFrame {
                    depth: frames.len(),
                    message,
                });
            }
            source = err.source();
        }

        frames
    }
}

/// Convert a failure returned by a controller or filter into a typed error.
///
/// Typed errors pass through unchanged; anything else is handed to `wrap`.
pub fn classify(err: anyhow::Error, wrap: impl FnOnce(anyhow::Error) -> RouterError) -> RouterError {
    match err.downcast::<RouterError>() {
        Ok(typed) => typed,
        Err(other) => wrap(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_status_codes() {
        assert_eq!(RouterError::not_found().status_code(), 404);
        assert_eq!(RouterError::internal("boom").status_code(), 500);
        assert_eq!(RouterError::Configuration("x".into()).status_code(), 500);
        assert_eq!(RouterError::status(403, "nope").status_code(), 403);
    }

    #[test]
    fn test_status_out_of_range_defaults_to_500() {
        assert_eq!(RouterError::status(0, "zero").status_code(), 500);
        assert_eq!(RouterError::status(999, "big").status_code(), 500);
    }

    #[test]
    fn test_classify_keeps_typed_errors() {
        let err = anyhow::Error::new(RouterError::status(418, "teapot"));
        let typed = classify(err, RouterError::wrap);
        assert_eq!(typed.status_code(), 418);
        assert_eq!(typed.to_string(), "teapot");
    }

    #[test]
    fn test_classify_wraps_plain_errors() {
        let typed = classify(anyhow::anyhow!("disk on fire"), RouterError::wrap);
        assert_eq!(typed.status_code(), 500);
        assert_eq!(typed.to_string(), "disk on fire");
    }

    #[test]
    fn test_frames_follow_source_chain() {
        let inner: anyhow::Result<()> = Err(anyhow::anyhow!("socket closed"));
        let cause = inner.context("query failed").unwrap_err();
        let err = RouterError::wrap(cause);

        let frames = err.frames();
        assert_eq!(frames[0].message, "query failed");
        assert_eq!(frames[0].depth, 0);
        assert!(frames.iter().any(|f| f.message == "socket closed"));
        assert!(frames.windows(2).all(|w| w[1].depth == w[0].depth + 1));
    }
}
