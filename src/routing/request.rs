//! Request context parsing
//!
//! Splits a request URI of the form `/<script>.<ext>/<path>?<query>` into the
//! ordered path segments the resolver works on.

use crate::error::RouterError;

/// Parsed request line, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: String,
    raw_method: String,
    uri: String,
    segments: Vec<String>,
    body: Option<String>,
}

impl RequestContext {
    /// Parse a request line against the script marker (e.g. `.php/`).
    ///
    /// Fails with `NotFound` when the marker is absent or the first segment
    /// after it is empty.
    pub fn parse(method: &str, uri: &str, marker: &str) -> Result<Self, RouterError> {
        let path = uri.split_once('?').map_or(uri, |(path, _)| path);

        let Some(start) = path.find(marker) else {
            return Err(RouterError::not_found());
        };
        let routed = &path[start + marker.len()..];

        let segments: Vec<String> = routed.split('/').map(ToString::to_string).collect();
        // split always yields at least one segment
        if segments[0].is_empty() {
            return Err(RouterError::not_found());
        }

        Ok(Self {
            method: method.to_ascii_lowercase(),
            raw_method: method.to_string(),
            uri: uri.to_string(),
            segments,
            body: None,
        })
    }

    /// Attach the request body read by the host
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Lowercased HTTP verb
    pub fn method(&self) -> &str {
        &self.method
    }

    /// HTTP verb exactly as received
    pub fn raw_method(&self) -> &str {
        &self.raw_method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
