//! Host request handler
//!
//! Reads the request body within the configured limit, runs the router core
//! on the blocking pool and converts its response for hyper.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode, Version};
use tracing::{error, warn};

use crate::config::{AppState, HttpConfig};
use crate::error::RouterError;
use crate::logger::AccessLogEntry;
use crate::response::{self as routed, BodyKind};

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().as_str().to_string();
    let uri = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
    let entry = state
        .access_log
        .as_ref()
        .map(|_| access_entry(&req, peer_addr));

    let response = match read_body(req, state.config.http.max_body_size).await {
        Ok(body) => {
            let runtime = Arc::clone(&state.runtime);
            tokio::task::spawn_blocking(move || runtime.handle(&method, &uri, body))
                .await
                .unwrap_or_else(|e| {
                    error!("Router core task failed: {e}");
                    state
                        .runtime
                        .error_response(&RouterError::internal("request processing was aborted"))
                })
        }
        Err(err) => state.runtime.error_response(&err),
    };

    if let (Some(log), Some(mut entry)) = (state.access_log.as_ref(), entry) {
        entry.status = response.status;
        entry.body_bytes = response.body.len();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        log.write(&entry);
    }

    Ok(into_hyper(response, &state.config.http))
}

/// Collect the body, rejecting anything above `max_body_size` with 413
async fn read_body(req: Request<Incoming>, max_body_size: u64) -> Result<Option<String>, RouterError> {
    let declared = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|size| size > max_body_size) {
        warn!("Request body too large: {declared:?} bytes (max: {max_body_size})");
        return Err(too_large(max_body_size));
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                warn!("Request body exceeded {max_body_size} bytes while reading");
                too_large(max_body_size)
            } else {
                warn!("Failed to read request body: {e}");
                RouterError::status(400, "Malformed request body")
            }
        })?
        .to_bytes();

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn too_large(max_body_size: u64) -> RouterError {
    RouterError::status(
        413,
        format!("Request body too large (max: {max_body_size} bytes)"),
    )
}

/// Convert a core response, adding the host's server and content-type headers
fn into_hyper(response: routed::Response, http: &HttpConfig) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(response.status)
        .header(hyper::header::SERVER, http.server_name.as_str());
    if response.kind == BodyKind::Raw && response.content_type().is_none() {
        builder = builder.header(
            hyper::header::CONTENT_TYPE,
            http.default_content_type.as_str(),
        );
    }
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!("Failed to build response: {e}");
            let mut fallback = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn access_entry(req: &Request<Incoming>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = http_version(req.version()).to_string();
    entry.referer = header(hyper::header::REFERER);
    entry.user_agent = header(hyper::header::USER_AGENT);
    entry
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
