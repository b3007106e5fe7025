//! Logger module
//!
//! Diagnostic events go through `tracing`; `init` installs the subscriber
//! once at startup. Access logging is separate and writes one line per
//! request in a configurable format.

mod format;
mod writer;

pub use format::AccessLogEntry;
pub use writer::AccessLog;

use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`. Events go to
/// `logging.error_log_file` when set, stderr otherwise.
pub fn init(config: &Config) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.logging.error_log_file.as_deref() {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(writer::open_log_file(path)?))
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))
}

/// Open the access log configured for this host, if enabled
pub fn access_log(config: &Config) -> io::Result<Option<AccessLog>> {
    if !config.logging.access_log {
        return Ok(None);
    }
    AccessLog::open(
        config.logging.access_log_file.as_deref(),
        &config.logging.access_log_format,
    )
    .map(Some)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("Listening on: http://{addr}");
    info!(
        level = %config.logging.level,
        workers = ?config.server.workers,
        production = config.router.production,
        launcher = %config.router.launcher_folder_path,
        "exrouter started"
    );
    if let Some(ref path) = config.logging.access_log_file {
        info!("Access log: {path}");
    }
    if let Some(ref path) = config.logging.error_log_file {
        info!("Error log: {path}");
    }
}
