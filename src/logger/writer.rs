//! Log writer module
//!
//! Access log lines go to a file or stdout. The diagnostic log file, when
//! configured, is opened here and handed to the tracing subscriber.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use super::format::AccessLogEntry;

/// Log output target
enum LogTarget {
    Stdout,
    File(Mutex<File>),
}

/// Thread-safe access log writer
pub struct AccessLog {
    target: LogTarget,
    format: String,
}

impl AccessLog {
    /// Open the access log, appending to `path` or writing to stdout
    pub fn open(path: Option<&str>, format: &str) -> io::Result<Self> {
        let target = match path {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };
        Ok(Self {
            target,
            format: format.to_string(),
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Write one entry in the configured format
    pub fn write(&self, entry: &AccessLogEntry) {
        let line = entry.format(&self.format);
        match &self.target {
            LogTarget::Stdout => println!("{line}"),
            LogTarget::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{line}");
                }
            }
        }
    }
}

/// Open or create a log file for appending
pub fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
