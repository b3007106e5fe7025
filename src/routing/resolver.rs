//! Path resolution module
//!
//! Decides which segments of a request name the controller, which names the
//! method, and which are positional arguments.
//!
//! Two layouts are recognised, tried in order:
//! 1. flat: `<controller>/<method>/<args...>`
//! 2. folder: `<folder>/<controller>/<method>/<args...>`

use tracing::debug;

use super::request::RequestContext;
use crate::error::RouterError;

/// Lookup of controller units relative to the controllers root
pub trait ControllerSource {
    /// Whether a controller unit exists at `unit` (e.g. `users`, `admin/users`)
    fn has_unit(&self, unit: &str) -> bool;

    /// Whether `folder` groups one or more controller units
    fn has_folder(&self, folder: &str) -> bool;
}

/// Layout a request was resolved with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Flat,
    Folder,
}

impl Convention {
    /// Number of leading segments naming the controller
    pub const fn depth(self) -> usize {
        match self {
            Self::Flat => 1,
            Self::Folder => 2,
        }
    }
}

/// Outcome of path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Unit key relative to the controllers root
    pub unit: String,
    /// Type name derived from the unit's last segment
    pub controller_name: String,
    /// Method segment; `None` when the path stops at the controller
    pub method: Option<String>,
    /// Segments after the method
    pub arguments: Vec<String>,
    pub convention: Convention,
}

pub struct PathResolver<'a, S: ControllerSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ControllerSource + ?Sized> PathResolver<'a, S> {
    pub const fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn resolve(&self, request: &RequestContext) -> Result<Resolution, RouterError> {
        let segments = request.segments();
        let first = segments.first().ok_or_else(RouterError::not_found)?;
        ensure_safe(first)?;

        if self.source.has_unit(first) {
            // A flat controller without a method segment gets the verb as sent
            let method = segments
                .get(1)
                .cloned()
                .or_else(|| Some(request.raw_method().to_string()));
            let resolution = Resolution {
                unit: first.clone(),
                controller_name: type_name(first),
                method,
                arguments: segments.iter().skip(2).cloned().collect(),
                convention: Convention::Flat,
            };
            debug!(unit = %resolution.unit, method = ?resolution.method, "resolved flat controller");
            return Ok(resolution);
        }

        let Some(second) = segments.get(1) else {
            return Err(RouterError::not_found());
        };
        ensure_safe(second)?;

        if !self.source.has_folder(first) {
            return Err(RouterError::not_found());
        }
        let unit = format!("{first}/{second}");
        if !self.source.has_unit(&unit) {
            return Err(RouterError::not_found());
        }

        let resolution = Resolution {
            controller_name: type_name(second),
            unit,
            method: segments.get(2).cloned(),
            arguments: segments.iter().skip(3).cloned().collect(),
            convention: Convention::Folder,
        };
        debug!(unit = %resolution.unit, method = ?resolution.method, "resolved folder controller");
        Ok(resolution)
    }
}

/// Capitalise the first character: `users` -> `Users`
pub fn type_name(segment: &str) -> String {
    let mut chars = segment.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Reject names that could escape the controllers root
fn ensure_safe(segment: &str) -> Result<(), RouterError> {
    let lowered = segment.to_ascii_lowercase();
    let unsafe_name = segment.is_empty()
        || segment.contains("..")
        || segment.contains(['\\', '\0', ':'])
        || lowered.contains("%2e")
        || lowered.contains("%2f")
        || lowered.contains("%5c")
        || lowered.contains("%00");

    if unsafe_name {
        debug!(segment, "rejected unsafe controller segment");
        return Err(RouterError::not_found());
    }
    Ok(())
}
