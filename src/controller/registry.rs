//! Controller registry
//!
//! Static table from unit keys (`users`, `admin/users`) to factories,
//! populated at startup. Every lookup builds a fresh instance.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Controller;
use crate::error::RouterError;
use crate::routing::ControllerSource;

pub type ControllerFactory = Box<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

pub struct ControllerRegistry {
    root: PathBuf,
    units: HashMap<String, ControllerFactory>,
    folders: HashSet<String>,
}

impl ControllerRegistry {
    /// Create an empty registry for units under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            units: HashMap::new(),
            folders: HashSet::new(),
        }
    }

    /// Register a factory for `unit`, either `name` or `folder/name`
    pub fn register<F, C>(&mut self, unit: &str, factory: F) -> Result<(), RouterError>
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let parts: Vec<&str> = unit.split('/').collect();
        let valid = matches!(parts.len(), 1 | 2)
            && parts.iter().all(|p| {
                !p.is_empty()
                    && p.chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
            });
        if !valid {
            return Err(RouterError::Configuration(format!(
                "invalid controller unit '{unit}'"
            )));
        }
        if self.units.contains_key(unit) {
            return Err(RouterError::Configuration(format!(
                "controller unit '{unit}' is registered twice"
            )));
        }

        if let [folder, _] = parts.as_slice() {
            self.folders.insert((*folder).to_string());
        }
        self.units.insert(
            unit.to_string(),
            Box::new(move || Box::new(factory()) as Box<dyn Controller>),
        );
        Ok(())
    }

    /// Build a fresh controller instance for a resolved unit
    pub fn resolve_and_instantiate(&self, unit: &str) -> Result<Box<dyn Controller>, RouterError> {
        // resolution already checked existence; this guards against a stale unit key
        let factory = self.units.get(unit).ok_or_else(RouterError::not_found)?;
        debug!(unit, path = %self.unit_path(unit).display(), "instantiating controller");
        Ok(factory())
    }

    /// Location of a unit under the controllers root
    pub fn unit_path(&self, unit: &str) -> PathBuf {
        self.root.join(unit)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl ControllerSource for ControllerRegistry {
    fn has_unit(&self, unit: &str) -> bool {
        self.units.contains_key(unit)
    }

    fn has_folder(&self, folder: &str) -> bool {
        self.folders.contains(folder)
    }
}
