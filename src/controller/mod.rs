//! Controller contract
//!
//! A controller is either REST-capable (dispatched by HTTP verb) or exposes
//! named methods matched against the method segment of the path.

mod registry;

pub use registry::{ControllerFactory, ControllerRegistry};

use crate::dispatch::CallContext;
use crate::response::HandlerResult;

/// Result of one controller operation; `None` means nothing was produced
pub type Outcome = anyhow::Result<Option<HandlerResult>>;

/// How a controller's operations are selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Operations are named after HTTP verbs (`get`, `post`, ...)
    Rest,
    /// Operations are selected by the method segment of the path
    Named,
}

pub trait Controller {
    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::Named
    }

    /// Whether an operation called `name` exists
    fn has_method(&self, name: &str) -> bool;

    /// Invoke operation `name` with positional arguments
    fn call(&mut self, ctx: &mut CallContext<'_>, name: &str, args: &[String]) -> Outcome;
}

type Operation = Box<dyn Fn(&mut CallContext<'_>, &[String]) -> Outcome + Send + Sync>;

/// Controller assembled from closures, one per operation
pub struct FnController {
    mode: DispatchMode,
    operations: Vec<(String, Operation)>,
}

impl FnController {
    pub const fn rest() -> Self {
        Self {
            mode: DispatchMode::Rest,
            operations: Vec::new(),
        }
    }

    pub const fn named() -> Self {
        Self {
            mode: DispatchMode::Named,
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn operation<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, &[String]) -> Outcome + Send + Sync + 'static,
    {
        self.operations.push((name.into(), Box::new(op)));
        self
    }
}

impl Controller for FnController {
    fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    fn has_method(&self, name: &str) -> bool {
        self.operations.iter().any(|(n, _)| n == name)
    }

    fn call(&mut self, ctx: &mut CallContext<'_>, name: &str, args: &[String]) -> Outcome {
        match self.operations.iter().find(|(n, _)| n == name) {
            Some((_, op)) => op(ctx, args),
            None => Err(crate::error::RouterError::not_found().into()),
        }
    }
}
