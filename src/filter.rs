//! Filter chain
//!
//! Filters are pre-invocation hooks. Each one sees the call metadata and the
//! output of the filters registered before it, and its own output is stored
//! under its identity for later filters and the controller.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::dispatch::CallMetadata;
use crate::error::{classify, RouterError};

pub trait Filter: Send + Sync {
    /// Identity keying this filter's output; defaults to the type name
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn apply(&self, meta: &CallMetadata, output: &FilterOutput) -> anyhow::Result<Value>;
}

/// Accumulated filter output for one request, in registration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutput {
    entries: Map<String, Value>,
}

impl FilterOutput {
    pub fn get(&self, filter: &str) -> Option<&Value> {
        self.entries.get(filter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, filter: &str, value: Value) {
        self.entries.insert(filter.to_string(), value);
    }
}

/// Ordered filter registrations, read-only once the runtime is built
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
    advisories: Vec<Value>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    ///
    /// Outside production mode a filter without a usable identity is rejected
    /// and a repeated identity is recorded as a developer advisory.
    pub fn register(&mut self, filter: Box<dyn Filter>, production: bool) -> Result<(), RouterError> {
        if !production {
            let name = filter.name();
            if name.trim().is_empty() {
                return Err(RouterError::Configuration(
                    "invalid filter in chain: filters must expose a non-empty identity".to_string(),
                ));
            }
            if self.filters.iter().any(|f| f.name() == name) {
                warn!(filter = name, "filter registered twice");
                self.advisories.push(json!({
                    "WARNING": format!(
                        "Filter {name} is registered twice, not an error, but maybe a typo or intentional?"
                    )
                }));
            }
        }
        self.filters.push(filter);
        Ok(())
    }

    /// Run every filter in registration order.
    ///
    /// The first failure aborts the chain; typed failures keep their status.
    pub fn run(&self, meta: &CallMetadata) -> Result<FilterOutput, RouterError> {
        let mut output = FilterOutput::default();
        for filter in &self.filters {
            let name = filter.name();
            debug!(filter = name, controller = %meta.controller_name, "running filter");
            let value = filter.apply(meta, &output).map_err(|err| {
                classify(err, |cause| RouterError::Filter {
                    filter: name.to_string(),
                    message: cause.to_string(),
                    cause: Some(cause),
                })
            })?;
            output.record(name, value);
        }
        Ok(output)
    }

    /// Developer advisories collected during registration
    pub fn advisories(&self) -> &[Value] {
        &self.advisories
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
