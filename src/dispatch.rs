//! Dispatcher
//!
//! Chooses between verb dispatch (REST controllers) and named-method
//! dispatch, runs the filter chain, and invokes the target operation.
//! Failures raised by the operation are wrapped as internal errors unless
//! they already carry a status.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::controller::{Controller, DispatchMode};
use crate::error::{classify, RouterError};
use crate::filter::{FilterChain, FilterOutput};
use crate::response::HandlerResult;
use crate::routing::{RequestContext, Resolution};

/// Resolved invocation target, read-only for filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMetadata {
    pub controller_name: String,
    pub method_name: String,
    pub arguments: Vec<String>,
}

/// Request-scoped view handed to controller operations
pub struct CallContext<'a> {
    request: &'a RequestContext,
    metadata: &'a CallMetadata,
    filters: &'a FilterOutput,
    config: &'a RouterConfig,
    messages: &'a mut Vec<Value>,
}

impl<'a> CallContext<'a> {
    pub fn new(
        request: &'a RequestContext,
        metadata: &'a CallMetadata,
        filters: &'a FilterOutput,
        config: &'a RouterConfig,
        messages: &'a mut Vec<Value>,
    ) -> Self {
        Self {
            request,
            metadata,
            filters,
            config,
            messages,
        }
    }

    pub const fn request(&self) -> &RequestContext {
        self.request
    }

    pub const fn metadata(&self) -> &CallMetadata {
        self.metadata
    }

    /// Output of the filters that ran for this request
    pub const fn filters(&self) -> &FilterOutput {
        self.filters
    }

    pub const fn config(&self) -> &RouterConfig {
        self.config
    }

    /// Record a message for the developer; shown outside production only
    pub fn add_development_message(&mut self, message: impl Into<Value>) {
        self.messages.push(message.into());
    }
}

/// Result of a completed dispatch
#[derive(Debug)]
pub struct Dispatched {
    pub result: Option<HandlerResult>,
    pub mode: DispatchMode,
}

impl Dispatched {
    pub fn is_rest(&self) -> bool {
        self.mode == DispatchMode::Rest
    }
}

pub struct Dispatcher<'a> {
    chain: &'a FilterChain,
    config: &'a RouterConfig,
}

impl<'a> Dispatcher<'a> {
    pub const fn new(chain: &'a FilterChain, config: &'a RouterConfig) -> Self {
        Self { chain, config }
    }

    /// Run filters then invoke the resolved operation on `controller`.
    ///
    /// REST controllers receive every segment after the first one; named
    /// methods receive the resolved arguments only.
    pub fn dispatch(
        &self,
        controller: &mut dyn Controller,
        request: &RequestContext,
        resolution: &Resolution,
        messages: &mut Vec<Value>,
    ) -> Result<Dispatched, RouterError> {
        let mode = controller.dispatch_mode();
        let (metadata, arguments) = match mode {
            DispatchMode::Rest => (
                CallMetadata {
                    controller_name: resolution.controller_name.clone(),
                    method_name: request.method().to_string(),
                    arguments: resolution.arguments.clone(),
                },
                rest_arguments(request),
            ),
            DispatchMode::Named => {
                let method = resolution
                    .method
                    .as_deref()
                    .filter(|m| controller.has_method(m))
                    .ok_or_else(|| {
                        debug!(
                            controller = %resolution.controller_name,
                            method = ?resolution.method,
                            "named method not defined"
                        );
                        RouterError::not_found()
                    })?;
                (
                    CallMetadata {
                        controller_name: resolution.controller_name.clone(),
                        method_name: method.to_string(),
                        arguments: resolution.arguments.clone(),
                    },
                    resolution.arguments.clone(),
                )
            }
        };

        let filters = self.chain.run(&metadata)?;

        if mode == DispatchMode::Rest && !controller.has_method(&metadata.method_name) {
            warn!(
                controller = %metadata.controller_name,
                verb = %metadata.method_name,
                "REST method not defined"
            );
            return Err(RouterError::NotFound(format!(
                "REST method ({}) is not defined.",
                metadata.method_name
            )));
        }

        debug!(
            controller = %metadata.controller_name,
            method = %metadata.method_name,
            args = arguments.len(),
            ?mode,
            "invoking controller"
        );
        let mut ctx = CallContext::new(request, &metadata, &filters, self.config, messages);
        let result = controller
            .call(&mut ctx, &metadata.method_name, &arguments)
            .map_err(|err| classify(err, RouterError::wrap))?;

        Ok(Dispatched { result, mode })
    }
}

/// Segments after the first, for both layouts
fn rest_arguments(request: &RequestContext) -> Vec<String> {
    request.segments().iter().skip(1).cloned().collect()
}
