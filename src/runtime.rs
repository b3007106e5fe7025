//! Core runtime
//!
//! `CoreRuntime` owns the router configuration, the controller registry and
//! the filter chain, and drives one request at a time through resolution,
//! filters, dispatch and response normalisation. It is the only place where
//! a failure becomes a wire response.
//!
//! Exactly one runtime may be built per process. The claim is held by a
//! `RuntimeSlot`; `build()` uses the process-wide slot.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::RouterConfig;
use crate::controller::{Controller, ControllerRegistry, DispatchMode};
use crate::dispatch::Dispatcher;
use crate::error::{classify, RouterError};
use crate::filter::{Filter, FilterChain};
use crate::response::{DataClass, HandlerResult, Payload, Response, ResponseEnvelope};
use crate::routing::{PathResolver, RequestContext};

pub const BANNER_HEADER: &str = "X-Powered-By";
const BANNER: &str = "exrouter";
const BANNER_DEVELOPMENT: &str = "exrouter - Development Mode";

/// Hook that connects the persistence layer before a REST controller runs
pub trait DbInitializer: Send + Sync {
    fn init(&self, config: &RouterConfig) -> anyhow::Result<()>;
}

/// Write-once claim allowing a single runtime per slot
#[derive(Debug, Default)]
pub struct RuntimeSlot {
    claimed: AtomicBool,
}

static PROCESS_SLOT: RuntimeSlot = RuntimeSlot::new();

impl RuntimeSlot {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// The slot `RuntimeBuilder::build` claims
    pub fn process() -> &'static Self {
        &PROCESS_SLOT
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    fn claim(&self) -> Result<(), RouterError> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                RouterError::Configuration(
                    "runtime is already instantiated, it cannot be built twice".to_string(),
                )
            })
    }
}

/// Setup-time assembly of a `CoreRuntime`
pub struct RuntimeBuilder {
    config: RouterConfig,
    registry: ControllerRegistry,
    filters: Vec<Box<dyn Filter>>,
    db_initializer: Option<Box<dyn DbInitializer>>,
    setup_error: Option<RouterError>,
}

impl RuntimeBuilder {
    pub fn new(config: RouterConfig) -> Self {
        let registry = ControllerRegistry::new(config.controllers_root());
        Self {
            config,
            registry,
            filters: Vec::new(),
            db_initializer: None,
            setup_error: None,
        }
    }

    /// Register a controller factory under `unit` (`name` or `folder/name`)
    #[must_use]
    pub fn controller<F, C>(mut self, unit: &str, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        if let Err(err) = self.registry.register(unit, factory) {
            self.setup_error.get_or_insert(err);
        }
        self
    }

    /// Append a filter; filters run in the order they are added
    #[must_use]
    pub fn filter(self, filter: impl Filter + 'static) -> Self {
        self.boxed_filter(Box::new(filter))
    }

    #[must_use]
    pub fn boxed_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn db_initializer(mut self, hook: impl DbInitializer + 'static) -> Self {
        self.db_initializer = Some(Box::new(hook));
        self
    }

    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Build the runtime, claiming the process-wide slot
    pub fn build(self) -> Result<CoreRuntime, RouterError> {
        self.build_in(RuntimeSlot::process())
    }

    /// Build the runtime against an explicit slot
    pub fn build_in(self, slot: &RuntimeSlot) -> Result<CoreRuntime, RouterError> {
        if let Some(err) = self.setup_error {
            return Err(err);
        }
        self.config.validate()?;

        let mut chain = FilterChain::new();
        for filter in self.filters {
            chain.register(filter, self.config.production)?;
        }

        slot.claim()?;
        info!(
            controllers = self.registry.len(),
            filters = chain.len(),
            production = self.config.production,
            root = %self.registry.root().display(),
            "router runtime ready"
        );

        Ok(CoreRuntime {
            marker: self.config.script_marker(),
            config: self.config,
            registry: self.registry,
            chain,
            db_initializer: self.db_initializer,
        })
    }
}

pub struct CoreRuntime {
    config: RouterConfig,
    marker: String,
    registry: ControllerRegistry,
    chain: FilterChain,
    db_initializer: Option<Box<dyn DbInitializer>>,
}

impl CoreRuntime {
    pub fn builder(config: RouterConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    /// Builder for the default configuration rooted at a launcher folder
    pub fn from_launcher_folder(path: impl AsRef<Path>) -> Result<RuntimeBuilder, RouterError> {
        RouterConfig::for_launcher_folder(path).map(RuntimeBuilder::new)
    }

    /// Error envelope for a runtime that failed to build
    pub fn setup_failure_response(err: &RouterError, config: &RouterConfig) -> Response {
        banner(Response::from_error(err, config), config)
    }

    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Error envelope for a failure raised outside `handle`, e.g. by the host
    pub fn error_response(&self, err: &RouterError) -> Response {
        banner(Response::from_error(err, &self.config), &self.config)
    }

    pub const fn filters(&self) -> &FilterChain {
        &self.chain
    }

    pub const fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Handle one request. Never fails: every error becomes its envelope.
    pub fn handle(&self, method: &str, uri: &str, body: Option<String>) -> Response {
        let started = Instant::now();
        // setup advisories are reported again on every request
        let mut messages = self.chain.advisories().to_vec();

        match self.process(method, uri, body, started, &mut messages) {
            Ok(response) => banner(response, &self.config),
            Err(err) => {
                let status = err.status_code();
                if status >= 500 {
                    error!(%method, %uri, status, error = %err, "request failed");
                } else {
                    warn!(%method, %uri, status, error = %err, "request rejected");
                }
                self.error_response(&err)
            }
        }
    }

    fn process(
        &self,
        method: &str,
        uri: &str,
        body: Option<String>,
        started: Instant,
        messages: &mut Vec<Value>,
    ) -> Result<Response, RouterError> {
        let mut request = RequestContext::parse(method, uri, &self.marker)?;
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let resolution = PathResolver::new(&self.registry).resolve(&request)?;
        let mut controller = self.registry.resolve_and_instantiate(&resolution.unit)?;

        if controller.dispatch_mode() == DispatchMode::Rest {
            self.init_db()?;
        }

        let dispatched = Dispatcher::new(&self.chain, &self.config).dispatch(
            controller.as_mut(),
            &request,
            &resolution,
            messages,
        )?;
        let rest = dispatched.is_rest();

        let result = dispatched.result.ok_or_else(|| {
            RouterError::internal(format!(
                "{} produced no result",
                resolution.controller_name
            ))
        })?;

        let suppress_nulls = self.config.suppress_nulls;
        // data classes are exposed before any enveloping decision
        let payload = match result {
            HandlerResult::Raw(body) => return Ok(Response::raw(body)),
            HandlerResult::Payload(payload) => payload,
            HandlerResult::Data(data) => Payload::from_map(data.expose(suppress_nulls)),
        };

        // REST controllers answer bare JSON unless they ask for the envelope
        if !payload.use_envelope().unwrap_or(!rest) {
            return Ok(Response::json(200, payload.data(), self.config.pretty_print));
        }

        let mut envelope =
            ResponseEnvelope::success(started.elapsed().as_secs(), payload.into_data(), suppress_nulls);
        if !self.config.production {
            envelope = envelope.with_development_messages(std::mem::take(messages));
        }
        let body = Value::Object(envelope.expose(suppress_nulls));
        Ok(Response::json(200, &body, self.config.pretty_print))
    }

    fn init_db(&self) -> Result<(), RouterError> {
        if !self.config.db_connection_auto || !self.config.db_init_allowed() {
            return Ok(());
        }
        let Some(hook) = &self.db_initializer else {
            debug!("database auto-initialization enabled without a hook");
            return Ok(());
        };
        debug!("running database initializer");
        hook.init(&self.config)
            .map_err(|err| classify(err, RouterError::wrap))
    }
}

fn banner(response: Response, config: &RouterConfig) -> Response {
    if !config.show_header_banner {
        return response;
    }
    let value = if config.production {
        BANNER
    } else {
        BANNER_DEVELOPMENT
    };
    response.with_header(BANNER_HEADER, value)
}
