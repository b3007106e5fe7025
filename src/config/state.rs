// Application state module
// Shared by every connection the host serves

use std::sync::Arc;

use super::types::Config;
use crate::logger::AccessLog;
use crate::runtime::CoreRuntime;

/// Host state: configuration, the router core and the access log
pub struct AppState {
    pub config: Config,
    pub runtime: Arc<CoreRuntime>,
    pub access_log: Option<AccessLog>,
}

impl AppState {
    pub fn new(config: Config, runtime: CoreRuntime, access_log: Option<AccessLog>) -> Self {
        Self {
            config,
            runtime: Arc::new(runtime),
            access_log,
        }
    }
}
