//! exrouter
//!
//! A small request router: a request path under a script marker
//! (`/index.php/users/show/42`) resolves to a registered controller, runs
//! through an ordered filter chain, and is dispatched either by HTTP verb
//! (REST controllers) or by named method. Results are normalised into raw
//! bodies, bare JSON, or the standard response envelope.
//!
//! ```no_run
//! use exrouter::controller::FnController;
//! use exrouter::dispatch::CallContext;
//! use exrouter::response::HandlerResult;
//! use exrouter::runtime::CoreRuntime;
//! use serde_json::json;
//!
//! let runtime = CoreRuntime::from_launcher_folder(".")?
//!     .controller("users", || {
//!         FnController::named().operation("show", |_ctx: &mut CallContext<'_>, args: &[String]| {
//!             Ok(Some(HandlerResult::json(json!({ "id": args.first() }))))
//!         })
//!     })
//!     .build()?;
//!
//! let response = runtime.handle("GET", "/index.php/users/show/42", None);
//! assert_eq!(response.status, 200);
//! # Ok::<(), exrouter::error::RouterError>(())
//! ```

pub mod config;
pub mod controller;
pub mod demo;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod logger;
pub mod response;
pub mod routing;
pub mod runtime;
pub mod server;

pub use error::RouterError;
pub use runtime::{CoreRuntime, RuntimeBuilder, RuntimeSlot};
