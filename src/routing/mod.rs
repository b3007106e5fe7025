//! Routing module
//!
//! Turns a request line into a resolved controller target:
//! - Request context parsing (script marker, segments)
//! - Flat and folder controller resolution

mod request;
mod resolver;

pub use request::RequestContext;
pub use resolver::{type_name, ControllerSource, Convention, PathResolver, Resolution};
