//! Demo controllers and filters
//!
//! What the `exrouter` binary serves out of the box:
//!
//! | Path | Controller |
//! |---|---|
//! | `/index.php/products/<id>` | REST, `get`/`post`/`delete` |
//! | `/index.php/users/show/<id>`, `/index.php/users/list` | named methods |
//! | `/index.php/admin/reports/summary` | named methods, folder layout |
//!
//! Filters are enabled by name through `router.filters`.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};

use crate::controller::{FnController, Outcome};
use crate::dispatch::{CallContext, CallMetadata};
use crate::error::RouterError;
use crate::filter::{Filter, FilterOutput};
use crate::response::{HandlerResult, SerdeData};
use crate::runtime::RuntimeBuilder;

#[derive(Debug, Clone, Serialize)]
struct Product {
    id: u32,
    name: &'static str,
    price_cents: u32,
    discontinued_at: Option<&'static str>,
}

const PRODUCTS: [Product; 2] = [
    Product {
        id: 1,
        name: "Desk lamp",
        price_cents: 2_499,
        discontinued_at: None,
    },
    Product {
        id: 2,
        name: "Cable tray",
        price_cents: 1_150,
        discontinued_at: Some("2024-01-31"),
    },
];

/// Product lookup dispatched by HTTP verb
pub fn products() -> FnController {
    FnController::rest()
        .operation("get", |_ctx: &mut CallContext<'_>, args: &[String]| {
            let Some(id) = args.last() else {
                return Ok(Some(HandlerResult::json(json!(PRODUCTS))));
            };
            let id: u32 = id
                .parse()
                .map_err(|_| RouterError::status(400, format!("invalid product id '{id}'")))?;
            let product = PRODUCTS
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(RouterError::not_found)?;
            Ok(Some(HandlerResult::data(SerdeData::new(product)?)))
        })
        .operation("post", |ctx: &mut CallContext<'_>, _args: &[String]| {
            let body = ctx.request().body().unwrap_or("{}");
            let submitted: Value =
                serde_json::from_str(body).context("product body is not valid JSON")?;
            Ok(Some(HandlerResult::json(json!({
                "created": submitted,
                "_useEnvelope": true,
            }))))
        })
        .operation("delete", |_ctx: &mut CallContext<'_>, _args: &[String]| {
            Err(RouterError::status(405, "products cannot be deleted").into())
        })
}

/// User directory with named operations
pub fn users() -> FnController {
    FnController::named()
        .operation("show", |ctx: &mut CallContext<'_>, args: &[String]| {
            let id = args.first().ok_or_else(RouterError::not_found)?;
            if ctx.filters().is_empty() {
                ctx.add_development_message(json!({"INFO": "no filters enabled"}));
            }
            Ok(Some(HandlerResult::json(json!({
                "id": id,
                "name": format!("user-{id}"),
                "requestId": ctx.filters().get(RequestIdFilter::NAME),
                "nickname": null,
            }))))
        })
        .operation("list", |_ctx: &mut CallContext<'_>, _args: &[String]| {
            Ok(Some(HandlerResult::json(json!([
                {"id": "1", "name": "user-1"},
                {"id": "2", "name": "user-2"},
            ]))))
        })
        .operation("crash", |_ctx: &mut CallContext<'_>, _args: &[String]| -> Outcome {
            Err(anyhow::anyhow!("user store unavailable"))
        })
}

/// Reports grouped under the `admin` folder
pub fn reports() -> FnController {
    FnController::named().operation("summary", |ctx: &mut CallContext<'_>, _args: &[String]| {
        let html = format!(
            "<h1>{} report</h1><p>{} products</p>",
            ctx.metadata().controller_name,
            PRODUCTS.len()
        );
        Ok(Some(HandlerResult::raw(html)))
    })
}

/// Numbers every request it sees
#[derive(Debug, Default)]
pub struct RequestIdFilter {
    next: AtomicU64,
}

impl RequestIdFilter {
    pub const NAME: &'static str = "request_id";
}

impl Filter for RequestIdFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, _meta: &CallMetadata, _output: &FilterOutput) -> anyhow::Result<Value> {
        Ok(json!(self.next.fetch_add(1, Ordering::Relaxed) + 1))
    }
}

/// Records the resolved call target and the filters that ran before it
#[derive(Debug, Default)]
pub struct AuditFilter;

impl AuditFilter {
    pub const NAME: &'static str = "audit";
}

impl Filter for AuditFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, meta: &CallMetadata, output: &FilterOutput) -> anyhow::Result<Value> {
        tracing::info!(
            controller = %meta.controller_name,
            method = %meta.method_name,
            args = ?meta.arguments,
            "audit"
        );
        Ok(json!({
            "target": format!("{}::{}", meta.controller_name, meta.method_name),
            "after": output.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
        }))
    }
}

/// Look up a filter by its catalog name
pub fn filter_catalog(name: &str) -> Option<Box<dyn Filter>> {
    match name {
        RequestIdFilter::NAME => Some(Box::new(RequestIdFilter::default())),
        AuditFilter::NAME => Some(Box::new(AuditFilter)),
        _ => None,
    }
}

/// Register the demo controllers and the filters named in `router.filters`
pub fn install(builder: RuntimeBuilder) -> Result<RuntimeBuilder, RouterError> {
    let names = builder.config().filters.clone();
    let mut builder = builder
        .controller("products", products)
        .controller("users", users)
        .controller("admin/reports", reports);

    for name in &names {
        let filter = filter_catalog(name).ok_or_else(|| {
            RouterError::Configuration(format!("unknown filter '{name}' in router.filters"))
        })?;
        builder = builder.boxed_filter(filter);
    }
    Ok(builder)
}
