//! End-to-end request handling through `CoreRuntime`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use exrouter::config::RouterConfig;
use exrouter::controller::{Controller, FnController, Outcome};
use exrouter::dispatch::{CallContext, CallMetadata};
use exrouter::filter::{Filter, FilterOutput};
use exrouter::response::{BodyKind, DataClass, DataClassConfig, HandlerResult, SerdeData, JSON_CONTENT_TYPE};
use exrouter::runtime::{CoreRuntime, RuntimeBuilder, RuntimeSlot};
use exrouter::{demo, RouterError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn config(dir: &TempDir) -> RouterConfig {
    RouterConfig {
        pretty_print: false,
        ..RouterConfig::for_launcher_folder(dir.path()).unwrap()
    }
}

fn build(builder: RuntimeBuilder) -> CoreRuntime {
    builder.build_in(&RuntimeSlot::new()).unwrap()
}

fn json_body(response: &exrouter::response::Response) -> Value {
    serde_json::from_str(&response.body).unwrap()
}

fn demo_runtime(dir: &TempDir, filters: &[&str]) -> CoreRuntime {
    let mut config = config(dir);
    config.filters = filters.iter().map(ToString::to_string).collect();
    build(demo::install(CoreRuntime::builder(config)).unwrap())
}

#[test]
fn test_rest_get_returns_bare_json() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(CoreRuntime::builder(config(&dir)).controller("products", || {
        FnController::rest().operation("get", |_ctx: &mut CallContext<'_>, args: &[String]| {
            Ok(Some(HandlerResult::json(json!({ "args": args }))))
        })
    }));

    let response = runtime.handle("GET", "/products.php/products/get/7", None);
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some(JSON_CONTENT_TYPE));
    // REST operations receive every segment after the controller
    assert_eq!(json_body(&response), json!({"args": ["get", "7"]}));

    let response = runtime.handle("GET", "/products.php/products/7", None);
    assert_eq!(json_body(&response), json!({"args": ["7"]}));
}

#[test]
fn test_empty_first_segment_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(CoreRuntime::builder(config(&dir)));

    for uri in ["/products.php/", "/products.php", "/no-marker/here"] {
        let response = runtime.handle("GET", uri, None);
        assert_eq!(response.status, 404, "uri {uri}");
        assert_eq!(response.content_type(), Some(JSON_CONTENT_TYPE));
        let body = json_body(&response);
        assert_eq!(body["isError"], json!(true));
        assert_eq!(body["statusCode"], json!(404));
        assert_eq!(body["elapsedSeconds"], json!(0));
        assert!(body["errorDetail"]["message"]
            .as_str()
            .unwrap()
            .contains("Not found."));
    }
}

#[test]
fn test_unknown_controller_and_traversal_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    for path in ["ghosts/list", "admin/ghosts/list", "../users/list", "users%2e%2e/list"] {
        let response = runtime.handle("GET", &format!("/index.php/{path}"), None);
        assert_eq!(response.status, 404, "path {path}");
    }
}

#[test]
fn test_named_method_failure_is_500_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let response = runtime.handle("GET", "/index.php/users/crash", None);
    assert_eq!(response.status, 500);
    let body = json_body(&response);
    assert_eq!(body["isError"], json!(true));
    assert_eq!(body["statusCode"], json!(500));
    assert_eq!(body["errorDetail"]["message"], json!("user store unavailable"));
    assert!(body["errorDetail"]["stackTrace"].is_array());
    assert!(body.get("payload").is_none());
}

#[test]
fn test_stack_trace_hidden_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.show_stack_trace = false;
    let runtime = build(demo::install(CoreRuntime::builder(config)).unwrap());

    let body = json_body(&runtime.handle("GET", "/index.php/users/crash", None));
    assert_eq!(body["errorDetail"], json!({"message": "user store unavailable"}));
}

#[test]
fn test_missing_named_method_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    assert_eq!(runtime.handle("GET", "/index.php/users/delete/1", None).status, 404);
    // flat controller without a method segment falls back to the verb
    assert_eq!(runtime.handle("GET", "/index.php/users", None).status, 404);
}

#[test]
fn test_missing_rest_verb_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let response = runtime.handle("PATCH", "/index.php/products/1", None);
    assert_eq!(response.status, 404);
    assert_eq!(
        json_body(&response)["errorDetail"]["message"],
        json!("REST method (patch) is not defined.")
    );
}

#[test]
fn test_named_payload_is_enveloped_with_nulls_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &["request_id"]);

    let response = runtime.handle("GET", "/index.php/users/show/42", None);
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["isError"], json!(false));
    assert_eq!(body["statusCode"], json!(200));
    assert_eq!(body["payload"]["id"], json!("42"));
    assert_eq!(body["payload"]["requestId"], json!(1));
    // nested payload fields are passed through as returned
    assert!(body["payload"].as_object().unwrap().contains_key("nickname"));
    assert!(body.get("errorDetail").is_none());
    assert!(body.get("developmentMessages").is_none());
}

#[test]
fn test_list_payload_is_enveloped() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let body = json_body(&runtime.handle("GET", "/index.php/users/list", None));
    assert_eq!(body["payload"].as_array().unwrap().len(), 2);
}

#[test]
fn test_envelope_flag_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(
        CoreRuntime::builder(config(&dir))
            .controller("rest", || {
                FnController::rest().operation("get", |_ctx: &mut CallContext<'_>, _args: &[String]| {
                    Ok(Some(HandlerResult::json(json!({"x": 1, "_useEnvelope": true}))))
                })
            })
            .controller("named", || {
                FnController::named().operation("bare", |_ctx: &mut CallContext<'_>, _args: &[String]| {
                    Ok(Some(HandlerResult::json(json!({"x": 1, "_useEnvelope": false}))))
                })
            }),
    );

    let body = json_body(&runtime.handle("GET", "/index.php/rest", None));
    assert_eq!(body["payload"], json!({"x": 1}));

    let body = json_body(&runtime.handle("GET", "/index.php/named/bare", None));
    assert_eq!(body, json!({"x": 1}));
}

#[derive(Serialize)]
struct Invoice {
    number: u32,
    note: Option<String>,
}

#[test]
fn test_data_class_null_policy() {
    let dir = tempfile::tempdir().unwrap();
    let make = |suppress: Option<bool>| {
        move || {
            FnController::rest().operation("get", move |_ctx: &mut CallContext<'_>, _args: &[String]| {
                let data = SerdeData::new(&Invoice { number: 9, note: None })?
                    .with_config(DataClassConfig { suppress_nulls: suppress });
                Ok(Some(HandlerResult::data(data)))
            })
        }
    };

    let mut config = config(&dir);
    config.suppress_nulls = false;
    let runtime = build(
        CoreRuntime::builder(config)
            .controller("global", make(None))
            .controller("strict", make(Some(true))),
    );

    let body = json_body(&runtime.handle("GET", "/index.php/global", None));
    assert_eq!(body, json!({"number": 9, "note": null}));
    let body = json_body(&runtime.handle("GET", "/index.php/strict", None));
    assert_eq!(body, json!({"number": 9}));
}

struct Receipt {
    total: u32,
}

impl DataClass for Receipt {
    fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("total".to_string(), json!(self.total));
        fields.insert("voided".to_string(), Value::Null);
        fields
    }
}

#[test]
fn test_custom_data_class_is_exposed_before_enveloping() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(CoreRuntime::builder(config(&dir)).controller("receipts", || {
        FnController::named().operation("last", |_ctx: &mut CallContext<'_>, _args: &[String]| {
            Ok(Some(HandlerResult::data(Receipt { total: 1200 })))
        })
    }));

    let body = json_body(&runtime.handle("GET", "/index.php/receipts/last", None));
    assert_eq!(body["payload"], json!({"total": 1200}));
}

#[test]
fn test_raw_results_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let response = runtime.handle("GET", "/index.php/admin/reports/summary", None);
    assert_eq!(response.status, 200);
    assert_eq!(response.kind, BodyKind::Raw);
    assert_eq!(response.content_type(), None);
    assert_eq!(response.body, "<h1>Reports report</h1><p>2 products</p>");
}

#[test]
fn test_typed_failures_keep_their_status() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let response = runtime.handle("GET", "/index.php/products/abc", None);
    assert_eq!(response.status, 400);
    assert_eq!(
        json_body(&response)["errorDetail"]["message"],
        json!("invalid product id 'abc'")
    );

    assert_eq!(runtime.handle("DELETE", "/index.php/products/1", None).status, 405);
    assert_eq!(runtime.handle("GET", "/index.php/products/99", None).status, 404);
}

#[test]
fn test_rest_post_reads_body() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let response = runtime.handle(
        "POST",
        "/index.php/products",
        Some(r#"{"name":"Shelf"}"#.to_string()),
    );
    let body = json_body(&response);
    assert_eq!(body["payload"]["created"], json!({"name": "Shelf"}));

    let response = runtime.handle("POST", "/index.php/products", Some("not json".to_string()));
    assert_eq!(response.status, 500);
    assert!(json_body(&response)["errorDetail"]["message"]
        .as_str()
        .unwrap()
        .contains("not valid JSON"));
}

#[test]
fn test_query_string_is_ignored_for_routing() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);

    let body = json_body(&runtime.handle("GET", "/index.php/users/show/5?verbose=1", None));
    assert_eq!(body["payload"]["id"], json!("5"));
}

struct Counting {
    name: &'static str,
    runs: Arc<AtomicUsize>,
}

impl Filter for Counting {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, _meta: &CallMetadata, output: &FilterOutput) -> anyhow::Result<Value> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(json!(output.len()))
    }
}

#[test]
fn test_duplicate_filters_each_run_once_and_warn() {
    let dir = tempfile::tempdir().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let runtime = build(
        demo::install(CoreRuntime::builder(config(&dir)))
            .unwrap()
            .filter(Counting { name: "count", runs: Arc::clone(&runs) })
            .filter(Counting { name: "count", runs: Arc::clone(&runs) }),
    );

    let body = json_body(&runtime.handle("GET", "/index.php/users/show/1", None));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    let messages = body["developmentMessages"].as_array().unwrap();
    assert!(messages[0]["WARNING"].as_str().unwrap().contains("count"));
}

#[test]
fn test_filters_run_in_order_and_reach_controller() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &["request_id", "audit"]);

    let body = json_body(&runtime.handle("GET", "/index.php/users/show/1", None));
    assert_eq!(body["payload"]["requestId"], json!(1));
    let body = json_body(&runtime.handle("GET", "/index.php/users/show/1", None));
    assert_eq!(body["payload"]["requestId"], json!(2));
}

struct Deny(Option<u16>);

impl Filter for Deny {
    fn name(&self) -> &str {
        "deny"
    }

    fn apply(&self, _meta: &CallMetadata, _output: &FilterOutput) -> anyhow::Result<Value> {
        match self.0 {
            Some(code) => Err(RouterError::status(code, "forbidden").into()),
            None => Err(anyhow!("policy engine down")),
        }
    }
}

#[test]
fn test_filter_failure_aborts_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let runtime = build(
        CoreRuntime::builder(config(&dir))
            .controller("users", move || {
                let seen = Arc::clone(&seen);
                FnController::named().operation("show", move |_ctx: &mut CallContext<'_>, _args: &[String]| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(HandlerResult::raw("ok")))
                })
            })
            .filter(Deny(Some(403))),
    );

    let response = runtime.handle("GET", "/index.php/users/show/1", None);
    assert_eq!(response.status, 403);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let runtime = build(
        CoreRuntime::builder(config(&dir))
            .controller("users", demo::users)
            .filter(Deny(None)),
    );
    let response = runtime.handle("GET", "/index.php/users/show/1", None);
    assert_eq!(response.status, 500);
    assert!(json_body(&response)["errorDetail"]["message"]
        .as_str()
        .unwrap()
        .contains("policy engine down"));
}

#[test]
fn test_development_messages_hidden_in_production() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = demo_runtime(&dir, &[]);
    let body = json_body(&runtime.handle("GET", "/index.php/users/show/1", None));
    assert_eq!(body["developmentMessages"], json!([{"INFO": "no filters enabled"}]));

    let mut config = config(&dir);
    config.production = true;
    let runtime = build(demo::install(CoreRuntime::builder(config)).unwrap());
    let body = json_body(&runtime.handle("GET", "/index.php/users/show/1", None));
    assert!(body.get("developmentMessages").is_none());
}

#[test]
fn test_error_envelope_omits_development_messages() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(
        demo::install(CoreRuntime::builder(config(&dir)))
            .unwrap()
            .filter(Counting { name: "dup", runs: Arc::new(AtomicUsize::new(0)) })
            .filter(Counting { name: "dup", runs: Arc::new(AtomicUsize::new(0)) }),
    );
    let body = json_body(&runtime.handle("GET", "/index.php/users/crash", None));
    assert!(body.get("developmentMessages").is_none());
}

#[test]
fn test_pretty_print() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.pretty_print = true;
    let runtime = build(demo::install(CoreRuntime::builder(config)).unwrap());

    let response = runtime.handle("GET", "/index.php/users/list", None);
    assert!(response.body.contains("\n  "));
}

#[test]
fn test_launcher_folder_entry() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = CoreRuntime::from_launcher_folder(dir.path())
        .unwrap()
        .controller("users", demo::users)
        .build_in(&RuntimeSlot::new())
        .unwrap();
    assert_eq!(runtime.config().controllers_root(), dir.path().join("controllers"));
    assert_eq!(runtime.handle("GET", "/index.php/users/list", None).status, 200);

    let err = CoreRuntime::from_launcher_folder(dir.path().join("missing"))
        .err()
        .unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));
}

#[test]
fn test_second_runtime_in_slot_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let slot = RuntimeSlot::new();
    CoreRuntime::builder(config(&dir)).build_in(&slot).unwrap();
    let err = CoreRuntime::builder(config(&dir)).build_in(&slot).err().unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));
}

#[test]
fn test_blank_filter_identity_rejected_at_setup() {
    struct Blank;
    impl Filter for Blank {
        fn name(&self) -> &str {
            ""
        }
        fn apply(&self, _meta: &CallMetadata, _output: &FilterOutput) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let slot = RuntimeSlot::new();
    let err = CoreRuntime::builder(config(&dir))
        .filter(Blank)
        .build_in(&slot)
        .err()
        .unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));
    assert!(!slot.is_claimed());
}

#[derive(Default)]
struct Tally {
    hits: u32,
}

impl Controller for Tally {
    fn has_method(&self, name: &str) -> bool {
        name == "hit"
    }

    fn call(&mut self, _ctx: &mut CallContext<'_>, _name: &str, _args: &[String]) -> Outcome {
        self.hits += 1;
        Ok(Some(HandlerResult::raw(self.hits.to_string())))
    }
}

#[test]
fn test_fresh_controller_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = build(CoreRuntime::builder(config(&dir)).controller("tally", Tally::default));
    assert_eq!(runtime.handle("GET", "/index.php/tally/hit", None).body, "1");
    assert_eq!(runtime.handle("GET", "/index.php/tally/hit", None).body, "1");
}
