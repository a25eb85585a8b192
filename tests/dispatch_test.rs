//! Variant selection against frozen registries.

mod common;

use std::sync::{Arc, Mutex};
use std::thread;

use common::*;
use frameroute::configurator::DEFAULT_NAMESPACE;
use frameroute::error::DispatchError;
use frameroute::http::ApiVersion;
use frameroute::predicates::ClauseMode;
use frameroute::{CompiledRoutes, Configurator, DispatchOutcome, EndpointSpec, ViewResult, ViewTarget};
use serde_json::json;

fn flagged(label: &str, pass: bool) -> serde_json::Value {
    json!({ "label": label, "pass": pass })
}

#[tokio::test]
async fn test_variants_are_tried_in_declaration_order() {
    let log: EvalLog = Arc::new(Mutex::new(Vec::new()));
    let mut config = Configurator::new();
    add_flag_predicates(&mut config, &["first_flag", "second_flag"], &log).unwrap();
    let root = config.root_scope();
    config.add_route(&root, "items", "/items").unwrap();

    let spec = EndpointSpec::new("items");
    config
        .add_endpoint(
            &root,
            text_view("two-predicates"),
            spec.clone()
                .predicate("first_flag", flagged("P1", false))
                .predicate("second_flag", flagged("P2", true)),
        )
        .unwrap();
    config
        .add_endpoint(&root, text_view("one-predicate"), spec.clone().predicate("first_flag", flagged("P3", false)))
        .unwrap();
    config.add_endpoint(&root, text_view("unconditional"), spec).unwrap();

    let registry = config.freeze().unwrap();
    let routes = CompiledRoutes::from_registry(&registry).unwrap();
    let response = routes.dispatch(&request("GET", "/items")).unwrap().into_response().unwrap();

    assert_eq!(body_text(response).await, "unconditional");
    assert_eq!(*log.lock().unwrap(), vec!["P1".to_string(), "P3".to_string()]);
}

#[tokio::test]
async fn test_first_passing_variant_wins_over_later_ones() {
    let log: EvalLog = Arc::new(Mutex::new(Vec::new()));
    let mut config = Configurator::new();
    add_flag_predicates(&mut config, &["first_flag"], &log).unwrap();
    let root = config.root_scope();
    config.add_route(&root, "items", "/items").unwrap();
    config
        .add_endpoint(&root, text_view("open"), EndpointSpec::new("items"))
        .unwrap();
    config
        .add_endpoint(
            &root,
            text_view("flagged"),
            EndpointSpec::new("items").predicate("first_flag", flagged("P1", true)),
        )
        .unwrap();

    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();
    let response = routes.dispatch(&request("GET", "/items")).unwrap().into_response().unwrap();
    assert_eq!(body_text(response).await, "open");
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_get_admits_head_and_rejects_post() {
    let mut config = Configurator::new();
    let root = config.root_scope();
    config.add_route(&root, "page", "/page").unwrap();
    config
        .add_endpoint(&root, text_view("page"), EndpointSpec::new("page").request_method(["get"]))
        .unwrap();
    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();

    assert!(matches!(routes.dispatch(&request("GET", "/page")), Ok(DispatchOutcome::Matched(_))));
    assert!(matches!(routes.dispatch(&request("HEAD", "/page")), Ok(DispatchOutcome::Matched(_))));
    assert!(matches!(routes.dispatch(&request("POST", "/page")), Ok(DispatchOutcome::NotFound)));
}

#[test]
fn test_predicate_error_propagates() {
    let mut config = Configurator::new();
    let root = config.root_scope();
    config.add_route(&root, "users", "/users").unwrap();
    let schema = json!({ "type": "object", "required": ["name"] });
    config
        .add_endpoint(
            &root,
            text_view("create"),
            EndpointSpec::new("users").request_method(["POST"]).input_schema(schema),
        )
        .unwrap();
    config.add_endpoint(&root, text_view("fallback"), EndpointSpec::new("users")).unwrap();
    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();

    let invalid = request_with_body("POST", "/users", r#"{"email": "a@b.c"}"#);
    assert!(matches!(routes.dispatch(&invalid), Err(DispatchError::Validation(_))));

    let valid = request_with_body("POST", "/users", r#"{"name": "ada"}"#);
    assert!(matches!(routes.dispatch(&valid), Ok(DispatchOutcome::Matched(_))));
}

#[tokio::test]
async fn test_version_selects_variant() {
    let mut config = Configurator::new();
    let root = config.root_scope();
    config.add_route(&root, "status", "/v{version}/status").unwrap();
    config
        .add_endpoint(&root, text_view("legacy"), EndpointSpec::new("status").api_version(["<2.0"]))
        .unwrap();
    config
        .add_endpoint(&root, text_view("current"), EndpointSpec::new("status").api_version([">=2.0"]))
        .unwrap();
    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();

    for (version, expected) in [("1.5", "legacy"), ("2.0", "current"), ("3", "current")] {
        let mut req = request("GET", &format!("/v{}/status", version));
        req.extensions_mut().insert(version.parse::<ApiVersion>().unwrap());
        let response = routes.dispatch(&req).unwrap().into_response().unwrap();
        assert_eq!(body_text(response).await, expected, "version {}", version);
    }
}

#[test]
fn test_all_clause_mode_requires_every_clause() {
    let predicates = frameroute::predicates::PredicateConfig {
        version_clauses: ClauseMode::All,
        ..Default::default()
    };
    let mut config = Configurator::with_predicate_config(predicates);
    let root = config.root_scope();
    config.add_route(&root, "ranged", "/ranged").unwrap();
    config
        .add_endpoint(&root, text_view("ranged"), EndpointSpec::new("ranged").api_version([">=1.0,<2.0"]))
        .unwrap();
    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();

    let at = |version: &str| {
        let mut req = request("GET", "/ranged");
        req.extensions_mut().insert(version.parse::<ApiVersion>().unwrap());
        routes.dispatch(&req).unwrap()
    };
    assert!(!at("1.5").is_not_found());
    assert!(at("2.1").is_not_found());
    assert!(at("0.9").is_not_found());
}

#[test]
fn test_json_renderer_output() {
    let mut config = Configurator::new();
    let root = config.root_scope();
    config.add_route(&root, "user", "/users/{id:[0-9]+}").unwrap();
    let target = ViewTarget::function("show", |_, ctx| {
        Ok(ViewResult::Json(json!({ "id": ctx.raw("id") })))
    });
    config
        .add_endpoint(&root, target, EndpointSpec::new("user").renderer("user.json"))
        .unwrap();
    let routes = CompiledRoutes::from_registry(&config.freeze().unwrap()).unwrap();

    let response = routes.dispatch(&request("GET", "/users/7")).unwrap().into_response().unwrap();
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert!(routes.resolve("/users/seven").is_none());
}

#[test]
fn test_concurrent_dispatch_matches_sequential() {
    let mut config = Configurator::new();
    let root = config.root_scope();
    config.add_route(&root, "things", "/things/{id}").unwrap();
    for method in ["GET", "POST", "DELETE"] {
        let label = method.to_lowercase();
        let target = ViewTarget::function(label.clone(), move |_, ctx| {
            Ok(ViewResult::Text(format!("{}:{}", label, ctx.raw("id").unwrap_or(""))))
        });
        config
            .add_endpoint(&root, target, EndpointSpec::new("things").request_method([method]))
            .unwrap();
    }
    let registry = config.freeze().unwrap();
    let routes = Arc::new(CompiledRoutes::new(&registry, [DEFAULT_NAMESPACE]).unwrap());

    let cases: Vec<(&str, String)> = (0..1200)
        .map(|i| (["GET", "POST", "DELETE", "PUT"][i % 4], format!("/things/{}", i)))
        .collect();

    let run = |routes: &CompiledRoutes, method: &str, path: &str| -> Option<(String, u16)> {
        let req = request(method, path);
        let (dispatcher, captures) = routes.resolve(path)?;
        let selected = dispatcher.select(&captures, &req).unwrap()?.handler.name().to_string();
        let response = dispatcher.dispatch(&req, &captures).unwrap().into_response()?;
        Some((selected, response.status().as_u16()))
    };

    let sequential: Vec<Option<(String, u16)>> = cases
        .iter()
        .map(|(method, path)| run(&routes, method, path))
        .collect();

    let concurrent: Vec<Option<(String, u16)>> = thread::scope(|s| {
        let handles: Vec<_> = cases
            .chunks(100)
            .map(|chunk| {
                let routes = routes.clone();
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|(method, path)| run(&routes, method, path))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, concurrent);
    assert_eq!(sequential[0], Some(("get".to_string(), 200)));
    assert_eq!(sequential[3], None);
}
