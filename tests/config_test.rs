//! Settings files feeding the configurator.

mod common;

use std::io::Write;

use common::*;
use frameroute::config::{load_config, ConfigLoadError};
use frameroute::error::ConfigError;
use frameroute::{CompiledRoutes, Configurator, EndpointSpec, Scan};
use tempfile::NamedTempFile;

const SETTINGS: &str = r#"
[routing]
root_prefix = "/api"
default_namespace = "shop"

[api]
default_version = "2.0"
version_clauses = "all"

[[routes]]
name = "products"
pattern = "/products"
extra = { cache_seconds = 30 }

[[routes]]
name = "product"
pattern = "/products/{sku:[A-Z0-9-]+}"

[[routes]]
name = "health"
pattern = "/health"
namespace = "ops"
"#;

fn write_settings(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_declarative_routes_are_registered() {
    let file = write_settings(SETTINGS);
    let config = load_config(file.path()).unwrap();
    let configurator = Configurator::from_config(&config).unwrap();

    let products = configurator.routes().route("shop", "products").unwrap();
    assert_eq!(products.pattern, "/api/products");
    assert_eq!(products.extra.as_ref().unwrap()["cache_seconds"], 30);

    let product = configurator.routes().route("shop", "product").unwrap();
    assert_eq!(product.pattern, "/api/products/{sku}");
    assert!(product.rules.contains_key("sku"));

    assert!(configurator.routes().route("ops", "health").is_some());
    assert!(configurator.routes().route("shop", "health").is_none());
}

#[tokio::test]
async fn test_configured_routes_dispatch() {
    let file = write_settings(SETTINGS);
    let config = load_config(file.path()).unwrap();
    let mut configurator = Configurator::from_config(&config).unwrap();
    let root = configurator.root_scope();
    configurator
        .add_endpoint(&root, text_view("catalog"), EndpointSpec::new("products"))
        .unwrap();
    configurator
        .add_endpoint(&root, text_view("product"), EndpointSpec::new("product").api_version([">=2.0"]))
        .unwrap();
    let registry = configurator.freeze().unwrap();
    let routes = CompiledRoutes::new(&registry, ["shop"]).unwrap();

    let response = routes
        .dispatch(&request("GET", "/api/products/AB-12"))
        .unwrap()
        .into_response()
        .unwrap();
    assert_eq!(body_text(response).await, "product");
    assert!(routes.resolve("/api/products/ab-12").is_none());
}

#[test]
fn test_unviewed_configured_route_fails_scan() {
    let config = frameroute::config::parse_config(SETTINGS).unwrap();
    let mut configurator = Configurator::from_config(&config).unwrap();
    let root = configurator.root_scope();
    let err = configurator
        .scan(&root, Scan::new("no::declarations").namespace("ops"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::RouteWithoutView { name, .. } if name == "health"));
}

#[test]
fn test_invalid_settings_are_reported_together() {
    let file = write_settings(
        r#"
[scan]
ignore = ["(unclosed"]

[api]
default_version = "one"

[http]
max_body_bytes = 0
"#,
    );
    match load_config(file.path()) {
        Err(ConfigLoadError::Validation(errors)) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, ["scan.ignore[0]", "api.default_version", "http.max_body_bytes"]);
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(load_config(&missing), Err(ConfigLoadError::Io(_))));
}
