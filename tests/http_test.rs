//! HTTP adapter behavior through `tower::ServiceExt::oneshot`.

mod common;

use axum::body::Body;
use axum::http::StatusCode;
use common::*;
use frameroute::config::parse_config;
use frameroute::http::{ApiVersionExt, X_REQUEST_ID};
use frameroute::{AppService, Configurator, EndpointSpec, FrameConfig, ViewResult, ViewTarget};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

fn service(config: &FrameConfig) -> AppService {
    let mut configurator = Configurator::from_config(config).unwrap();
    let root = configurator.root_scope();

    configurator.add_route(&root, "echo", "/echo").unwrap();
    let schema = json!({ "type": "object", "required": ["message"] });
    let echo = ViewTarget::function("echo", |request, _| {
        let value: serde_json::Value = serde_json::from_slice(request.body())
            .map_err(|e| frameroute::DispatchError::Handler(e.to_string()))?;
        Ok(ViewResult::Json(value))
    });
    configurator
        .add_endpoint(
            &root,
            echo,
            EndpointSpec::new("echo").request_method(["POST"]).input_schema(schema).renderer("json"),
        )
        .unwrap();

    configurator.add_route(&root, "versioned", "/v{version}/ping").unwrap();
    let ping = ViewTarget::function("ping", |request, _| {
        let version = request.api_version().map(ToString::to_string).unwrap_or_default();
        Ok(ViewResult::Text(format!("pong {}", version)))
    });
    configurator
        .add_endpoint(&root, ping, EndpointSpec::new("versioned").request_method(["GET"]))
        .unwrap();

    configurator.add_route(&root, "broken", "/broken").unwrap();
    let broken = ViewTarget::function("broken", |_, _| {
        Err(frameroute::DispatchError::Handler("boom".into()))
    });
    configurator.add_endpoint(&root, broken, EndpointSpec::new("broken")).unwrap();

    let registry = configurator.freeze().unwrap();
    AppService::new(&registry, config).unwrap()
}

fn settings(extra: &str) -> FrameConfig {
    parse_config(&format!("[api]\nmin_version = \"1.0\"\n{}", extra)).unwrap()
}

#[tokio::test]
async fn test_valid_payload_is_echoed() {
    let app = service(&settings("")).router();
    let response = app
        .oneshot(http_request("POST", "/echo", r#"{"message": "hi"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    assert_eq!(body_text(response).await, r#"{"message":"hi"}"#);
}

#[tokio::test]
async fn test_invalid_payload_is_bad_request() {
    let app = service(&settings("")).router();
    let response = app
        .oneshot(http_request("POST", "/echo", r#"{"other": 1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unmatched_method_and_path_are_not_found() {
    let service = service(&settings(""));
    let wrong_method = service
        .router()
        .oneshot(http_request("GET", "/echo", Body::empty()))
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), StatusCode::NOT_FOUND);

    let wrong_path = service
        .router()
        .oneshot(http_request("GET", "/nowhere", Body::empty()))
        .await
        .unwrap();
    assert_eq!(wrong_path.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_version_capture_reaches_handler() {
    let app = service(&settings("")).router();
    let response = app
        .oneshot(http_request("GET", "/v2.1/ping", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "pong 2.1");
}

#[tokio::test]
async fn test_retired_and_malformed_versions() {
    let service = service(&settings(""));
    let retired = service
        .router()
        .oneshot(http_request("GET", "/v0.9/ping", Body::empty()))
        .await
        .unwrap();
    assert_eq!(retired.status(), StatusCode::GONE);

    let malformed = service
        .router()
        .oneshot(http_request("GET", "/vlatest/ping", Body::empty()))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = service(&settings("[http]\nmax_body_bytes = 8\n")).router();
    let response = app
        .oneshot(http_request("POST", "/echo", r#"{"message": "far too long"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_handler_error_is_internal() {
    let app = service(&settings("")).router();
    let response = app
        .oneshot(http_request("GET", "/broken", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_incoming_request_id_is_kept() {
    let app = service(&settings("")).router();
    let mut request = http_request("GET", "/v1/ping", Body::empty());
    request.headers_mut().insert(X_REQUEST_ID, "abc-123".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
}

#[tokio::test]
async fn test_run_serves_on_configured_address() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let address = format!("127.0.0.1:{}", port);
    let server = tokio::spawn(service(&settings(&format!("[http]\nbind_address = \"{}\"\n", address))).run());

    let mut stream = None;
    for _ in 0..50 {
        match tokio::net::TcpStream::connect(&address).await {
            Ok(connected) => {
                stream = Some(connected);
                break;
            }
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
        }
    }
    let mut stream = stream.expect("server never accepted a connection");
    stream
        .write_all(b"GET /v1.5/ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {}", raw);
    assert!(raw.contains("pong 1.5"));
    server.abort();
}
