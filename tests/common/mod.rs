//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use frameroute::error::DispatchError;
use frameroute::http::{Request, Response};
use frameroute::predicates::{Captures, Predicate, PredicateConfig};
use frameroute::{ConfigResult, Configurator, ViewResult, ViewTarget};
use serde_json::Value;

/// Buffered request with an empty body.
pub fn request(method: &str, path: &str) -> Request {
    request_with_body(method, path, Bytes::new())
}

/// Buffered request carrying `body`.
pub fn request_with_body(method: &str, path: &str, body: impl Into<Bytes>) -> Request {
    axum::http::Request::builder()
        .method(method)
        .uri(path)
        .body(body.into())
        .unwrap()
}

/// Unbuffered request for the HTTP adapter.
pub fn http_request(method: &str, path: &str, body: impl Into<Body>) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(path)
        .body(body.into())
        .unwrap()
}

/// Plain view answering with a fixed text.
pub fn text_view(label: &'static str) -> ViewTarget {
    ViewTarget::function(label, move |_, _| Ok(ViewResult::from(label)))
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Evaluation log shared by [`FlagPredicate`]s.
pub type EvalLog = Arc<Mutex<Vec<String>>>;

/// Predicate with a fixed answer that records each evaluation.
///
/// Declared as `{"label": "P1", "pass": false}`.
#[derive(Debug)]
pub struct FlagPredicate {
    label: String,
    pass: bool,
    log: EvalLog,
}

impl Predicate for FlagPredicate {
    fn text(&self) -> String {
        format!("flag<{}>", self.label)
    }

    fn evaluate(&self, _captures: &Captures, _request: &Request) -> Result<bool, DispatchError> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(self.pass)
    }
}

/// Register flag predicates under each of `names`, all logging into `log`.
pub fn add_flag_predicates(config: &mut Configurator, names: &[&str], log: &EvalLog) -> ConfigResult<()> {
    for name in names {
        let log = log.clone();
        config.add_view_predicate(*name, move |value: &Value, _: &PredicateConfig| {
            Ok(Arc::new(FlagPredicate {
                label: value["label"].as_str().unwrap_or_default().to_string(),
                pass: value["pass"].as_bool().unwrap_or(false),
                log: log.clone(),
            }) as Arc<dyn Predicate>)
        })?;
    }
    Ok(())
}
