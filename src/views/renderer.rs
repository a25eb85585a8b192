//! Result renderers.
//!
//! # Responsibilities
//! - Turn a handler's non-response result into an HTTP response
//! - Keep the named renderer registry consulted at view registration
//!
//! # Design Decisions
//! - `json` and `string` are built in
//! - A name with an extension (`users.json`) resolves by the text after the last `.`

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use super::ViewResult;
use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::Request;
use crate::http::response::{with_body, Response};

/// Produces a response from a handler result.
pub trait Renderer: Send + Sync + fmt::Debug {
    fn render(&self, request: &Request, result: ViewResult) -> Result<Response, DispatchError>;
}

/// Serializes results as `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, _request: &Request, result: ViewResult) -> Result<Response, DispatchError> {
        let body = match result {
            ViewResult::Response(response) => return Ok(response),
            ViewResult::Json(value) => serde_json::to_vec(&value),
            ViewResult::Text(text) => serde_json::to_vec(&text),
        }
        .map_err(|e| DispatchError::Render(e.to_string()))?;
        Ok(with_body(StatusCode::OK, "application/json; charset=utf-8", body))
    }
}

/// Writes results as `text/plain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringRenderer;

impl Renderer for StringRenderer {
    fn render(&self, _request: &Request, result: ViewResult) -> Result<Response, DispatchError> {
        let body = match result {
            ViewResult::Response(response) => return Ok(response),
            ViewResult::Text(text) => text,
            ViewResult::Json(serde_json::Value::String(text)) => text,
            ViewResult::Json(value) => value.to_string(),
        };
        Ok(with_body(StatusCode::OK, "text/plain; charset=utf-8", body))
    }
}

/// Named renderers available to view registration.
#[derive(Debug, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self {
            renderers: HashMap::new(),
        };
        registry.add_renderer("json", Arc::new(JsonRenderer));
        registry.add_renderer("string", Arc::new(StringRenderer));
        registry
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_renderer(&mut self, name: impl Into<String>, renderer: Arc<dyn Renderer>) {
        let name = name.into();
        tracing::debug!(renderer = %name, "Renderer registered");
        self.renderers.insert(name, renderer);
    }

    /// Look up a renderer by name or by the extension of a file-like name.
    pub fn get(&self, name: &str) -> ConfigResult<Arc<dyn Renderer>> {
        let key = match name.rfind('.') {
            Some(dot) => &name[dot + 1..],
            None => name,
        };
        self.renderers
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRenderer(key.to_string()))
    }
}
