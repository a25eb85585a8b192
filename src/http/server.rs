//! HTTP adapter over compiled dispatchers.
//!
//! # Responsibilities
//! - Create Axum Router with a single fallback handler
//! - Wire up middleware (request ID, tracing)
//! - Buffer request bodies up to the configured limit
//! - Resolve the API version and enforce the minimum
//! - Map dispatch outcomes and errors to status codes
//! - Bind server to listener with graceful shutdown

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request as IncomingRequest, State},
    http::StatusCode,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::FrameConfig;
use crate::dispatch::{CompiledRoutes, DispatchOutcome};
use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::{request_id, ApiVersion, Request, UuidRequestId};
use crate::http::response::{status_text, Response};
use crate::registry::AppRegistry;

/// Capture name the adapter reads the API version from.
pub const VERSION_CAPTURE: &str = "version";

/// Adapter settings taken from `[api]` and `[http]`.
#[derive(Debug, Clone)]
struct AdapterSettings {
    default_version: ApiVersion,
    min_version: Option<ApiVersion>,
    max_body_bytes: usize,
    bind_address: String,
}

impl AdapterSettings {
    fn from_config(config: &FrameConfig) -> ConfigResult<Self> {
        let parse = |text: &str| {
            text.parse::<ApiVersion>().map_err(|e| ConfigError::InvalidPredicateValue {
                name: "api_version".into(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            default_version: parse(&config.api.default_version)?,
            min_version: config.api.min_version.as_deref().map(parse).transpose()?,
            max_body_bytes: config.http.max_body_bytes,
            bind_address: config.http.bind_address.clone(),
        })
    }
}

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    routes: Arc<CompiledRoutes>,
    settings: Arc<AdapterSettings>,
}

/// Serves a frozen registry over HTTP.
#[derive(Clone)]
pub struct AppService {
    state: AppState,
}

impl AppService {
    /// Compile every namespace of `registry` and apply the adapter settings of `config`.
    pub fn new(registry: &AppRegistry, config: &FrameConfig) -> ConfigResult<Self> {
        Self::from_routes(CompiledRoutes::from_registry(registry)?, config)
    }

    pub fn from_routes(routes: CompiledRoutes, config: &FrameConfig) -> ConfigResult<Self> {
        let settings = AdapterSettings::from_config(config)?;
        tracing::info!(
            dispatchers = routes.len(),
            default_version = %settings.default_version,
            "HTTP adapter ready"
        );
        Ok(Self {
            state: AppState {
                routes: Arc::new(routes),
                settings: Arc::new(settings),
            },
        })
    }

    pub fn routes(&self) -> &CompiledRoutes {
        &self.state.routes
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new().fallback(dispatch_handler).with_state(self.state.clone()).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Bind `[http] bind_address` and serve until shutdown.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(&self.state.settings.bind_address).await?;
        self.serve(listener).await
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffers the body, resolves the route, and dispatches.
async fn dispatch_handler(State(state): State<AppState>, request: IncomingRequest) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.settings.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Request body rejected");
            return status_text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };
    let mut request = Request::from_parts(parts, bytes);
    let request_id = request_id(&request).to_string();
    let path = request.uri().path().to_string();

    let Some((dispatcher, captures)) = state.routes.resolve(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        return status_text(StatusCode::NOT_FOUND, "Not Found");
    };

    let version = match captures.get(VERSION_CAPTURE) {
        Some(raw) => match raw.parse::<ApiVersion>() {
            Ok(version) => version,
            Err(e) => return status_text(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => state.settings.default_version.clone(),
    };
    if let Some(min) = &state.settings.min_version {
        if &version < min {
            tracing::debug!(request_id = %request_id, version = %version, "API version retired");
            return status_text(StatusCode::GONE, format!("API version {} is no longer supported", version));
        }
    }
    request.extensions_mut().insert(version);

    let response = match dispatcher.dispatch(&request, &captures) {
        Ok(DispatchOutcome::Matched(response)) => response,
        Ok(DispatchOutcome::NotFound) => status_text(StatusCode::NOT_FOUND, "Not Found"),
        Err(e) => error_response(&request_id, e),
    };
    tracing::debug!(
        request_id = %request_id,
        route = %dispatcher.route_name(),
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request dispatched"
    );
    response
}

fn error_response(request_id: &str, error: DispatchError) -> Response {
    match error {
        DispatchError::Validation(_) | DispatchError::Capture { .. } => {
            tracing::debug!(request_id = %request_id, error = %error, "Request rejected");
            status_text(StatusCode::BAD_REQUEST, error.to_string())
        }
        _ => {
            tracing::error!(request_id = %request_id, error = %error, "Dispatch error");
            status_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
