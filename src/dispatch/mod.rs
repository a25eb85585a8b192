//! Request dispatch over a frozen registry.
//!
//! # Data Flow
//! ```text
//! AppRegistry (frozen)
//!     → compile() (one Dispatcher per route, resource variants split out)
//!     → CompiledRoutes (anchored matchers, first match wins)
//!     → Dispatcher::dispatch
//!         → select (predicate chains, declaration order)
//!         → decode (typed captures)
//!         → handler → renderer
//! ```
//!
//! # Design Decisions
//! - Everything here is immutable once compiled; dispatch only allocates request-local state
//! - Not-found is an outcome, predicate errors propagate as `DispatchError`
//! - Handler results that are already responses skip the renderer

pub mod variant;

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::observability::metrics::{
    record_dispatch, OUTCOME_ERROR, OUTCOME_MATCHED, OUTCOME_NOT_FOUND,
};
use crate::predicates::Captures;
use crate::registry::AppRegistry;
use crate::routing::{PathMatcher, Route, RouteMatcher, Rule, Rules, SchemaDefinition, SchemaIdentifier};
use crate::views::{Captured, MatchContext, ViewResult};

pub use variant::ViewVariant;

/// Regex appended to resource routes so one pattern serves collection and item.
pub const ITEM_SUFFIX: &str = "(?:/(?P<pk>[^/.]+))?";

/// Result of a dispatch that did not fail.
#[derive(Debug)]
pub enum DispatchOutcome {
    Matched(Response),
    NotFound,
}

impl DispatchOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchOutcome::NotFound)
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            DispatchOutcome::Matched(response) => Some(response),
            DispatchOutcome::NotFound => None,
        }
    }
}

/// Which family of variants a dispatcher serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherKind {
    /// Plain and attribute-selected handlers.
    Views,
    /// Collection/item resources.
    Resource,
}

/// Selects and runs one variant of a route.
#[derive(Debug)]
pub struct Dispatcher {
    namespace: String,
    route_name: String,
    pattern: String,
    rules: Rules,
    extra: Option<Value>,
    schemas: IndexMap<SchemaIdentifier, SchemaDefinition>,
    variants: Vec<ViewVariant>,
    kind: DispatcherKind,
}

impl Dispatcher {
    pub fn new(namespace: impl Into<String>, route: &Route, variants: Vec<ViewVariant>, kind: DispatcherKind) -> Self {
        Self {
            namespace: namespace.into(),
            route_name: route.name.clone(),
            pattern: route.pattern.clone(),
            rules: route.rules.clone(),
            extra: route.extra.clone(),
            schemas: route.schemas.clone(),
            variants,
            kind,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn extra(&self) -> Option<&Value> {
        self.extra.as_ref()
    }

    pub fn schemas(&self) -> &IndexMap<SchemaIdentifier, SchemaDefinition> {
        &self.schemas
    }

    pub fn variants(&self) -> &[ViewVariant] {
        &self.variants
    }

    pub fn kind(&self) -> DispatcherKind {
        self.kind
    }

    /// Anchored matcher for this dispatcher's pattern.
    pub fn matcher(&self) -> ConfigResult<PathMatcher> {
        let suffix = match self.kind {
            DispatcherKind::Views => "",
            DispatcherKind::Resource => ITEM_SUFFIX,
        };
        PathMatcher::compile(&self.pattern, &self.rules, suffix)
    }

    /// First variant, in declaration order, whose whole chain accepts the request.
    pub fn select(&self, captures: &Captures, request: &Request) -> Result<Option<&ViewVariant>, DispatchError> {
        for variant in &self.variants {
            if variant.accepts(captures, request)? {
                return Ok(Some(variant));
            }
        }
        Ok(None)
    }

    /// Decode captures named in the route's rules; the rest stay raw.
    pub fn decode(&self, captures: &Captures) -> Result<MatchContext, DispatchError> {
        let mut context = MatchContext::new();
        for (name, raw) in captures {
            let value = match self.rules.get(name) {
                Some(Rule::Sum(sum)) => {
                    let variant = sum.match_value(raw).map_err(|e| DispatchError::Capture {
                        name: name.clone(),
                        reason: e.to_string(),
                    })?;
                    Captured::Variant {
                        sum: sum.clone(),
                        variant: variant.clone(),
                    }
                }
                _ => Captured::Raw(raw.clone()),
            };
            context.insert(name.clone(), value);
        }
        Ok(context)
    }

    /// Run the dispatch state machine for one request.
    pub fn dispatch(&self, request: &Request, captures: &Captures) -> Result<DispatchOutcome, DispatchError> {
        let start = Instant::now();
        let result = self.run(request, captures);
        let outcome = match &result {
            Ok(DispatchOutcome::Matched(_)) => OUTCOME_MATCHED,
            Ok(DispatchOutcome::NotFound) => {
                tracing::warn!(
                    namespace = %self.namespace,
                    route = %self.route_name,
                    method = %request.method(),
                    path = %request.uri().path(),
                    "No view variant accepted the request"
                );
                OUTCOME_NOT_FOUND
            }
            Err(e) => {
                tracing::debug!(route = %self.route_name, error = %e, "Dispatch failed");
                OUTCOME_ERROR
            }
        };
        record_dispatch(&self.namespace, &self.route_name, outcome, start);
        result
    }

    fn run(&self, request: &Request, captures: &Captures) -> Result<DispatchOutcome, DispatchError> {
        let Some(variant) = self.select(captures, request)? else {
            return Ok(DispatchOutcome::NotFound);
        };
        tracing::debug!(
            route = %self.route_name,
            handler = %variant.handler.name(),
            predicates = %variant.signature,
            "Variant selected"
        );

        let context = self.decode(captures)?;
        let response = match variant.handler.call(request, &context)? {
            ViewResult::Response(response) => response,
            result => variant.renderer.render(request, result)?,
        };
        Ok(DispatchOutcome::Matched(response))
    }
}

/// Build the dispatchers of one namespace, in route registration order.
pub fn compile(registry: &AppRegistry, namespace: &str) -> ConfigResult<Vec<Arc<Dispatcher>>> {
    let routes = registry
        .namespace(namespace)
        .ok_or_else(|| ConfigError::UnknownNamespace(namespace.to_string()))?;

    let mut dispatchers = Vec::new();
    for route in routes.values() {
        let (resources, views): (Vec<_>, Vec<_>) = route
            .views
            .iter()
            .map(ViewVariant::from_meta)
            .partition(ViewVariant::serves_items);

        if !views.is_empty() {
            dispatchers.push(Arc::new(Dispatcher::new(namespace, route, views, DispatcherKind::Views)));
        }
        if !resources.is_empty() {
            dispatchers.push(Arc::new(Dispatcher::new(
                namespace,
                route,
                resources,
                DispatcherKind::Resource,
            )));
        }
    }
    tracing::debug!(namespace = %namespace, dispatchers = dispatchers.len(), "Namespace compiled");
    Ok(dispatchers)
}

/// Path matchers bound to dispatchers.
#[derive(Debug, Default)]
pub struct CompiledRoutes {
    matcher: RouteMatcher<Arc<Dispatcher>>,
}

impl CompiledRoutes {
    /// Compile every listed namespace; earlier namespaces win on overlapping paths.
    pub fn new<I, S>(registry: &AppRegistry, namespaces: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = RouteMatcher::new();
        for namespace in namespaces {
            for dispatcher in compile(registry, namespace.as_ref())? {
                matcher.push(dispatcher.matcher()?, dispatcher);
            }
        }
        Ok(Self { matcher })
    }

    /// Compile all namespaces of the registry.
    pub fn from_registry(registry: &AppRegistry) -> ConfigResult<Self> {
        Self::new(registry, registry.routes().keys())
    }

    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// Dispatcher and raw captures for a path.
    pub fn resolve(&self, path: &str) -> Option<(&Arc<Dispatcher>, Captures)> {
        self.matcher.find(path)
    }

    /// Resolve by path then dispatch; an unmatched path is `NotFound`.
    pub fn dispatch(&self, request: &Request) -> Result<DispatchOutcome, DispatchError> {
        match self.resolve(request.uri().path()) {
            Some((dispatcher, captures)) => dispatcher.dispatch(request, &captures),
            None => Ok(DispatchOutcome::NotFound),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Dispatcher>> {
        self.matcher.iter().map(|(_, d)| d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::Configurator;
    use crate::routing::Scope;
    use crate::sums::SumType;
    use crate::views::{EndpointSpec, Resource, ViewTarget, ITEM_KEY};
    use axum::body::Bytes;
    use axum::http::StatusCode;

    fn request(method: &str, path: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    fn text(label: &'static str) -> ViewTarget {
        ViewTarget::function(label, move |_, _| Ok(ViewResult::from(label)))
    }

    fn registry(build: impl FnOnce(&mut Configurator, &Scope)) -> Arc<AppRegistry> {
        let mut config = Configurator::new();
        let scope = config.root_scope();
        build(&mut config, &scope);
        config.freeze().unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_method_selects_variant() {
        let registry = registry(|c, s| {
            c.add_route(s, "users", "/users").unwrap();
            c.add_endpoint(s, text("list"), EndpointSpec::new("users").request_method(["GET"]))
                .unwrap();
            c.add_endpoint(s, text("create"), EndpointSpec::new("users").request_method(["POST"]))
                .unwrap();
        });
        let routes = CompiledRoutes::from_registry(&registry).unwrap();

        let get = routes.dispatch(&request("GET", "/users")).unwrap();
        assert_eq!(body(get.into_response().unwrap()).await, "list");
        let post = routes.dispatch(&request("POST", "/users")).unwrap();
        assert_eq!(body(post.into_response().unwrap()).await, "create");
        let head = routes.dispatch(&request("HEAD", "/users")).unwrap();
        assert_eq!(body(head.into_response().unwrap()).await, "list");
        assert!(routes.dispatch(&request("DELETE", "/users")).unwrap().is_not_found());
    }

    #[test]
    fn test_unmatched_path_is_not_found() {
        let registry = registry(|c, s| {
            c.add_route(s, "home", "/").unwrap();
            c.add_endpoint(s, text("home"), EndpointSpec::new("home")).unwrap();
        });
        let routes = CompiledRoutes::from_registry(&registry).unwrap();
        assert!(routes.dispatch(&request("GET", "/missing")).unwrap().is_not_found());
        assert!(!routes.dispatch(&request("GET", "/")).unwrap().is_not_found());
    }

    #[test]
    fn test_response_result_passes_through() {
        let registry = registry(|c, s| {
            c.add_route(s, "raw", "/raw").unwrap();
            let target = ViewTarget::function("raw", |_, _| {
                Ok(ViewResult::Response(crate::http::response::status_text(
                    StatusCode::ACCEPTED,
                    "queued",
                )))
            });
            c.add_endpoint(s, target, EndpointSpec::new("raw").renderer("json")).unwrap();
        });
        let routes = CompiledRoutes::from_registry(&registry).unwrap();
        let response = routes.dispatch(&request("GET", "/raw")).unwrap().into_response().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_sum_capture_is_decoded() {
        let registry = registry(|c, s| {
            let color = SumType::builder("pkg.Color")
                .short_variant("RED")
                .short_variant("GREEN")
                .build()
                .unwrap();
            c.add_sum_type(color).unwrap();
            c.add_route(s, "paint", "/paint/{color:<pkg.Color>}").unwrap();
            let target = ViewTarget::function("paint", |_, ctx| {
                let variant = ctx.variant("color").map(|v| v.name.clone()).unwrap_or_default();
                Ok(ViewResult::Text(variant))
            });
            c.add_endpoint(s, target, EndpointSpec::new("paint")).unwrap();
        });
        let routes = CompiledRoutes::from_registry(&registry).unwrap();
        let (dispatcher, captures) = routes.resolve("/paint/green").unwrap();
        let context = dispatcher.decode(&captures).unwrap();
        assert_eq!(context.variant("color").unwrap().name, "GREEN");
        assert!(routes.resolve("/paint/blue").is_none());

        let mut bad = Captures::new();
        bad.insert("color".into(), "blue".into());
        assert!(matches!(dispatcher.decode(&bad), Err(DispatchError::Capture { .. })));
    }

    #[tokio::test]
    async fn test_resource_collection_and_item() {
        let registry = registry(|c, s| {
            c.add_route(s, "orders", "/orders").unwrap();
            let resource = Resource::new(
                "Orders",
                |_, _| Ok(ViewResult::from("all")),
                |_, ctx| Ok(ViewResult::Text(format!("order {}", ctx.raw(ITEM_KEY).unwrap_or("")))),
            );
            c.add_endpoint(s, ViewTarget::Resource(Arc::new(resource)), EndpointSpec::new("orders"))
                .unwrap();
        });
        let dispatchers = compile(&registry, crate::configurator::DEFAULT_NAMESPACE).unwrap();
        assert_eq!(dispatchers.len(), 1);
        assert_eq!(dispatchers[0].kind(), DispatcherKind::Resource);
        assert!(dispatchers[0].variants()[0].serves_items());

        let routes = CompiledRoutes::from_registry(&registry).unwrap();
        let all = routes.dispatch(&request("GET", "/orders")).unwrap();
        assert_eq!(body(all.into_response().unwrap()).await, "all");
        let one = routes.dispatch(&request("GET", "/orders/42")).unwrap();
        assert_eq!(body(one.into_response().unwrap()).await, "order 42");
    }

    #[test]
    fn test_compile_unknown_namespace() {
        let registry = registry(|_, _| {});
        assert!(matches!(
            compile(&registry, "nowhere"),
            Err(ConfigError::UnknownNamespace(_))
        ));
    }
}
