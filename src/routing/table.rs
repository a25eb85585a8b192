//! Namespace-scoped route table.
//!
//! # Responsibilities
//! - Hold routes per namespace, keyed by name, in registration order
//! - Compose patterns with the active route prefix
//! - Attach views and schema definitions to routes
//! - Check that every route ended up with a view
//!
//! # Design Decisions
//! - The active namespace and prefix travel as an immutable `Scope` value
//! - Namespaces are never merged; every lookup is `(namespace, name)`

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::pattern::Rules;
use crate::error::{ConfigError, ConfigResult};
use crate::views::ViewMeta;

/// Active namespace and route prefix of a configuration step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    namespace: String,
    prefix: String,
}

impl Scope {
    pub fn new(namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Scope for an included unit: the prefix is appended, the namespace replaced.
    pub fn nested(&self, route_prefix: Option<&str>, namespace: impl Into<String>) -> Scope {
        let tail = route_prefix.unwrap_or("");
        Scope {
            namespace: namespace.into(),
            prefix: format!(
                "{}/{}",
                self.prefix.trim_end_matches('/'),
                tail.trim_start_matches('/')
            ),
        }
    }

    /// Same prefix under another namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Scope {
        Scope {
            namespace: namespace.into(),
            prefix: self.prefix.clone(),
        }
    }
}

/// Join a route prefix and a pattern like filesystem paths.
///
/// The result always starts with `/`; two empty halves give `/`.
pub fn join_prefix(prefix: &str, pattern: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        pattern.trim_start_matches('/')
    )
}

/// Key of a schema definition on a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaIdentifier {
    pub request_method: Vec<String>,
    pub route_name: String,
    pub api_version: Option<Vec<String>>,
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SchemaIdentifier(request_method=({}), route_name={}, api_version={})",
            self.request_method.join(","),
            self.route_name,
            self.api_version
                .as_ref()
                .map_or_else(|| "None".to_string(), |v| v.join("|"))
        )
    }
}

/// Documentation-only description of an endpoint's payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    pub input_serializer: Option<Value>,
    pub output_serializer: Option<Value>,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub doc: String,
}

/// A named route and everything registered against it.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub pattern: String,
    pub rules: Rules,
    pub extra: Option<Value>,
    pub views: Vec<ViewMeta>,
    pub schemas: IndexMap<SchemaIdentifier, SchemaDefinition>,
}

/// Routes of one namespace.
pub type Namespace = IndexMap<String, Route>;

/// Build-phase route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    namespaces: IndexMap<String, Namespace>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a namespace exists, even if nothing is registered in it yet.
    pub fn ensure_namespace(&mut self, namespace: &str) {
        if !self.namespaces.contains_key(namespace) {
            tracing::debug!(namespace, "Namespace opened");
            self.namespaces.insert(namespace.to_string(), Namespace::new());
        }
    }

    pub fn namespace(&self, namespace: &str) -> Option<&Namespace> {
        self.namespaces.get(namespace)
    }

    pub fn route(&self, namespace: &str, name: &str) -> Option<&Route> {
        self.namespaces.get(namespace)?.get(name)
    }

    fn route_mut(&mut self, scope: &Scope, name: &str) -> ConfigResult<&mut Route> {
        self.namespaces
            .get_mut(scope.namespace())
            .ok_or_else(|| ConfigError::UnknownNamespace(scope.namespace().to_string()))?
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownRoute {
                namespace: scope.namespace().to_string(),
                name: name.to_string(),
            })
    }

    /// Register a route under the scope's namespace; the pattern gets the scope's prefix.
    pub fn add_route(
        &mut self,
        scope: &Scope,
        name: &str,
        pattern: &str,
        rules: Rules,
        extra: Option<Value>,
    ) -> ConfigResult<&Route> {
        let pattern = join_prefix(scope.prefix(), pattern);
        self.ensure_namespace(scope.namespace());
        let routes = self
            .namespaces
            .get_mut(scope.namespace())
            .ok_or_else(|| ConfigError::UnknownNamespace(scope.namespace().to_string()))?;

        if routes.contains_key(name) {
            return Err(ConfigError::DuplicateRoute {
                namespace: scope.namespace().to_string(),
                name: name.to_string(),
            });
        }

        tracing::debug!(
            pattern = %pattern,
            route = name,
            namespace = scope.namespace(),
            "Registering route"
        );
        let route = Route {
            name: name.to_string(),
            pattern,
            rules,
            extra,
            views: Vec::new(),
            schemas: IndexMap::new(),
        };
        Ok(routes.entry(name.to_string()).or_insert(route))
    }

    /// Append a view to the route it names.
    pub fn add_view(&mut self, scope: &Scope, meta: ViewMeta) -> ConfigResult<()> {
        let route = self.route_mut(scope, &meta.route_name)?;
        route.views.push(meta);
        Ok(())
    }

    /// Record a schema definition under `(methods, route, api_version)`.
    pub fn add_schema(
        &mut self,
        scope: &Scope,
        route_name: &str,
        request_method: Vec<String>,
        api_version: Option<Vec<String>>,
        definition: SchemaDefinition,
    ) -> ConfigResult<()> {
        let route = self.route_mut(scope, route_name)?;
        let id = SchemaIdentifier {
            request_method,
            route_name: route_name.to_string(),
            api_version,
        };
        if route.schemas.contains_key(&id) {
            return Err(ConfigError::DuplicateSchema(id.to_string()));
        }
        tracing::debug!(schema = %id, "Adding schema definition");
        route.schemas.insert(id, definition);
        Ok(())
    }

    /// Every route of `namespace` must have at least one view.
    pub fn check_consistency(&self, namespace: &str) -> ConfigResult<()> {
        tracing::debug!(namespace, "Checking routes consistency");
        let Some(routes) = self.namespaces.get(namespace) else {
            return Ok(());
        };
        match routes.values().find(|route| route.views.is_empty()) {
            Some(route) => Err(ConfigError::RouteWithoutView {
                namespace: namespace.to_string(),
                name: route.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Consume the table into its namespaces.
    pub fn into_namespaces(self) -> IndexMap<String, Namespace> {
        self.namespaces
    }
}
