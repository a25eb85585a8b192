//! Configuration phase.
//!
//! # Data Flow
//! ```text
//! Configurator::new / from_config
//!     → include(scope, Include)  runs unit entry points in a nested Scope
//!     → scan(scope, Scan)        runs declaration callbacks, then consistency checks
//!     → freeze()                 → Arc<AppRegistry>
//! ```
//!
//! # Design Decisions
//! - Single-threaded and run to completion before any dispatch
//! - Scope is an immutable value passed down; nothing to restore on error paths
//! - After `freeze`, every mutating call fails with `AlreadyFrozen`

pub mod scanner;
pub mod unit;

use std::mem;
use std::sync::Arc;

use serde_json::Value;

use crate::config::FrameConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::http::request::ApiVersion;
use crate::predicates::{Predicate, PredicateConfig};
use crate::registry::AppRegistry;
use crate::routing::{normalize, Route, RouteTable, SchemaDefinition, Scope};
use crate::sums::{SumType, SumTypeRegistry, TermImpl};
use crate::views::{EndpointSpec, Renderer, RendererRegistry, ViewRegistry, ViewTarget};

pub use scanner::{
    default_ignores, ignore_rules, Callback, Declaration, Ignore, Scan, Scanner, DEFAULT_CATEGORY,
};
pub use unit::{ConfigUnit, EntryPoint, UnitDeclaration, DEFAULT_ENTRY_POINT};

/// Namespace used when nothing else is configured.
pub const DEFAULT_NAMESPACE: &str = "frameroute";

/// Documentation recorded for schemas declared without any.
pub const MISSING_DOC: &str = "DOCSTRING NOT SPECIFIED";

/// Options of one `Configurator::include` call.
#[derive(Debug, Clone)]
pub struct Include {
    pub target: String,
    pub entry_point: Option<String>,
    pub route_prefix: Option<String>,
    pub namespace: Option<String>,
}

impl Include {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            entry_point: None,
            route_prefix: None,
            namespace: None,
        }
    }

    pub fn entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Mutable builder for the application registry.
#[derive(Debug)]
pub struct Configurator {
    routes: RouteTable,
    views: ViewRegistry,
    renderers: RendererRegistry,
    sums: SumTypeRegistry,
    units: Vec<ConfigUnit>,
    declarations: Vec<Declaration>,
    root: Scope,
    ignore: Vec<Ignore>,
    categories: Option<Vec<String>>,
    frozen: bool,
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurator {
    pub fn new() -> Self {
        Self::with_predicate_config(PredicateConfig::default())
    }

    pub fn with_predicate_config(config: PredicateConfig) -> Self {
        let mut routes = RouteTable::new();
        routes.ensure_namespace(DEFAULT_NAMESPACE);
        Self {
            routes,
            views: ViewRegistry::new(config),
            renderers: RendererRegistry::new(),
            sums: SumTypeRegistry::new(),
            units: Vec::new(),
            declarations: Vec::new(),
            root: Scope::new(DEFAULT_NAMESPACE, "/"),
            ignore: default_ignores(),
            categories: None,
            frozen: false,
        }
    }

    /// Builder set up from a settings file, with its declarative routes registered.
    pub fn from_config(config: &FrameConfig) -> ConfigResult<Self> {
        let default_api_version = config
            .api
            .default_version
            .parse::<ApiVersion>()
            .map_err(|e| ConfigError::InvalidPredicateValue {
                name: "api_version".into(),
                reason: e.to_string(),
            })?;
        let predicates = PredicateConfig {
            schema_root: config.schemas.root.clone(),
            default_api_version,
            version_clauses: config.api.version_clauses,
            ..PredicateConfig::default()
        };

        let mut configurator = Self::with_predicate_config(predicates);
        configurator.root = Scope::new(
            config.routing.default_namespace.clone(),
            config.routing.root_prefix.clone(),
        );
        configurator.routes.ensure_namespace(&config.routing.default_namespace);
        configurator.ignore = ignore_rules(&config.scan.ignore)?;
        configurator.categories = config.scan.categories.clone();

        let root = configurator.root.clone();
        for route in &config.routes {
            let scope = match &route.namespace {
                Some(namespace) => root.with_namespace(namespace.clone()),
                None => root.clone(),
            };
            configurator.add_route_with(&scope, &route.name, &route.pattern, route.extra.clone())?;
        }
        tracing::debug!(routes = config.routes.len(), "Configurator created from settings");
        Ok(configurator)
    }

    /// Scope at the root of the configuration tree.
    pub fn root_scope(&self) -> Scope {
        self.root.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_mutable(&self) -> ConfigResult<()> {
        if self.frozen {
            return Err(ConfigError::AlreadyFrozen);
        }
        Ok(())
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn sums(&self) -> &SumTypeRegistry {
        &self.sums
    }

    pub fn add_renderer(&mut self, name: impl Into<String>, renderer: Arc<dyn Renderer>) -> ConfigResult<()> {
        self.ensure_mutable()?;
        self.renderers.add_renderer(name, renderer);
        Ok(())
    }

    pub fn add_view_predicate<F>(&mut self, name: impl Into<String>, factory: F) -> ConfigResult<()>
    where
        F: Fn(&Value, &PredicateConfig) -> ConfigResult<Arc<dyn Predicate>> + Send + Sync + 'static,
    {
        self.ensure_mutable()?;
        self.views.add_view_predicate(name, factory);
        Ok(())
    }

    pub fn add_sum_type(&mut self, sum: SumType) -> ConfigResult<Arc<SumType>> {
        self.ensure_mutable()?;
        self.sums.register(sum)
    }

    /// Bind an implementation to a contract term of a sum type variant.
    pub fn bind_variant(
        &mut self,
        path: &str,
        variant: &str,
        term: &str,
        implementation: TermImpl,
    ) -> ConfigResult<()> {
        self.ensure_mutable()?;
        self.sums.bind(path, variant, term, implementation)
    }

    pub fn register_unit(&mut self, unit: ConfigUnit) -> ConfigResult<()> {
        self.ensure_mutable()?;
        tracing::debug!(unit = unit.path(), "Configuration unit registered");
        self.units.push(unit);
        Ok(())
    }

    /// Add a declaration alongside the ones collected at link time.
    pub fn declare(&mut self, declaration: Declaration) -> ConfigResult<()> {
        self.ensure_mutable()?;
        self.declarations.push(declaration);
        Ok(())
    }

    pub fn add_route(&mut self, scope: &Scope, name: &str, pattern: &str) -> ConfigResult<&Route> {
        self.add_route_with(scope, name, pattern, None)
    }

    /// Register a route with opaque extra metadata.
    pub fn add_route_with(
        &mut self,
        scope: &Scope,
        name: &str,
        pattern: &str,
        extra: Option<Value>,
    ) -> ConfigResult<&Route> {
        self.ensure_mutable()?;
        let (pattern, rules) = normalize(pattern, &self.sums)?;
        self.routes.add_route(scope, name, &pattern, rules, extra)
    }

    /// Register a view for a route of the scope's namespace.
    pub fn add_endpoint(&mut self, scope: &Scope, target: ViewTarget, spec: EndpointSpec) -> ConfigResult<()> {
        self.ensure_mutable()?;
        let spec = match target.defaults() {
            Some(defaults) => spec.with_defaults(defaults),
            None => spec,
        };
        let meta = self.views.add_view(target, &spec, &self.renderers)?;

        if self.routes.namespace(scope.namespace()).is_none() {
            return Err(ConfigError::UnknownNamespace(scope.namespace().to_string()));
        }
        if self.routes.route(scope.namespace(), &meta.route_name).is_none() {
            return Err(ConfigError::UnknownRoute {
                namespace: scope.namespace().to_string(),
                name: meta.route_name.clone(),
            });
        }

        if spec.documents_schema() {
            let definition = SchemaDefinition {
                input_serializer: spec.input_serializer.clone(),
                output_serializer: spec.output_serializer.clone(),
                input_schema: spec.input_schema.clone(),
                output_schema: spec.output_schema.clone(),
                doc: spec.doc.clone().unwrap_or_else(|| MISSING_DOC.to_string()),
            };
            self.routes.add_schema(
                scope,
                &meta.route_name,
                spec.methods(),
                spec.api_version.clone(),
                definition,
            )?;
        }
        self.routes.add_view(scope, meta)
    }

    fn resolve_unit(&self, target: &str) -> ConfigResult<ConfigUnit> {
        let mut found: Option<ConfigUnit> = None;
        let linked = inventory::iter::<UnitDeclaration>
            .into_iter()
            .filter(|d| d.path == target)
            .map(|d| d.to_unit());
        for unit in self.units.iter().filter(|u| u.path() == target).cloned().chain(linked) {
            match found.as_mut() {
                Some(existing) => existing.merge(unit),
                None => found = Some(unit),
            }
        }
        found.ok_or_else(|| ConfigError::UnknownUnit(target.to_string()))
    }

    /// Run an entry point of a configuration unit in a nested scope.
    pub fn include(&mut self, scope: &Scope, include: Include) -> ConfigResult<()> {
        self.ensure_mutable()?;
        let unit = self.resolve_unit(&include.target)?;
        let entry_name = include.entry_point.as_deref().unwrap_or(DEFAULT_ENTRY_POINT);

        let entry = unit.get(entry_name).ok_or_else(|| ConfigError::MissingEntryPoint {
            unit: unit.path().to_string(),
            entry_point: entry_name.to_string(),
        })?;
        if unit.source_file().is_none() {
            return Err(ConfigError::NoSourceOrigin(unit.path().to_string()));
        }

        let namespace = include
            .namespace
            .clone()
            .unwrap_or_else(|| unit.package().to_string());
        let nested = scope.nested(include.route_prefix.as_deref(), namespace);
        self.routes.ensure_namespace(nested.namespace());

        tracing::debug!(
            unit = %include.target,
            entry_point = entry_name,
            namespace = nested.namespace(),
            prefix = nested.prefix(),
            "Including configuration unit"
        );
        entry(self, &nested)?;
        tracing::debug!(unit = %include.target, entry_point = entry_name, "Included configuration unit");
        Ok(())
    }

    /// Run every declaration under `scan.package`, then check the namespace.
    pub fn scan(&mut self, scope: &Scope, scan: Scan) -> ConfigResult<()> {
        self.ensure_mutable()?;
        let namespace = scan.namespace.clone().unwrap_or_else(|| scan.package.clone());
        let scoped = scope.with_namespace(namespace);
        self.routes.ensure_namespace(scoped.namespace());

        let ignore = scan.ignore.as_deref().unwrap_or(&self.ignore);
        let categories = scan.categories.as_deref().or(self.categories.as_deref());
        let candidates = self
            .declarations
            .iter()
            .copied()
            .chain(inventory::iter::<Declaration>.into_iter().copied());
        let selected = scanner::select(candidates, &scan.package, categories, ignore);

        tracing::debug!(
            package = %scan.package,
            namespace = scoped.namespace(),
            declarations = selected.len(),
            "Scanning"
        );
        for declaration in &selected {
            tracing::debug!(
                module = declaration.module_path,
                name = declaration.name,
                "Running declaration callback"
            );
            let mut scanner = Scanner::new(self, scoped.clone());
            (declaration.callback)(&mut scanner, declaration.name)?;
        }

        self.routes.check_consistency(scoped.namespace())?;
        self.sums.check_consistency()?;
        tracing::debug!(package = %scan.package, "End scanning");
        Ok(())
    }

    /// Produce the immutable registry. Can only happen once.
    pub fn freeze(&mut self) -> ConfigResult<Arc<AppRegistry>> {
        self.ensure_mutable()?;
        self.frozen = true;
        let routes = mem::take(&mut self.routes).into_namespaces();
        let sums = mem::take(&mut self.sums).into_meta();
        tracing::info!(
            namespaces = routes.len(),
            routes = routes.values().map(|ns| ns.len()).sum::<usize>(),
            sum_types = sums.len(),
            "Registry frozen"
        );
        Ok(Arc::new(AppRegistry::new(routes, sums)))
    }
}
