//! View declarations and view metadata.
//!
//! # Data Flow
//! ```text
//! ViewTarget + EndpointSpec
//!     → ViewRegistry::add_view (shape, attribute, decorators, predicates, renderer)
//!     → ViewMeta appended to its Route
//!     → dispatch::compile turns ViewMeta into a ViewVariant
//! ```
//!
//! # Design Decisions
//! - Handler shape is a closed enum chosen once at registration
//! - Class views resolve their attribute at registration; a missing attribute is an error
//! - Decorators compose outer-to-inner in the order given

pub mod renderer;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::predicates::{Predicate, PredicateConfig, PredicateList};
use crate::sums::{SumType, SumVariant};

pub use renderer::{JsonRenderer, Renderer, RendererRegistry, StringRenderer};

/// Attribute selected on class views when none is declared.
pub const DEFAULT_ATTR: &str = "call";

/// Request methods admitted when a declaration names none.
pub const DEFAULT_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"];

/// Renderer used when a declaration names none.
pub const DEFAULT_RENDERER: &str = "string";

/// Capture name that selects the item handler of a resource.
pub const ITEM_KEY: &str = "pk";

/// What a handler returns.
#[derive(Debug)]
pub enum ViewResult {
    /// A complete response, passed through without rendering.
    Response(Response),
    /// Structured data for the variant's renderer.
    Json(Value),
    /// Text for the variant's renderer.
    Text(String),
}

impl From<Response> for ViewResult {
    fn from(response: Response) -> Self {
        ViewResult::Response(response)
    }
}

impl From<Value> for ViewResult {
    fn from(value: Value) -> Self {
        ViewResult::Json(value)
    }
}

impl From<String> for ViewResult {
    fn from(text: String) -> Self {
        ViewResult::Text(text)
    }
}

impl From<&str> for ViewResult {
    fn from(text: &str) -> Self {
        ViewResult::Text(text.to_string())
    }
}

/// One decoded path capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Raw(String),
    Variant {
        sum: Arc<SumType>,
        variant: SumVariant,
    },
}

/// Decoded captures handed to the selected handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    captures: IndexMap<String, Captured>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Captured) {
        self.captures.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Captured> {
        self.captures.get(name)
    }

    /// Text of a capture; for typed captures this is the variant's value.
    pub fn raw(&self, name: &str) -> Option<&str> {
        match self.captures.get(name)? {
            Captured::Raw(text) => Some(text),
            Captured::Variant { variant, .. } => Some(&variant.value),
        }
    }

    pub fn variant(&self, name: &str) -> Option<&SumVariant> {
        match self.captures.get(name)? {
            Captured::Variant { variant, .. } => Some(variant),
            Captured::Raw(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Captured)> {
        self.captures.iter()
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}

/// Callable behind every handler.
pub type HandlerFn =
    Arc<dyn Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync>;

/// A named, directly callable handler.
#[derive(Clone)]
pub struct Handler {
    name: String,
    func: HandlerFn,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn from_fn(name: impl Into<String>, func: HandlerFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, request: &Request, context: &MatchContext) -> Result<ViewResult, DispatchError> {
        (self.func)(request, context)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.name)
    }
}

/// Wraps a handler into another handler.
pub type Decorator = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Compose decorators so that the first one given is the outermost.
pub fn compose(decorators: &[Decorator]) -> Option<Decorator> {
    match decorators {
        [] => None,
        [single] => Some(single.clone()),
        many => {
            let chain: Vec<Decorator> = many.to_vec();
            Some(Arc::new(move |handler: Handler| {
                chain.iter().rev().fold(handler, |inner, decorate| decorate(inner))
            }))
        }
    }
}

/// A handler object exposing several named methods.
pub struct ClassView {
    name: String,
    methods: IndexMap<String, HandlerFn>,
    defaults: EndpointSpec,
}

impl ClassView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
            defaults: EndpointSpec::default(),
        }
    }

    pub fn method<F>(mut self, attr: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync + 'static,
    {
        self.methods.insert(attr.into(), Arc::new(func));
        self
    }

    /// Options applied to every endpoint declared on this class.
    pub fn with_defaults(mut self, defaults: EndpointSpec) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &EndpointSpec {
        &self.defaults
    }

    /// Resolve one method as a standalone handler.
    pub fn attribute(&self, attr: &str) -> Option<Handler> {
        self.methods
            .get(attr)
            .map(|func| Handler::from_fn(format!("{}.{}", self.name, attr), func.clone()))
    }
}

impl fmt::Debug for ClassView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassView")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collection/item handler pair served under one route.
pub struct Resource {
    name: String,
    collection: HandlerFn,
    item: HandlerFn,
}

impl Resource {
    pub fn new<C, I>(name: impl Into<String>, collection: C, item: I) -> Self
    where
        C: Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync + 'static,
        I: Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            collection: Arc::new(collection),
            item: Arc::new(item),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler choosing the item side when an item key was captured.
    pub fn handler(&self) -> Handler {
        let collection = self.collection.clone();
        let item = self.item.clone();
        Handler::new(self.name.clone(), move |request, context| {
            match context.raw(ITEM_KEY) {
                Some(key) if !key.is_empty() => item(request, context),
                _ => collection(request, context),
            }
        })
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.name)
    }
}

/// The object an endpoint is declared on.
#[derive(Debug, Clone)]
pub enum ViewTarget {
    Function(Handler),
    Class(Arc<ClassView>),
    Resource(Arc<Resource>),
}

impl ViewTarget {
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Request, &MatchContext) -> Result<ViewResult, DispatchError> + Send + Sync + 'static,
    {
        ViewTarget::Function(Handler::new(name, func))
    }

    pub fn name(&self) -> &str {
        match self {
            ViewTarget::Function(handler) => handler.name(),
            ViewTarget::Class(class) => class.name(),
            ViewTarget::Resource(resource) => resource.name(),
        }
    }

    pub fn shape(&self) -> HandlerShape {
        match self {
            ViewTarget::Function(_) => HandlerShape::Plain,
            ViewTarget::Class(_) => HandlerShape::AttributeSelected,
            ViewTarget::Resource(_) => HandlerShape::CollectionResource,
        }
    }

    /// Class-level endpoint defaults, if any.
    pub fn defaults(&self) -> Option<&EndpointSpec> {
        match self {
            ViewTarget::Class(class) => Some(class.defaults()),
            _ => None,
        }
    }
}

/// How a registered view is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    Plain,
    AttributeSelected,
    CollectionResource,
}

/// Options of one endpoint declaration.
#[derive(Clone, Default)]
pub struct EndpointSpec {
    pub route_name: Option<String>,
    pub request_method: Option<Vec<String>>,
    pub attr: Option<String>,
    pub renderer: Option<String>,
    pub decorators: Vec<Decorator>,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub input_serializer: Option<Value>,
    pub output_serializer: Option<Value>,
    pub api_version: Option<Vec<String>>,
    pub doc: Option<String>,
    /// Values for additional registered view predicates.
    pub predicates: IndexMap<String, Value>,
}

impl EndpointSpec {
    pub fn new(route_name: impl Into<String>) -> Self {
        Self {
            route_name: Some(route_name.into()),
            ..Self::default()
        }
    }

    pub fn request_method<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_method = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(renderer.into());
        self
    }

    pub fn decorator<F>(mut self, decorator: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn input_schema(mut self, schema: impl Into<Value>) -> Self {
        self.input_schema = Some(schema.into());
        self
    }

    pub fn output_schema(mut self, schema: impl Into<Value>) -> Self {
        self.output_schema = Some(schema.into());
        self
    }

    pub fn input_serializer(mut self, serializer: impl Into<Value>) -> Self {
        self.input_serializer = Some(serializer.into());
        self
    }

    pub fn output_serializer(mut self, serializer: impl Into<Value>) -> Self {
        self.output_serializer = Some(serializer.into());
        self
    }

    pub fn api_version<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_version = Some(expressions.into_iter().map(Into::into).collect());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn predicate(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(name.into(), value.into());
        self
    }

    /// Fill every unset option from `defaults`.
    pub fn with_defaults(&self, defaults: &EndpointSpec) -> EndpointSpec {
        let mut predicates = defaults.predicates.clone();
        predicates.extend(self.predicates.iter().map(|(k, v)| (k.clone(), v.clone())));
        EndpointSpec {
            route_name: self.route_name.clone().or_else(|| defaults.route_name.clone()),
            request_method: self.request_method.clone().or_else(|| defaults.request_method.clone()),
            attr: self.attr.clone().or_else(|| defaults.attr.clone()),
            renderer: self.renderer.clone().or_else(|| defaults.renderer.clone()),
            decorators: if self.decorators.is_empty() {
                defaults.decorators.clone()
            } else {
                self.decorators.clone()
            },
            input_schema: self.input_schema.clone().or_else(|| defaults.input_schema.clone()),
            output_schema: self.output_schema.clone().or_else(|| defaults.output_schema.clone()),
            input_serializer: self.input_serializer.clone().or_else(|| defaults.input_serializer.clone()),
            output_serializer: self.output_serializer.clone().or_else(|| defaults.output_serializer.clone()),
            api_version: self.api_version.clone().or_else(|| defaults.api_version.clone()),
            doc: self.doc.clone().or_else(|| defaults.doc.clone()),
            predicates,
        }
    }

    /// Declared methods, or the full default set.
    pub fn methods(&self) -> Vec<String> {
        match &self.request_method {
            Some(methods) => methods.clone(),
            None => DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// True when any option feeding schema documentation is set.
    pub fn documents_schema(&self) -> bool {
        self.input_schema.is_some()
            || self.output_schema.is_some()
            || self.input_serializer.is_some()
            || self.output_serializer.is_some()
            || self.api_version.is_some()
    }

    /// Keyword values handed to the predicate chain builder.
    fn predicate_values(&self) -> IndexMap<String, Value> {
        let mut values = self.predicates.clone();
        values.insert("request_method".into(), Value::from(self.methods()));
        if let Some(versions) = &self.api_version {
            values.insert("api_version".into(), Value::from(versions.clone()));
        }
        if let Some(serializer) = &self.output_serializer {
            values.insert("output_serializer".into(), serializer.clone());
        }
        if let Some(schema) = &self.input_schema {
            values.insert("input_schema".into(), schema.clone());
        }
        if let Some(schema) = &self.output_schema {
            values.insert("output_schema".into(), schema.clone());
        }
        values
    }
}

impl fmt::Debug for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSpec")
            .field("route_name", &self.route_name)
            .field("request_method", &self.request_method)
            .field("attr", &self.attr)
            .field("renderer", &self.renderer)
            .field("decorators", &self.decorators.len())
            .field("api_version", &self.api_version)
            .field("predicates", &self.predicates)
            .finish_non_exhaustive()
    }
}

/// Registration record of one endpoint on a route.
#[derive(Clone)]
pub struct ViewMeta {
    pub route_name: String,
    pub target: ViewTarget,
    pub shape: HandlerShape,
    pub attr: Option<String>,
    /// Callable resolved from the target, before decoration.
    pub handler: Handler,
    pub decorator: Option<Decorator>,
    pub renderer_name: String,
    pub renderer: Arc<dyn Renderer>,
    pub predicates: Vec<Arc<dyn Predicate>>,
    pub weight: u64,
    pub signature: String,
}

impl ViewMeta {
    /// Resolved handler with decorators applied.
    pub fn decorated_handler(&self) -> Handler {
        match &self.decorator {
            Some(decorate) => decorate(self.handler.clone()),
            None => self.handler.clone(),
        }
    }
}

impl fmt::Debug for ViewMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewMeta")
            .field("route_name", &self.route_name)
            .field("view", &self.target.name())
            .field("shape", &self.shape)
            .field("attr", &self.attr)
            .field("renderer", &self.renderer_name)
            .field("predicates", &self.signature)
            .finish()
    }
}

/// Builds view metadata from declarations.
#[derive(Debug, Clone)]
pub struct ViewRegistry {
    predicates: PredicateList,
    config: PredicateConfig,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new(PredicateConfig::default())
    }
}

impl ViewRegistry {
    pub fn new(config: PredicateConfig) -> Self {
        Self {
            predicates: PredicateList::with_defaults(),
            config,
        }
    }

    pub fn config(&self) -> &PredicateConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PredicateConfig {
        &mut self.config
    }

    /// Register an additional view predicate factory.
    pub fn add_view_predicate<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value, &PredicateConfig) -> ConfigResult<Arc<dyn Predicate>> + Send + Sync + 'static,
    {
        self.predicates.add(name, factory);
    }

    pub fn add_view(
        &self,
        target: ViewTarget,
        spec: &EndpointSpec,
        renderers: &RendererRegistry,
    ) -> ConfigResult<ViewMeta> {
        let route_name = spec
            .route_name
            .clone()
            .ok_or_else(|| ConfigError::MissingRouteName(target.name().to_string()))?;

        let (handler, attr) = match &target {
            ViewTarget::Function(handler) => {
                if let Some(attr) = &spec.attr {
                    return Err(ConfigError::UnrecognizedHandler {
                        view: handler.name().to_string(),
                        reason: format!("plain function cannot select attribute \"{}\"", attr),
                    });
                }
                (handler.clone(), None)
            }
            ViewTarget::Class(class) => {
                let attr = spec.attr.clone().unwrap_or_else(|| DEFAULT_ATTR.to_string());
                let handler = class.attribute(&attr).ok_or_else(|| ConfigError::UnresolvedAttribute {
                    view: class.name().to_string(),
                    attr: attr.clone(),
                })?;
                (handler, Some(attr))
            }
            ViewTarget::Resource(resource) => (resource.handler(), spec.attr.clone()),
        };

        let chain = self.predicates.make(&self.config, &spec.predicate_values())?;
        let renderer_name = spec.renderer.clone().unwrap_or_else(|| DEFAULT_RENDERER.to_string());
        let renderer = renderers.get(&renderer_name)?;

        let meta = ViewMeta {
            route_name,
            shape: target.shape(),
            target,
            attr,
            handler,
            decorator: compose(&spec.decorators),
            renderer_name,
            renderer,
            predicates: chain.predicates,
            weight: chain.weight,
            signature: chain.signature,
        };
        tracing::debug!(view = ?meta, "View added");
        Ok(meta)
    }
}
