//! View predicates.
//!
//! # Data Flow
//! ```text
//! Declaration time:
//!     EndpointSpec keyword values
//!     → PredicateList::make (fixed factory order)
//!     → Vec<Arc<dyn Predicate>> + weight + signature
//!
//! Request time:
//!     Dispatcher → predicate.evaluate(captures, request) for each predicate in order
//! ```
//!
//! # Design Decisions
//! - Factories are keyed by name and kept in registration order
//! - Chain order follows factory order, never the order of the input mapping
//! - Predicates are immutable once built and shared across threads
//! - Evaluation errors propagate; only `Ok(false)` moves dispatch to the next variant

pub mod method;
pub mod schema;
pub mod version;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::{ApiVersion, Request};

pub use method::RequestMethodPredicate;
pub use schema::{
    InputSchemaPredicate, JsonSchemaCompiler, OutputSchemaPredicate, OutputSerializerPredicate,
    SchemaCompiler, SchemaSource, SchemaValidator,
};
pub use version::{ApiVersionPredicate, ClauseMode};

/// Raw path captures, name -> text.
pub type Captures = IndexMap<String, String>;

/// A request-time boolean test built once at configuration time.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Canonical text used as identity and in logs.
    fn text(&self) -> String;

    /// Returns `Ok(true)` if the request passes this predicate.
    fn evaluate(&self, captures: &Captures, request: &Request) -> Result<bool, DispatchError>;
}

/// Settings available to predicate factories.
#[derive(Clone)]
pub struct PredicateConfig {
    /// Root directory for file-referenced schemas.
    pub schema_root: PathBuf,
    /// Version assumed when a request carries none.
    pub default_api_version: ApiVersion,
    /// How comma-separated version clauses combine.
    pub version_clauses: ClauseMode,
    /// Compiles input schemas when their predicates are built.
    pub schema_compiler: Arc<dyn SchemaCompiler>,
}

impl Default for PredicateConfig {
    fn default() -> Self {
        Self {
            schema_root: PathBuf::from("."),
            default_api_version: ApiVersion::new(vec![1, 0]),
            version_clauses: ClauseMode::default(),
            schema_compiler: Arc::new(JsonSchemaCompiler),
        }
    }
}

impl fmt::Debug for PredicateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateConfig")
            .field("schema_root", &self.schema_root)
            .field("default_api_version", &self.default_api_version)
            .field("version_clauses", &self.version_clauses)
            .finish_non_exhaustive()
    }
}

/// Builds a predicate from its declared value.
pub type PredicateFactory =
    Arc<dyn Fn(&Value, &PredicateConfig) -> ConfigResult<Arc<dyn Predicate>> + Send + Sync>;

/// Output of [`PredicateList::make`].
#[derive(Debug, Clone)]
pub struct PredicateChain {
    /// Higher means more (and earlier-ordered) predicates are present.
    pub weight: u64,
    pub predicates: Vec<Arc<dyn Predicate>>,
    /// Deterministic combined text of the whole chain.
    pub signature: String,
}

/// Ordered registry of predicate factories.
#[derive(Clone, Default)]
pub struct PredicateList {
    factories: IndexMap<String, PredicateFactory>,
}

impl fmt::Debug for PredicateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl PredicateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in view predicates in their fixed order.
    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        list.add("request_method", |v, _| {
            Ok(Arc::new(RequestMethodPredicate::from_value(v)?) as Arc<dyn Predicate>)
        });
        list.add("api_version", |v, c| {
            Ok(Arc::new(ApiVersionPredicate::from_value(v, c)?) as Arc<dyn Predicate>)
        });
        list.add("output_serializer", |v, _| {
            Ok(Arc::new(OutputSerializerPredicate::new(v.clone())) as Arc<dyn Predicate>)
        });
        list.add("input_schema", |v, c| {
            Ok(Arc::new(InputSchemaPredicate::from_value(v, c)?) as Arc<dyn Predicate>)
        });
        list.add("output_schema", |v, _| {
            Ok(Arc::new(OutputSchemaPredicate::new(v.clone())) as Arc<dyn Predicate>)
        });
        list
    }

    /// Register a factory. Re-registering a name keeps its original position.
    pub fn add<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value, &PredicateConfig) -> ConfigResult<Arc<dyn Predicate>> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(predicate = %name, "View predicate registered");
        self.factories.insert(name, Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build one predicate per recognized keyword, in factory order.
    pub fn make(
        &self,
        config: &PredicateConfig,
        values: &IndexMap<String, Value>,
    ) -> ConfigResult<PredicateChain> {
        if let Some(unknown) = values.keys().find(|k| !self.factories.contains_key(k.as_str())) {
            return Err(ConfigError::UnknownPredicate(unknown.clone()));
        }

        let mut weight = 0u64;
        let mut predicates = Vec::new();
        let mut texts = Vec::new();
        for (index, (name, factory)) in self.factories.iter().enumerate() {
            let Some(value) = values.get(name) else {
                continue;
            };
            let predicate = factory(value, config)?;
            weight |= 1u64 << (63 - index.min(63));
            texts.push(predicate.text());
            predicates.push(predicate);
        }

        Ok(PredicateChain {
            weight,
            predicates,
            signature: texts.join(";"),
        })
    }
}

pub(crate) fn invalid_value(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPredicateValue {
        name: name.to_string(),
        reason: reason.into(),
    }
}
