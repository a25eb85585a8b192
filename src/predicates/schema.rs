//! Schema and serializer predicates.
//!
//! # Responsibilities
//! - Validate request payloads against an input schema (failure is an error, not `false`)
//! - Carry output schemas and serializers for documentation; these always pass
//!
//! # Design Decisions
//! - Schema values ending in `.json` are file references loaded relative to the schema root
//! - Schemas are compiled once, when the predicate is built; a malformed schema is a configuration error
//! - Relative `$ref`s resolve against the schema root through `json-schema:///` URIs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::{Retrieve, Uri};
use serde_json::Value;

use super::{Captures, Predicate, PredicateConfig};
use crate::error::{ConfigError, ConfigResult, DispatchError};
use crate::http::request::Request;

/// Base URI standing for the schema root directory.
pub const SCHEMA_BASE_URI: &str = "json-schema:///";

/// Where a schema came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// Defined in place at the declaration.
    Inline(Value),
    /// Loaded from a file under the schema root.
    File { path: String, schema: Value },
}

impl SchemaSource {
    /// Interpret a declared value, loading `*.json` references from `root`.
    pub fn resolve(value: &Value, root: &Path) -> ConfigResult<Self> {
        match value {
            Value::String(path) if path.ends_with(".json") => {
                let full = root.join(path);
                let schema = read_schema(&full).map_err(|reason| ConfigError::SchemaLoad {
                    path: full.display().to_string(),
                    reason,
                })?;
                tracing::debug!(path = %full.display(), "Schema loaded");
                Ok(SchemaSource::File {
                    path: path.clone(),
                    schema,
                })
            }
            other => Ok(SchemaSource::Inline(other.clone())),
        }
    }

    pub fn schema(&self) -> &Value {
        match self {
            SchemaSource::Inline(schema) => schema,
            SchemaSource::File { schema, .. } => schema,
        }
    }

    fn label(&self) -> &str {
        match self {
            SchemaSource::Inline(_) => "...",
            SchemaSource::File { path, .. } => path,
        }
    }

    /// Base URI relative references in this schema resolve against.
    fn base_uri(&self) -> String {
        match self {
            SchemaSource::Inline(_) => SCHEMA_BASE_URI.to_string(),
            SchemaSource::File { path, .. } => format!("{}{}", SCHEMA_BASE_URI, path.trim_start_matches('/')),
        }
    }
}

fn read_schema(path: &Path) -> Result<Value, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

/// A compiled schema, checked against payloads at request time.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, payload: &Value) -> Result<(), String>;
}

/// Compiles schemas into validators at configuration time.
pub trait SchemaCompiler: Send + Sync {
    fn compile(&self, source: &SchemaSource, root: &Path) -> ConfigResult<Arc<dyn SchemaValidator>>;
}

/// JSON Schema compiler backed by the `jsonschema` crate.
///
/// The draft follows the schema's `$schema` keyword (2020-12 when absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaCompiler;

impl SchemaCompiler for JsonSchemaCompiler {
    fn compile(&self, source: &SchemaSource, root: &Path) -> ConfigResult<Arc<dyn SchemaValidator>> {
        let mut schema = source.schema().clone();
        if let Value::Object(fields) = &mut schema {
            if !fields.contains_key("$id") && !fields.contains_key("id") {
                fields.insert("$id".to_string(), Value::String(source.base_uri()));
            }
        }
        let validator = jsonschema::options()
            .with_retriever(SchemaRootRetriever {
                root: root.to_path_buf(),
            })
            .build(&schema)
            .map_err(|e| ConfigError::InvalidSchema {
                schema: source.label().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(CompiledSchema { validator }))
    }
}

struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl SchemaValidator for CompiledSchema {
    fn validate(&self, payload: &Value) -> Result<(), String> {
        let errors: Vec<String> = self.validator.iter_errors(payload).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Loads `$ref` targets from files under the schema root.
struct SchemaRootRetriever {
    root: PathBuf,
}

impl Retrieve for SchemaRootRetriever {
    fn retrieve(&self, uri: &Uri<String>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let target = uri.as_str();
        let relative = target
            .strip_prefix(SCHEMA_BASE_URI)
            .ok_or_else(|| format!("reference {} is outside the schema root", target))?;
        let relative = relative.split('#').next().unwrap_or_default();
        let full = self.root.join(relative);
        let schema = read_schema(&full).map_err(|reason| format!("{}: {}", full.display(), reason))?;
        tracing::debug!(path = %full.display(), "Referenced schema loaded");
        Ok(schema)
    }
}

/// Validates the request body; raises instead of returning `false`.
#[derive(Clone)]
pub struct InputSchemaPredicate {
    source: SchemaSource,
    validator: Arc<dyn SchemaValidator>,
}

impl std::fmt::Debug for InputSchemaPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSchemaPredicate")
            .field("source", &self.source.label())
            .finish_non_exhaustive()
    }
}

impl InputSchemaPredicate {
    pub fn new(source: SchemaSource, validator: Arc<dyn SchemaValidator>) -> Self {
        Self { source, validator }
    }

    pub fn from_value(value: &Value, config: &PredicateConfig) -> ConfigResult<Self> {
        let source = SchemaSource::resolve(value, &config.schema_root)?;
        let validator = config.schema_compiler.compile(&source, &config.schema_root)?;
        Ok(Self::new(source, validator))
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }
}

impl Predicate for InputSchemaPredicate {
    fn text(&self) -> String {
        format!("input_schema<{}>", self.source.label())
    }

    fn evaluate(&self, _captures: &Captures, request: &Request) -> Result<bool, DispatchError> {
        let body = request.body();
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body)
                .map_err(|e| DispatchError::Validation(format!("request body is not JSON: {}", e)))?
        };
        self.validator.validate(&payload).map_err(DispatchError::Validation)?;
        Ok(true)
    }
}

/// Documents the response schema. Always passes.
#[derive(Debug, Clone)]
pub struct OutputSchemaPredicate {
    value: Value,
}

impl OutputSchemaPredicate {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Predicate for OutputSchemaPredicate {
    fn text(&self) -> String {
        match &self.value {
            Value::String(path) if path.ends_with(".json") => format!("output_schema<{}>", path),
            _ => "output_schema<...>".to_string(),
        }
    }

    fn evaluate(&self, _captures: &Captures, _request: &Request) -> Result<bool, DispatchError> {
        Ok(true)
    }
}

/// Documents the response serializer. Always passes.
#[derive(Debug, Clone)]
pub struct OutputSerializerPredicate {
    value: Value,
}

impl OutputSerializerPredicate {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Predicate for OutputSerializerPredicate {
    fn text(&self) -> String {
        match &self.value {
            Value::String(name) => format!("output_serializer<{}>", name),
            other => format!("output_serializer<{}>", other),
        }
    }

    fn evaluate(&self, _captures: &Captures, _request: &Request) -> Result<bool, DispatchError> {
        Ok(true)
    }
}
