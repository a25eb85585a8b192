//! Configuration schema definitions.
//!
//! This module defines the settings file layout. All types derive Serde traits
//! for deserialization from TOML; every section has defaults so an empty file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::predicates::ClauseMode;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FrameConfig {
    /// Root namespace and prefix.
    pub routing: RoutingConfig,

    /// Declaration discovery settings.
    pub scan: ScanConfig,

    /// Location of file-referenced schemas.
    pub schemas: SchemaConfig,

    /// API version handling.
    pub api: ApiConfig,

    /// HTTP adapter settings.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Routes declared in the settings file instead of in code.
    pub routes: Vec<RouteConfig>,
}

/// Root scope of the configuration tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix every route pattern is joined onto.
    pub root_prefix: String,

    /// Namespace used when an include or route does not name one.
    pub default_namespace: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            root_prefix: "/".to_string(),
            default_namespace: crate::configurator::DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Scan configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Regular expressions over module paths; matching modules are skipped.
    pub ignore: Vec<String>,

    /// Only run declarations in these categories (all when unset).
    pub categories: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore: vec![
                r"(^|::)cache(::|$)".to_string(),
                r"(^|::)migrations(::|$)".to_string(),
                r"(^|::)tests?(::|$)".to_string(),
            ],
            categories: None,
        }
    }
}

/// Schema file settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory `*.json` schema references are resolved against.
    pub root: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// API version configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Requests below this version are answered with 410 Gone.
    pub min_version: Option<String>,

    /// Version assumed when a request does not carry one.
    pub default_version: String,

    /// How comma-separated version clauses combine (`first` or `all`).
    pub version_clauses: ClauseMode,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            min_version: None,
            default_version: "1.0".to_string(),
            version_clauses: ClauseMode::default(),
        }
    }
}

/// HTTP adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered before dispatch.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// A route declared in the settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route name, unique within its namespace.
    pub name: String,

    /// Route pattern, joined onto the root prefix.
    pub pattern: String,

    /// Namespace (defaults to `routing.default_namespace`).
    #[serde(default)]
    pub namespace: Option<String>,

    /// Opaque metadata passed through to the route.
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}
