//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that regexes compile and versions parse
//! - Detect duplicate declarative routes per namespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrameConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::config::schema::FrameConfig;
use crate::http::request::ApiVersion;

/// One semantic problem in a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &FrameConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.routing.default_namespace.trim().is_empty() {
        errors.push(ValidationError::new("routing.default_namespace", "must not be empty"));
    }

    for (i, pattern) in config.scan.ignore.iter().enumerate() {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::new(format!("scan.ignore[{}]", i), e.to_string()));
        }
    }

    if let Err(e) = config.api.default_version.parse::<ApiVersion>() {
        errors.push(ValidationError::new("api.default_version", e.to_string()));
    }
    if let Some(min) = &config.api.min_version {
        if let Err(e) = min.parse::<ApiVersion>() {
            errors.push(ValidationError::new("api.min_version", e.to_string()));
        }
    }

    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::new("http.max_body_bytes", "must be greater than zero"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("routes[{}].name", i), "must not be empty"));
        }
        let namespace = route
            .namespace
            .as_deref()
            .unwrap_or(&config.routing.default_namespace);
        if !seen.insert((namespace.to_string(), route.name.clone())) {
            errors.push(ValidationError::new(
                format!("routes[{}].name", i),
                format!("duplicate route \"{}\" in namespace \"{}\"", route.name, namespace),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
