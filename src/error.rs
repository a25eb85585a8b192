//! Error types shared across the configuration and dispatch phases.
//!
//! # Design Decisions
//! - Every configuration-time failure is a `ConfigError`; startup aborts on the first one
//! - Dispatch failures are a separate `DispatchError` so callers can map them to responses
//! - "No variant matched" is not an error, see `dispatch::DispatchOutcome::NotFound`

use thiserror::Error;

/// Errors raised while building the route registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A route with the same name already exists in the namespace.
    #[error("Route named \"{name}\" is already registered in the namespace \"{namespace}\"")]
    DuplicateRoute { namespace: String, name: String },

    /// A view references a route that was never added.
    #[error("No route named \"{name}\" found for view registration within \"{namespace}\" namespace")]
    UnknownRoute { namespace: String, name: String },

    /// A namespace was addressed before anything was registered in it.
    #[error("Namespace was not included: {0}")]
    UnknownNamespace(String),

    /// An endpoint declaration did not name its route.
    #[error("View {0} was declared without a route_name")]
    MissingRouteName(String),

    /// The route has no view handler after scanning its namespace.
    #[error("Route name \"{name}\" is not associated with a view handler in the \"{namespace}\" namespace")]
    RouteWithoutView { namespace: String, name: String },

    /// A schema was registered twice for the same identifier.
    #[error("Attempt to rewrite an existing schema for {0}")]
    DuplicateSchema(String),

    /// `include` target does not name a registered configuration unit.
    #[error("Configuration unit \"{0}\" is not registered")]
    UnknownUnit(String),

    /// The included unit has no entry point with the requested name.
    #[error("Package \"{unit}\" has no entry point called '{entry_point}'. Make sure you have defined it.")]
    MissingEntryPoint { unit: String, entry_point: String },

    /// The included unit does not record where it was defined.
    #[error("No source file for configuration unit {0}")]
    NoSourceOrigin(String),

    /// Renderer name is not in the renderer registry.
    #[error("No such renderer factory \"{0}\"")]
    UnknownRenderer(String),

    /// Predicate keyword has no registered factory.
    #[error("Unknown view predicate \"{0}\"")]
    UnknownPredicate(String),

    /// A predicate factory rejected its value.
    #[error("Invalid value for predicate \"{name}\": {reason}")]
    InvalidPredicateValue { name: String, reason: String },

    /// Handler shape cannot be turned into a callable.
    #[error("View {view} is of an unrecognized shape: {reason}")]
    UnrecognizedHandler { view: String, reason: String },

    /// Class-shaped view does not expose the selected attribute.
    #[error("View {view} is registered as a callable, but didn't define its {attr} method")]
    UnresolvedAttribute { view: String, attr: String },

    /// Route pattern could not be parsed.
    #[error("Invalid route pattern \"{pattern}\": {reason}")]
    Pattern { pattern: String, reason: String },

    /// `<dotted.reference>` points at an unregistered sum type.
    #[error("Sum type \"{0}\" is not registered")]
    UnknownSumType(String),

    /// Sum type path registered twice.
    #[error("Sum type \"{0}\" is already registered")]
    DuplicateSumType(String),

    /// Sum variant definition is malformed.
    #[error("Sum type variant \"{sum}::{variant}\" is invalid: {reason}")]
    InvalidVariant { sum: String, variant: String, reason: String },

    /// A contract term already has a different implementation.
    #[error("Variant {variant} already has a contract term \"{term}\" => {existing}. It conflicts with {new}")]
    ConflictingBinding { variant: String, term: String, existing: String, new: String },

    /// A contract term is missing for some variant.
    #[error("Contract term \"{term}\" of the sum type {sum} is not complete. Here is the missing variant: {variant}")]
    IncompleteContract { sum: String, term: String, variant: String },

    /// An inline match leaves a variant without a case.
    #[error("Inline cases of {sum} are not exhaustive. Here is the variant that is not matched: {variant}")]
    NonExhaustiveMatch { sum: String, variant: String },

    /// Schema file could not be read or parsed.
    #[error("Failed to load schema \"{path}\": {reason}")]
    SchemaLoad { path: String, reason: String },

    /// Schema is not a valid JSON Schema document.
    #[error("Invalid schema {schema}: {reason}")]
    InvalidSchema { schema: String, reason: String },

    /// Registration attempted after the registry was frozen.
    #[error("Configuration is already frozen")]
    AlreadyFrozen,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that escape a dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload validation failed inside a predicate.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A predicate could not be evaluated.
    #[error("Predicate {predicate} failed: {reason}")]
    Predicate { predicate: String, reason: String },

    /// A typed capture did not decode into its sum type.
    #[error("Capture \"{name}\": {reason}")]
    Capture { name: String, reason: String },

    /// The selected handler returned an error.
    #[error("Handler error: {0}")]
    Handler(String),

    /// The renderer could not produce a response.
    #[error("Render error: {0}")]
    Render(String),
}
