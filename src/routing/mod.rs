//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration time:
//!     pattern string
//!     → pattern.rs (normalize: canonical pattern + rules)
//!     → table.rs (prefix join, namespace-scoped Route)
//!
//! Compilation (after freeze):
//!     Route pattern + rules
//!     → pattern.rs (complete with the regex dialect)
//!     → matcher.rs (anchored regex, first match wins)
//! ```
//!
//! # Design Decisions
//! - Routes are registered once and read-only after freeze
//! - Deterministic: same path always matches the same route
//! - Matching order is registration order

pub mod matcher;
pub mod pattern;
pub mod table;

pub use matcher::{Matcher, PathMatcher, RouteMatcher};
pub use pattern::{complete, native_format, normalize, regex_format, Rule, Rules};
pub use table::{join_prefix, Namespace, Route, RouteTable, SchemaDefinition, SchemaIdentifier, Scope};
