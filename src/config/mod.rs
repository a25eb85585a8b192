//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FrameConfig (validated, immutable)
//!     → Configurator::from_config
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigLoadError};
pub use schema::{
    ApiConfig, FrameConfig, HttpConfig, ObservabilityConfig, RouteConfig, RoutingConfig,
    ScanConfig, SchemaConfig,
};
pub use validation::{validate_config, ValidationError};
