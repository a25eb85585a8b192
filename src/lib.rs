//! Declarative endpoint configuration and predicate-based request dispatch.
//!
//! # Architecture Overview
//!
//! ```text
//!   Configuration phase (single-threaded)            Request phase (concurrent)
//!
//!   http_endpoint! / config_unit!                    AppService (axum)
//!          │                                               │
//!          ▼                                               ▼
//!   ┌──────────────┐  include / scan  ┌────────────┐  ┌──────────────┐
//!   │ Configurator │─────────────────▶│ RouteTable │  │CompiledRoutes│
//!   │  (Scope)     │                  │ViewRegistry│  │  (matchers)  │
//!   └──────┬───────┘                  └─────┬──────┘  └──────┬───────┘
//!          │ freeze()                       │                │
//!          ▼                                ▼                ▼
//!   ┌─────────────────────────────────────────────┐   ┌──────────────┐
//!   │           AppRegistry (immutable)           │──▶│  Dispatcher  │
//!   └─────────────────────────────────────────────┘   │ (predicates) │
//!                                                     └──────────────┘
//! ```

// Configuration phase
pub mod config;
pub mod configurator;
pub mod predicates;
pub mod routing;
pub mod sums;
pub mod views;

// Frozen state and dispatch
pub mod dispatch;
pub mod registry;

// Cross-cutting concerns
pub mod error;
pub mod http;
pub mod observability;

#[doc(hidden)]
pub use inventory;

pub use config::FrameConfig;
pub use configurator::{Configurator, Include, Scan, Scanner};
pub use dispatch::{compile, CompiledRoutes, DispatchOutcome, Dispatcher};
pub use error::{ConfigError, ConfigResult, DispatchError};
pub use http::AppService;
pub use registry::AppRegistry;
pub use routing::Scope;
pub use views::{ClassView, EndpointSpec, Handler, MatchContext, Resource, ViewResult, ViewTarget};
